use crate::error::AppResult;
use crate::models::{TrackVisitRequest, UtmStatRow, UtmStatsResponse};
use sqlx::PgPool;

#[derive(Clone)]
pub struct UtmService {
    pool: PgPool,
}

impl UtmService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Record a landing visit. Visits without UTM tags are stored too so
    /// direct traffic shows up in the stats.
    pub async fn track_visit(&self, request: &TrackVisitRequest) -> AppResult<()> {
        let utm = &request.utm;
        sqlx::query(
            r#"
            INSERT INTO utm_events (source, medium, campaign, term, content, landing_path)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(utm.utm_source.clone().unwrap_or_default())
        .bind(utm.utm_medium.clone().unwrap_or_default())
        .bind(utm.utm_campaign.clone().unwrap_or_default())
        .bind(utm.utm_term.clone().unwrap_or_default())
        .bind(utm.utm_content.clone().unwrap_or_default())
        .bind(request.landing_path.clone().unwrap_or_else(|| "/".to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn stats(&self) -> AppResult<UtmStatsResponse> {
        let total_visits: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM utm_events")
            .fetch_one(&self.pool)
            .await?;

        let by_source = sqlx::query_as::<_, UtmStatRow>(
            r#"
            SELECT CASE WHEN source = '' THEN 'direct' ELSE source END AS source,
                   campaign,
                   COUNT(*) AS visits
            FROM utm_events
            GROUP BY 1, 2
            ORDER BY visits DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(UtmStatsResponse {
            total_visits,
            by_source,
        })
    }
}
