use crate::error::{AppError, AppResult};
use crate::models::{PROMO_KIND_PERCENT, PromoCode, PromoCodeResponse};
use crate::utils::generate_unique_promo_code;
use chrono::{Duration, Utc};
use sqlx::{PgPool, Postgres, Transaction};

/// Reward issued for a completed survey: 10% off, single use, 30 days.
const SURVEY_REWARD_PERCENT: i64 = 10;
const SURVEY_REWARD_VALID_DAYS: i64 = 30;

#[derive(Clone)]
pub struct PromoService {
    pool: PgPool,
}

impl PromoService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn validate_code(&self, code: &str) -> AppResult<PromoCodeResponse> {
        let promo = sqlx::query_as::<_, PromoCode>(
            r#"
            SELECT id, code, kind, value, is_active, expires_at,
                   max_uses, used_count, created_at
            FROM promo_codes
            WHERE code = $1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Promo code not found".to_string()))?;

        if !promo.is_usable(Utc::now()) {
            return Err(AppError::ValidationError(
                "Promo code is no longer valid".to_string(),
            ));
        }

        Ok(PromoCodeResponse::from(promo))
    }

    /// Issue the survey-completion reward exactly once per (user, survey_key).
    ///
    /// Runs inside the caller's transaction. The unique index on
    /// user_promo_codes(user_id, survey_key) is the idempotence anchor: a
    /// racing completion inserts nothing and re-reads the surviving row, so
    /// repeated calls always return the same code.
    pub async fn award_survey_promo(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        survey_key: &str,
    ) -> AppResult<PromoCode> {
        if let Some(existing) = self.find_awarded(tx, user_id, survey_key, true).await? {
            return Ok(existing);
        }

        let code = generate_unique_promo_code(&self.pool).await?;
        let expires_at = Utc::now() + Duration::days(SURVEY_REWARD_VALID_DAYS);

        let promo = sqlx::query_as::<_, PromoCode>(
            r#"
            INSERT INTO promo_codes (code, kind, value, expires_at, max_uses)
            VALUES ($1, $2, $3, $4, 1)
            RETURNING id, code, kind, value, is_active, expires_at,
                      max_uses, used_count, created_at
            "#,
        )
        .bind(&code)
        .bind(PROMO_KIND_PERCENT)
        .bind(SURVEY_REWARD_PERCENT)
        .bind(expires_at)
        .fetch_one(&mut **tx)
        .await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO user_promo_codes (user_id, promo_code_id, source, survey_key)
            VALUES ($1, $2, 'survey', $3)
            ON CONFLICT (user_id, survey_key) WHERE survey_key IS NOT NULL DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(promo.id)
        .bind(survey_key)
        .execute(&mut **tx)
        .await?
        .rows_affected();

        let survivor = if inserted == 0 {
            // Lost the race: a concurrent completion already issued the
            // reward. Discard the freshly created code and return theirs.
            sqlx::query("DELETE FROM promo_codes WHERE id = $1")
                .bind(promo.id)
                .execute(&mut **tx)
                .await?;
            self.find_awarded(tx, user_id, survey_key, false).await?
        } else {
            log::info!("Survey reward issued: user={user_id} survey={survey_key} code={code}");
            None
        };

        settle_award(inserted > 0, promo, survivor)
    }

    pub async fn get_awarded_code(
        &self,
        user_id: i64,
        survey_key: &str,
    ) -> AppResult<Option<String>> {
        let code: Option<String> = sqlx::query_scalar(
            r#"
            SELECT pc.code
            FROM user_promo_codes upc
            JOIN promo_codes pc ON pc.id = upc.promo_code_id
            WHERE upc.user_id = $1 AND upc.survey_key = $2
            "#,
        )
        .bind(user_id)
        .bind(survey_key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(code)
    }

    async fn find_awarded(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        user_id: i64,
        survey_key: &str,
        lock: bool,
    ) -> AppResult<Option<PromoCode>> {
        let base = r#"
            SELECT pc.id, pc.code, pc.kind, pc.value, pc.is_active, pc.expires_at,
                   pc.max_uses, pc.used_count, pc.created_at
            FROM user_promo_codes upc
            JOIN promo_codes pc ON pc.id = upc.promo_code_id
            WHERE upc.user_id = $1 AND upc.survey_key = $2
        "#;
        let sql = if lock {
            format!("{base} FOR UPDATE OF pc")
        } else {
            base.to_string()
        };

        let promo = sqlx::query_as::<_, PromoCode>(&sql)
            .bind(user_id)
            .bind(survey_key)
            .fetch_optional(&mut **tx)
            .await?;
        Ok(promo)
    }
}

/// Pick the code the caller walks away with after the link insert: the
/// fresh code when the insert landed, otherwise the row the concurrent
/// completion left behind.
fn settle_award(
    inserted: bool,
    fresh: PromoCode,
    survivor: Option<PromoCode>,
) -> AppResult<PromoCode> {
    if inserted {
        return Ok(fresh);
    }
    survivor.ok_or_else(|| {
        AppError::InternalError("Survey reward vanished after conflict".to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn promo(id: i64, code: &str) -> PromoCode {
        PromoCode {
            id,
            code: code.to_string(),
            kind: PROMO_KIND_PERCENT.to_string(),
            value: SURVEY_REWARD_PERCENT,
            is_active: true,
            expires_at: Some(Utc::now() + Duration::days(SURVEY_REWARD_VALID_DAYS)),
            max_uses: Some(1),
            used_count: 0,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_award_promocode_idempotent() {
        // A clean insert hands out the freshly generated code.
        let won = settle_award(true, promo(1, "FRESH10"), None).unwrap();
        assert_eq!(won.code, "FRESH10");

        // Losing the race returns the earlier winner's code, so repeated
        // completions all see the same reward.
        let lost = settle_award(false, promo(2, "FRESH10"), Some(promo(1, "FIRST10"))).unwrap();
        assert_eq!(lost.code, "FIRST10");
        assert_eq!(lost.id, 1);
    }

    #[test]
    fn test_award_conflict_without_survivor_is_internal_error() {
        let err = settle_award(false, promo(2, "FRESH10"), None).unwrap_err();
        assert!(matches!(err, AppError::InternalError(_)));
    }
}
