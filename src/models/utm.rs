use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct UtmParams {
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub utm_term: Option<String>,
    pub utm_content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TrackVisitRequest {
    #[serde(flatten)]
    pub utm: UtmParams,
    pub landing_path: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, ToSchema)]
pub struct UtmStatRow {
    pub source: String,
    pub campaign: String,
    pub visits: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UtmStatsResponse {
    pub total_visits: i64,
    pub by_source: Vec<UtmStatRow>,
}
