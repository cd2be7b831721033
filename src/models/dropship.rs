use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const DROPSHIP_STATUS_NEW: &str = "new";
pub const DROPSHIP_STATUS_APPROVED: &str = "approved";
pub const DROPSHIP_STATUS_PAID_OUT: &str = "paid_out";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct DropshipOrder {
    pub id: i64,
    pub dropshipper_id: i64,
    pub order_id: i64,
    pub payout_cents: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateDropshipOrderRequest {
    /// The underlying customer order placed by the dropshipper.
    pub order_id: i64,
    /// Retail total the dropshipper charged their customer.
    pub retail_total_cents: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DropshipOrderResponse {
    pub id: i64,
    pub order_id: i64,
    pub payout_cents: i64,
    pub status: String,
    pub created_at: DateTime<Utc>,
}

impl From<DropshipOrder> for DropshipOrderResponse {
    fn from(d: DropshipOrder) -> Self {
        Self {
            id: d.id,
            order_id: d.order_id,
            payout_cents: d.payout_cents,
            status: d.status,
            created_at: d.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DropshipOrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}
