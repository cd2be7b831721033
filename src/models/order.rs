use crate::models::{CartItemRequest, UtmParams};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

pub const ORDER_STATUS_NEW: &str = "new";
pub const ORDER_STATUS_PAID: &str = "paid";
pub const ORDER_STATUS_SHIPPED: &str = "shipped";
pub const ORDER_STATUS_DONE: &str = "done";
pub const ORDER_STATUS_CANCELLED: &str = "cancelled";

pub const PAYMENT_STATUS_PENDING: &str = "pending";
pub const PAYMENT_STATUS_PAID: &str = "paid";
pub const PAYMENT_STATUS_FAILED: &str = "failed";

pub const ORDER_STATUSES: &[&str] = &[
    ORDER_STATUS_NEW,
    ORDER_STATUS_PAID,
    ORDER_STATUS_SHIPPED,
    ORDER_STATUS_DONE,
    ORDER_STATUS_CANCELLED,
];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Order {
    pub id: i64,
    pub user_id: Option<i64>,
    pub status: String,
    pub payment_status: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub promo_code_id: Option<i64>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub ship_city: String,
    pub ship_branch: String,
    pub tracking_number: Option<String>,
    pub invoice_id: Option<String>,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
    pub utm_campaign: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct OrderItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub title: String,
    pub unit_price_cents: i64,
    pub quantity: i32,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub items: Vec<CartItemRequest>,
    pub promo_code: Option<String>,
    pub customer_name: String,
    pub customer_phone: String,
    pub customer_email: Option<String>,
    pub ship_city: String,
    pub ship_branch: String,
    /// "card" requests a Monobank invoice; anything else is pay-on-delivery.
    pub payment_method: Option<String>,
    pub utm: Option<UtmParams>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderResponse {
    pub id: i64,
    pub status: String,
    pub payment_status: String,
    pub total_cents: i64,
    pub discount_cents: i64,
    pub customer_name: String,
    pub ship_city: String,
    pub ship_branch: String,
    pub tracking_number: Option<String>,
    pub items: Vec<OrderItem>,
    /// Present when a Monobank invoice was created for the order.
    pub payment_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl OrderResponse {
    pub fn from_order(order: Order, items: Vec<OrderItem>, payment_url: Option<String>) -> Self {
        Self {
            id: order.id,
            status: order.status,
            payment_status: order.payment_status,
            total_cents: order.total_cents,
            discount_cents: order.discount_cents,
            customer_name: order.customer_name,
            ship_city: order.ship_city,
            ship_branch: order.ship_branch,
            tracking_number: order.tracking_number,
            items,
            payment_url,
            created_at: order.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OrderQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
    /// Carrier waybill number, usually set when moving the order to "shipped".
    #[serde(default)]
    pub tracking_number: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_status_update_carries_optional_tracking_number() {
        let req: UpdateOrderStatusRequest = serde_json::from_value(json!({
            "status": "shipped",
            "tracking_number": "20450000000000"
        }))
        .unwrap();
        assert_eq!(req.tracking_number.as_deref(), Some("20450000000000"));

        let req: UpdateOrderStatusRequest =
            serde_json::from_value(json!({ "status": "paid" })).unwrap();
        assert!(req.tracking_number.is_none());
    }
}
