use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Category {
    pub id: i64,
    pub slug: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Product {
    pub id: i64,
    pub category_id: i64,
    pub slug: String,
    pub title: String,
    pub price_cents: i64,
    pub discount_percent: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Price after the product-level discount.
    pub fn final_price_cents(&self) -> i64 {
        let pct = self.discount_percent.clamp(0, 100) as i64;
        self.price_cents * (100 - pct) / 100
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductResponse {
    pub id: i64,
    pub category_id: i64,
    pub slug: String,
    pub title: String,
    pub price_cents: i64,
    pub discount_percent: i32,
    pub final_price_cents: i64,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        let final_price_cents = p.final_price_cents();
        Self {
            id: p.id,
            category_id: p.category_id,
            slug: p.slug,
            title: p.title,
            price_cents: p.price_cents,
            discount_percent: p.discount_percent,
            final_price_cents,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ProductQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    /// Category slug filter.
    pub category: Option<String>,
    /// Case-insensitive title substring search.
    pub q: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(price_cents: i64, discount_percent: i32) -> Product {
        Product {
            id: 1,
            category_id: 1,
            slug: "tee".to_string(),
            title: "Tee".to_string(),
            price_cents,
            discount_percent,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_final_price_applies_discount() {
        assert_eq!(product(10000, 25).final_price_cents(), 7500);
    }

    #[test]
    fn test_final_price_no_discount() {
        assert_eq!(product(9900, 0).final_price_cents(), 9900);
    }

    #[test]
    fn test_final_price_discount_clamped() {
        assert_eq!(product(10000, 150).final_price_cents(), 0);
        assert_eq!(product(10000, -10).final_price_cents(), 10000);
    }
}
