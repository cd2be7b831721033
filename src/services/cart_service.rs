use crate::error::{AppError, AppResult};
use crate::models::{
    CartItemRequest, CartLine, CartQuoteRequest, CartQuoteResponse, Product, PromoCode,
};
use chrono::Utc;
use sqlx::PgPool;

#[derive(Clone)]
pub struct CartService {
    pool: PgPool,
}

impl CartService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Price a cart without persisting anything: per-line totals plus the
    /// promo discount, if the code is currently usable.
    pub async fn quote(&self, request: &CartQuoteRequest) -> AppResult<CartQuoteResponse> {
        let lines = self.price_items(&request.items).await?;
        let subtotal_cents: i64 = lines.iter().map(|l| l.line_total_cents).sum();

        let (discount_cents, promo_code) = match &request.promo_code {
            Some(code) => {
                let promo = self.find_usable_promo(code).await?;
                (promo.discount_for(subtotal_cents), Some(promo.code))
            }
            None => (0, None),
        };

        Ok(CartQuoteResponse {
            lines,
            subtotal_cents,
            discount_cents,
            total_cents: subtotal_cents - discount_cents,
            promo_code,
        })
    }

    /// Resolve cart items against active products. Shared with checkout.
    pub async fn price_items(&self, items: &[CartItemRequest]) -> AppResult<Vec<CartLine>> {
        if items.is_empty() {
            return Err(AppError::ValidationError("Cart is empty".to_string()));
        }

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            if item.quantity <= 0 {
                return Err(AppError::ValidationError(format!(
                    "Invalid quantity for product {}",
                    item.product_id
                )));
            }

            let product = sqlx::query_as::<_, Product>(
                r#"
                SELECT id, category_id, slug, title, price_cents,
                       discount_percent, is_active, created_at
                FROM products
                WHERE id = $1 AND is_active
                "#,
            )
            .bind(item.product_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| {
                AppError::ValidationError(format!("Product {} is unavailable", item.product_id))
            })?;

            let unit_price_cents = product.final_price_cents();
            lines.push(CartLine {
                product_id: product.id,
                title: product.title,
                unit_price_cents,
                quantity: item.quantity,
                line_total_cents: unit_price_cents * item.quantity as i64,
            });
        }

        Ok(lines)
    }

    async fn find_usable_promo(&self, code: &str) -> AppResult<PromoCode> {
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
        .ok_or_else(|| AppError::ValidationError("Unknown promo code".to_string()))?;

        if !promo.is_usable(Utc::now()) {
            return Err(AppError::ValidationError(
                "Promo code is no longer valid".to_string(),
            ));
        }

        Ok(promo)
    }
}
