use crate::error::{AppError, AppResult};
use crate::external::{
    FacebookCapiService, MatchData, MonobankService, MonobankWebhook, TelegramService,
    TikTokEventsService,
};
use crate::models::{
    CartLine, CreateOrderRequest, ORDER_STATUS_PAID, ORDER_STATUSES, Order, OrderItem,
    OrderQuery, OrderResponse, PAYMENT_STATUS_FAILED, PAYMENT_STATUS_PAID, PaginatedResponse,
    PaginationParams, PromoCode,
};
use crate::services::CartService;
use chrono::Utc;
use sqlx::PgPool;

#[derive(Clone)]
pub struct OrderService {
    pool: PgPool,
    cart_service: CartService,
    monobank: MonobankService,
    telegram: TelegramService,
    facebook: FacebookCapiService,
    tiktok: TikTokEventsService,
}

impl OrderService {
    pub fn new(
        pool: PgPool,
        cart_service: CartService,
        monobank: MonobankService,
        telegram: TelegramService,
        facebook: FacebookCapiService,
        tiktok: TikTokEventsService,
    ) -> Self {
        Self {
            pool,
            cart_service,
            monobank,
            telegram,
            facebook,
            tiktok,
        }
    }

    pub async fn create_order(
        &self,
        user_id: Option<i64>,
        request: CreateOrderRequest,
    ) -> AppResult<OrderResponse> {
        if request.customer_name.trim().is_empty() || request.customer_phone.trim().is_empty() {
            return Err(AppError::ValidationError(
                "Customer name and phone are required".to_string(),
            ));
        }

        let lines = self.cart_service.price_items(&request.items).await?;
        let subtotal_cents: i64 = lines.iter().map(|l| l.line_total_cents).sum();

        let mut tx = self.pool.begin().await?;

        // Promo usage is incremented under a row lock so max_uses holds
        // across concurrent checkouts.
        let (promo_id, discount_cents) = match &request.promo_code {
            Some(code) => {
                let promo = sqlx::query_as::<_, PromoCode>(
                    r#"
                    SELECT id, code, kind, value, is_active, expires_at,
                           max_uses, used_count, created_at
                    FROM promo_codes
                    WHERE code = $1
                    FOR UPDATE
                    "#,
                )
                .bind(code)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| AppError::ValidationError("Unknown promo code".to_string()))?;

                if !promo.is_usable(Utc::now()) {
                    return Err(AppError::ValidationError(
                        "Promo code is no longer valid".to_string(),
                    ));
                }

                sqlx::query("UPDATE promo_codes SET used_count = used_count + 1 WHERE id = $1")
                    .bind(promo.id)
                    .execute(&mut *tx)
                    .await?;

                (Some(promo.id), promo.discount_for(subtotal_cents))
            }
            None => (None, 0),
        };

        let total_cents = subtotal_cents - discount_cents;
        let utm = request.utm.clone().unwrap_or_default();

        let order = sqlx::query_as::<_, Order>(
            r#"
            INSERT INTO orders (
                user_id, total_cents, discount_cents, promo_code_id,
                customer_name, customer_phone, customer_email,
                ship_city, ship_branch,
                utm_source, utm_medium, utm_campaign
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING id, user_id, status, payment_status, total_cents, discount_cents,
                      promo_code_id, customer_name, customer_phone, customer_email,
                      ship_city, ship_branch, tracking_number, invoice_id,
                      utm_source, utm_medium, utm_campaign, created_at, updated_at
            "#,
        )
        .bind(user_id)
        .bind(total_cents)
        .bind(discount_cents)
        .bind(promo_id)
        .bind(request.customer_name.trim())
        .bind(request.customer_phone.trim())
        .bind(&request.customer_email)
        .bind(request.ship_city.trim())
        .bind(request.ship_branch.trim())
        .bind(&utm.utm_source)
        .bind(&utm.utm_medium)
        .bind(&utm.utm_campaign)
        .fetch_one(&mut *tx)
        .await?;

        for line in &lines {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, product_id, title, unit_price_cents, quantity)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id)
            .bind(line.product_id)
            .bind(&line.title)
            .bind(line.unit_price_cents)
            .bind(line.quantity)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        // Card payments get a Monobank invoice. A gateway failure leaves the
        // order payable later; it never fails the checkout.
        let mut payment_url = None;
        if request.payment_method.as_deref() == Some("card") && self.monobank.is_configured() {
            match self
                .monobank
                .create_invoice(
                    &order.id.to_string(),
                    total_cents,
                    &format!("TwoComms order #{}", order.id),
                )
                .await
            {
                Ok(invoice) => {
                    sqlx::query("UPDATE orders SET invoice_id = $1, updated_at = now() WHERE id = $2")
                        .bind(&invoice.invoice_id)
                        .bind(order.id)
                        .execute(&self.pool)
                        .await?;
                    payment_url = Some(invoice.page_url);
                }
                Err(e) => {
                    log::error!("Monobank invoice for order {} failed: {e:?}", order.id);
                }
            }
        }

        self.dispatch_order_side_effects(&order, &lines, payment_url.is_none());

        let items = self.fetch_items(order.id).await?;
        Ok(OrderResponse::from_order(order, items, payment_url))
    }

    /// Fire-and-forget notifications and marketing events. Purchase events
    /// for card orders wait for the payment webhook instead.
    fn dispatch_order_side_effects(&self, order: &Order, lines: &[CartLine], send_purchase: bool) {
        let telegram = self.telegram.clone();
        let summary = format!(
            "New order #{}\n{} item(s), total {:.2} UAH\n{} / {}\n{}, {}",
            order.id,
            lines.iter().map(|l| l.quantity as i64).sum::<i64>(),
            order.total_cents as f64 / 100.0,
            order.customer_name,
            order.customer_phone,
            order.ship_city,
            order.ship_branch,
        );
        tokio::spawn(async move {
            telegram.notify(&summary).await;
        });

        if send_purchase {
            self.dispatch_purchase_events(order);
        }
    }

    fn dispatch_purchase_events(&self, order: &Order) {
        let match_data = MatchData {
            email: order.customer_email.clone(),
            phone: Some(order.customer_phone.clone()),
        };
        let facebook = self.facebook.clone();
        let tiktok = self.tiktok.clone();
        let (order_id, total) = (order.id, order.total_cents);

        tokio::spawn(async move {
            if let Err(e) = facebook.send_purchase(&match_data, total, order_id).await {
                log::error!("Facebook purchase event for order {order_id} failed: {e:?}");
            }
            if let Err(e) = tiktok.send_purchase(&match_data, total, order_id).await {
                log::error!("TikTok purchase event for order {order_id} failed: {e:?}");
            }
        });
    }

    pub async fn list_orders(
        &self,
        user_id: i64,
        query: &OrderQuery,
    ) -> AppResult<PaginatedResponse<Order>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM orders
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(user_id)
        .bind(&query.status)
        .fetch_one(&self.pool)
        .await?;

        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, payment_status, total_cents, discount_cents,
                   promo_code_id, customer_name, customer_phone, customer_email,
                   ship_city, ship_branch, tracking_number, invoice_id,
                   utm_source, utm_medium, utm_campaign, created_at, updated_at
            FROM orders
            WHERE user_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(&query.status)
        .bind(params.get_limit())
        .bind(params.get_offset())
        .fetch_all(&self.pool)
        .await?;

        Ok(PaginatedResponse::new(
            orders,
            params.page.unwrap_or(1),
            params.get_limit(),
            total,
        ))
    }

    pub async fn get_order(&self, user_id: i64, order_id: i64) -> AppResult<OrderResponse> {
        let order = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, payment_status, total_cents, discount_cents,
                   promo_code_id, customer_name, customer_phone, customer_email,
                   ship_city, ship_branch, tracking_number, invoice_id,
                   utm_source, utm_medium, utm_campaign, created_at, updated_at
            FROM orders
            WHERE id = $1 AND user_id = $2
            "#,
        )
        .bind(order_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {order_id}")))?;

        let items = self.fetch_items(order.id).await?;
        Ok(OrderResponse::from_order(order, items, None))
    }

    pub async fn get_order_by_id(&self, order_id: i64) -> AppResult<Order> {
        sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, payment_status, total_cents, discount_cents,
                   promo_code_id, customer_name, customer_phone, customer_email,
                   ship_city, ship_branch, tracking_number, invoice_id,
                   utm_source, utm_medium, utm_campaign, created_at, updated_at
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {order_id}")))
    }

    /// Admin status transition. A tracking number, when supplied, is
    /// persisted alongside the status so the background tracking refresh
    /// can pick the order up once it is shipped.
    pub async fn update_status(
        &self,
        order_id: i64,
        status: &str,
        tracking_number: Option<&str>,
    ) -> AppResult<()> {
        if !ORDER_STATUSES.contains(&status) {
            return Err(AppError::ValidationError(format!(
                "Unknown order status: {status}"
            )));
        }

        let updated = sqlx::query(
            r#"
            UPDATE orders
            SET status = $1,
                tracking_number = COALESCE($2, tracking_number),
                updated_at = now()
            WHERE id = $3
            "#,
        )
        .bind(status)
        .bind(tracking_number)
        .bind(order_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(AppError::NotFound(format!("Order not found: {order_id}")));
        }
        Ok(())
    }

    /// Apply a Monobank webhook. Idempotent: the paid transition happens at
    /// most once, repeated deliveries are acknowledged without side effects.
    pub async fn handle_payment_webhook(&self, webhook: &MonobankWebhook) -> AppResult<()> {
        if webhook.is_paid() {
            let order = sqlx::query_as::<_, Order>(
                r#"
                UPDATE orders
                SET payment_status = $1, status = $2, updated_at = now()
                WHERE invoice_id = $3 AND payment_status <> $1
                RETURNING id, user_id, status, payment_status, total_cents, discount_cents,
                          promo_code_id, customer_name, customer_phone, customer_email,
                          ship_city, ship_branch, tracking_number, invoice_id,
                          utm_source, utm_medium, utm_campaign, created_at, updated_at
                "#,
            )
            .bind(PAYMENT_STATUS_PAID)
            .bind(ORDER_STATUS_PAID)
            .bind(&webhook.invoice_id)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(order) = order {
                log::info!("Order {} marked paid via Monobank", order.id);
                let telegram = self.telegram.clone();
                let text = format!("Order #{} paid ({} UAH)", order.id, order.total_cents / 100);
                tokio::spawn(async move {
                    telegram.notify(&text).await;
                });
                self.dispatch_purchase_events(&order);
            }
        } else if webhook.is_failed() {
            sqlx::query(
                r#"
                UPDATE orders
                SET payment_status = $1, updated_at = now()
                WHERE invoice_id = $2 AND payment_status = 'pending'
                "#,
            )
            .bind(PAYMENT_STATUS_FAILED)
            .bind(&webhook.invoice_id)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    /// Orders with a tracking number that are still in transit; used by the
    /// background tracking refresh.
    pub async fn shipped_orders(&self) -> AppResult<Vec<Order>> {
        let orders = sqlx::query_as::<_, Order>(
            r#"
            SELECT id, user_id, status, payment_status, total_cents, discount_cents,
                   promo_code_id, customer_name, customer_phone, customer_email,
                   ship_city, ship_branch, tracking_number, invoice_id,
                   utm_source, utm_medium, utm_campaign, created_at, updated_at
            FROM orders
            WHERE status = 'shipped' AND tracking_number IS NOT NULL
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(orders)
    }

    pub async fn mark_done(&self, order_id: i64) -> AppResult<()> {
        sqlx::query("UPDATE orders SET status = 'done', updated_at = now() WHERE id = $1")
            .bind(order_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn fetch_items(&self, order_id: i64) -> AppResult<Vec<OrderItem>> {
        let items = sqlx::query_as::<_, OrderItem>(
            r#"
            SELECT id, order_id, product_id, title, unit_price_cents, quantity
            FROM order_items
            WHERE order_id = $1
            ORDER BY id
            "#,
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FacebookConfig, MonobankConfig, TelegramConfig, TikTokConfig};

    // The status whitelist is checked before any query runs, so a lazy
    // pool that never connects is enough here.
    fn service() -> OrderService {
        let pool = PgPool::connect_lazy("postgres://localhost/unused").unwrap();
        OrderService::new(
            pool.clone(),
            CartService::new(pool),
            MonobankService::new(MonobankConfig::default()),
            TelegramService::new(TelegramConfig::default()),
            FacebookCapiService::new(FacebookConfig::default()),
            TikTokEventsService::new(TikTokConfig::default()),
        )
    }

    #[tokio::test]
    async fn test_update_status_rejects_unknown_status() {
        let err = service()
            .update_status(1, "teleported", Some("20450000000000"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::ValidationError(_)));
    }
}
