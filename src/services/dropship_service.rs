use crate::error::{AppError, AppResult};
use crate::models::{
    CreateDropshipOrderRequest, DROPSHIP_STATUS_APPROVED, DROPSHIP_STATUS_NEW,
    DROPSHIP_STATUS_PAID_OUT, DropshipOrder, DropshipOrderQuery, DropshipOrderResponse,
    PaginatedResponse, PaginationParams,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct DropshipService {
    pool: PgPool,
}

impl DropshipService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Register a dropship markup claim against an order the dropshipper
    /// placed. The payout is the retail markup over the wholesale total.
    pub async fn create(
        &self,
        dropshipper_id: i64,
        request: CreateDropshipOrderRequest,
    ) -> AppResult<DropshipOrderResponse> {
        let order_total: i64 = sqlx::query_scalar(
            "SELECT total_cents FROM orders WHERE id = $1 AND user_id = $2",
        )
        .bind(request.order_id)
        .bind(dropshipper_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Order not found: {}", request.order_id)))?;

        let payout_cents = request.retail_total_cents - order_total;
        if payout_cents < 0 {
            return Err(AppError::ValidationError(
                "Retail total is below the order total".to_string(),
            ));
        }

        // The unique index on order_id makes concurrent claims race to a
        // single insert; the loser gets the violation mapped here.
        let dropship = sqlx::query_as::<_, DropshipOrder>(
            r#"
            INSERT INTO dropship_orders (dropshipper_id, order_id, payout_cents, status)
            VALUES ($1, $2, $3, $4)
            RETURNING id, dropshipper_id, order_id, payout_cents, status, created_at
            "#,
        )
        .bind(dropshipper_id)
        .bind(request.order_id)
        .bind(payout_cents)
        .bind(DROPSHIP_STATUS_NEW)
        .fetch_one(&self.pool)
        .await
        .map_err(map_claim_insert_error)?;

        Ok(DropshipOrderResponse::from(dropship))
    }

    pub async fn list(
        &self,
        dropshipper_id: i64,
        query: &DropshipOrderQuery,
    ) -> AppResult<PaginatedResponse<DropshipOrderResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM dropship_orders
            WHERE dropshipper_id = $1 AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(dropshipper_id)
        .bind(&query.status)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, DropshipOrder>(
            r#"
            SELECT id, dropshipper_id, order_id, payout_cents, status, created_at
            FROM dropship_orders
            WHERE dropshipper_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(dropshipper_id)
        .bind(&query.status)
        .bind(params.get_limit())
        .bind(params.get_offset())
        .fetch_all(&self.pool)
        .await?;

        let items = rows.into_iter().map(DropshipOrderResponse::from).collect();
        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.get_limit(),
            total,
        ))
    }

    pub async fn approve(&self, id: i64) -> AppResult<DropshipOrderResponse> {
        self.transition(id, DROPSHIP_STATUS_NEW, DROPSHIP_STATUS_APPROVED)
            .await
    }

    pub async fn pay_out(&self, id: i64) -> AppResult<DropshipOrderResponse> {
        self.transition(id, DROPSHIP_STATUS_APPROVED, DROPSHIP_STATUS_PAID_OUT)
            .await
    }

    /// Claims move strictly new -> approved -> paid_out.
    async fn transition(&self, id: i64, from: &str, to: &str) -> AppResult<DropshipOrderResponse> {
        let updated = sqlx::query_as::<_, DropshipOrder>(
            r#"
            UPDATE dropship_orders
            SET status = $1
            WHERE id = $2 AND status = $3
            RETURNING id, dropshipper_id, order_id, payout_cents, status, created_at
            "#,
        )
        .bind(to)
        .bind(id)
        .bind(from)
        .fetch_optional(&self.pool)
        .await?;

        match updated {
            Some(row) => Ok(DropshipOrderResponse::from(row)),
            None => {
                let exists: Option<String> =
                    sqlx::query_scalar("SELECT status FROM dropship_orders WHERE id = $1")
                        .bind(id)
                        .fetch_optional(&self.pool)
                        .await?;
                match exists {
                    Some(status) => Err(AppError::ValidationError(format!(
                        "Cannot move claim from '{status}' to '{to}'"
                    ))),
                    None => Err(AppError::NotFound(format!("Dropship claim not found: {id}"))),
                }
            }
        }
    }
}

fn map_claim_insert_error(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            AppError::ValidationError("A dropship claim already exists for this order".to_string())
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct FakeDbError {
        unique: bool,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "duplicate key value violates unique constraint")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            "duplicate key value violates unique constraint"
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            if self.unique {
                ErrorKind::UniqueViolation
            } else {
                ErrorKind::Other
            }
        }
    }

    #[test]
    fn test_duplicate_claim_maps_to_validation_error() {
        let err = map_claim_insert_error(sqlx::Error::Database(Box::new(FakeDbError {
            unique: true,
        })));
        assert!(matches!(err, AppError::ValidationError(_)));
    }

    #[test]
    fn test_other_insert_errors_pass_through() {
        let err = map_claim_insert_error(sqlx::Error::Database(Box::new(FakeDbError {
            unique: false,
        })));
        assert!(matches!(err, AppError::DatabaseError(_)));
    }
}
