use crate::error::{AppError, AppResult};
use crate::models::{
    Category, PaginatedResponse, PaginationParams, Product, ProductQuery, ProductResponse,
};
use sqlx::PgPool;

#[derive(Clone)]
pub struct CatalogService {
    pool: PgPool,
}

impl CatalogService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn list_categories(&self) -> AppResult<Vec<Category>> {
        let categories =
            sqlx::query_as::<_, Category>("SELECT id, slug, name FROM categories ORDER BY name")
                .fetch_all(&self.pool)
                .await?;
        Ok(categories)
    }

    pub async fn list_products(
        &self,
        query: &ProductQuery,
    ) -> AppResult<PaginatedResponse<ProductResponse>> {
        let params = PaginationParams::new(query.page, query.per_page);
        let offset = params.get_offset();
        let limit = params.get_limit();

        let category = query.category.as_deref();
        let search = query.q.as_ref().map(|q| format!("%{q}%"));

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE p.is_active
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.title ILIKE $2)
            "#,
        )
        .bind(category)
        .bind(&search)
        .fetch_one(&self.pool)
        .await?;

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT p.id, p.category_id, p.slug, p.title, p.price_cents,
                   p.discount_percent, p.is_active, p.created_at
            FROM products p
            JOIN categories c ON c.id = p.category_id
            WHERE p.is_active
              AND ($1::text IS NULL OR c.slug = $1)
              AND ($2::text IS NULL OR p.title ILIKE $2)
            ORDER BY p.created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(category)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items: Vec<ProductResponse> =
            products.into_iter().map(ProductResponse::from).collect();

        Ok(PaginatedResponse::new(
            items,
            params.page.unwrap_or(1),
            params.get_limit(),
            total,
        ))
    }

    pub async fn get_product(&self, slug: &str) -> AppResult<ProductResponse> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT id, category_id, slug, title, price_cents,
                   discount_percent, is_active, created_at
            FROM products
            WHERE slug = $1 AND is_active
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Product not found: {slug}")))?;

        Ok(ProductResponse::from(product))
    }
}
