use crate::models::ProductQuery;
use crate::services::CatalogService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/catalog/categories",
    tag = "catalog",
    responses(
        (status = 200, description = "All categories")
    )
)]
pub async fn list_categories(catalog_service: web::Data<CatalogService>) -> Result<HttpResponse> {
    match catalog_service.list_categories().await {
        Ok(categories) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": categories
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/products",
    tag = "catalog",
    params(
        ("category" = Option<String>, Query, description = "Category slug filter"),
        ("q" = Option<String>, Query, description = "Title search"),
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size")
    ),
    responses(
        (status = 200, description = "Active products, newest first")
    )
)]
pub async fn list_products(
    catalog_service: web::Data<CatalogService>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse> {
    match catalog_service.list_products(&query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/catalog/products/{slug}",
    tag = "catalog",
    params(
        ("slug" = String, Path, description = "Product slug")
    ),
    responses(
        (status = 200, description = "Product details"),
        (status = 404, description = "Unknown or inactive product")
    )
)]
pub async fn get_product(
    catalog_service: web::Data<CatalogService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match catalog_service.get_product(&path.into_inner()).await {
        Ok(product) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": product
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn catalog_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/catalog")
            .route("/categories", web::get().to(list_categories))
            .route("/products", web::get().to(list_products))
            .route("/products/{slug}", web::get().to(get_product)),
    );
}
