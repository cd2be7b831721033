use crate::handlers::auth::{get_role_from_request, get_user_id_from_request};
use crate::models::{
    CreateDropshipOrderRequest, DropshipOrderQuery, ROLE_ADMIN, ROLE_DROPSHIPPER,
};
use crate::services::DropshipService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

fn require_dropshipper(req: &HttpRequest) -> Option<HttpResponse> {
    let role = get_role_from_request(req);
    if role.as_deref() == Some(ROLE_DROPSHIPPER) || role.as_deref() == Some(ROLE_ADMIN) {
        None
    } else {
        Some(crate::error::AppError::Forbidden.error_response())
    }
}

fn require_admin(req: &HttpRequest) -> Option<HttpResponse> {
    if get_role_from_request(req).as_deref() == Some(ROLE_ADMIN) {
        None
    } else {
        Some(crate::error::AppError::Forbidden.error_response())
    }
}

#[utoipa::path(
    post,
    path = "/dropship/orders",
    tag = "dropship",
    request_body = CreateDropshipOrderRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Markup claim registered"),
        (status = 400, description = "Retail total below order total or duplicate claim"),
        (status = 403, description = "Dropshipper role required"),
        (status = 404, description = "Order not found or not owned by the caller")
    )
)]
pub async fn create_claim(
    dropship_service: web::Data<DropshipService>,
    req: HttpRequest,
    request: web::Json<CreateDropshipOrderRequest>,
) -> Result<HttpResponse> {
    if let Some(forbidden) = require_dropshipper(&req) {
        return Ok(forbidden);
    }
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match dropship_service.create(user_id, request.into_inner()).await {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/dropship/orders",
    tag = "dropship",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "Claim status filter")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's claims"),
        (status = 403, description = "Dropshipper role required")
    )
)]
pub async fn list_claims(
    dropship_service: web::Data<DropshipService>,
    req: HttpRequest,
    query: web::Query<DropshipOrderQuery>,
) -> Result<HttpResponse> {
    if let Some(forbidden) = require_dropshipper(&req) {
        return Ok(forbidden);
    }
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match dropship_service.list(user_id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/dropship/orders/{id}/approve",
    tag = "dropship",
    params(
        ("id" = i64, Path, description = "Claim id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Claim approved"),
        (status = 400, description = "Claim is not in the new state"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn approve_claim(
    dropship_service: web::Data<DropshipService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Some(forbidden) = require_admin(&req) {
        return Ok(forbidden);
    }

    match dropship_service.approve(path.into_inner()).await {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/dropship/orders/{id}/payout",
    tag = "dropship",
    params(
        ("id" = i64, Path, description = "Claim id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Claim paid out"),
        (status = 400, description = "Claim is not approved yet"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Claim not found")
    )
)]
pub async fn pay_out_claim(
    dropship_service: web::Data<DropshipService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    if let Some(forbidden) = require_admin(&req) {
        return Ok(forbidden);
    }

    match dropship_service.pay_out(path.into_inner()).await {
        Ok(claim) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": claim
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn dropship_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/dropship")
            .route("/orders", web::post().to(create_claim))
            .route("/orders", web::get().to(list_claims))
            .route("/orders/{id}/approve", web::post().to(approve_claim))
            .route("/orders/{id}/payout", web::post().to(pay_out_claim)),
    );
}
