use crate::handlers::auth::{get_role_from_request, get_user_id_from_request};
use crate::models::{CreateOrderRequest, OrderQuery, ROLE_ADMIN, UpdateOrderStatusRequest};
use crate::services::OrderService;
use actix_web::{HttpMessage, HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/orders",
    tag = "orders",
    request_body = CreateOrderRequest,
    responses(
        (status = 200, description = "Order placed; payment_url present for card orders"),
        (status = 400, description = "Invalid cart, customer data or promo code")
    )
)]
pub async fn create_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    request: web::Json<CreateOrderRequest>,
) -> Result<HttpResponse> {
    // Guest checkout is allowed; the middleware attaches a user id only for
    // authenticated requests.
    let user_id = req.extensions().get::<i64>().copied();

    match order_service
        .create_order(user_id, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders",
    tag = "orders",
    params(
        ("page" = Option<u32>, Query, description = "Page number"),
        ("per_page" = Option<u32>, Query, description = "Page size"),
        ("status" = Option<String>, Query, description = "Order status filter")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "The caller's orders"),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn list_orders(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    query: web::Query<OrderQuery>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match order_service.list_orders(user_id, &query.into_inner()).await {
        Ok(page) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": page
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/orders/{id}",
    tag = "orders",
    params(
        ("id" = i64, Path, description = "Order id")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Order with line items"),
        (status = 401, description = "Unauthorized"),
        (status = 404, description = "Order not found or owned by another user")
    )
)]
pub async fn get_order(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<i64>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match order_service.get_order(user_id, path.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    put,
    path = "/orders/{id}/status",
    tag = "orders",
    params(
        ("id" = i64, Path, description = "Order id")
    ),
    request_body = UpdateOrderStatusRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Status updated; tracking number stored when supplied"),
        (status = 400, description = "Unknown status"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Order not found")
    )
)]
pub async fn update_order_status(
    order_service: web::Data<OrderService>,
    req: HttpRequest,
    path: web::Path<i64>,
    request: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse> {
    if get_role_from_request(&req).as_deref() != Some(ROLE_ADMIN) {
        return Ok(crate::error::AppError::Forbidden.error_response());
    }

    match order_service
        .update_status(
            path.into_inner(),
            &request.status,
            request.tracking_number.as_deref(),
        )
        .await
    {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Order status updated"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn order_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/orders")
            .route("", web::post().to(create_order))
            .route("", web::get().to(list_orders))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}/status", web::put().to(update_order_status)),
    );
}
