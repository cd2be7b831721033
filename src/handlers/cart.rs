use crate::models::CartQuoteRequest;
use crate::services::CartService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/cart/quote",
    tag = "cart",
    request_body = CartQuoteRequest,
    responses(
        (status = 200, description = "Priced cart with discount applied"),
        (status = 400, description = "Empty cart, bad quantity or unusable promo code")
    )
)]
pub async fn quote(
    cart_service: web::Data<CartService>,
    request: web::Json<CartQuoteRequest>,
) -> Result<HttpResponse> {
    match cart_service.quote(&request.into_inner()).await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn cart_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/cart").route("/quote", web::post().to(quote)));
}
