use crate::services::PromoService;
use actix_web::{HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/promo/{code}",
    tag = "promo",
    params(
        ("code" = String, Path, description = "Promo code to validate")
    ),
    responses(
        (status = 200, description = "Code is usable"),
        (status = 400, description = "Code expired, inactive or exhausted"),
        (status = 404, description = "Unknown code")
    )
)]
pub async fn validate_code(
    promo_service: web::Data<PromoService>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    match promo_service.validate_code(&path.into_inner()).await {
        Ok(promo) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": promo
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn promo_config(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/promo").route("/{code}", web::get().to(validate_code)));
}
