use crate::handlers::auth::get_role_from_request;
use crate::models::{ROLE_ADMIN, TrackVisitRequest};
use crate::services::UtmService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    post,
    path = "/utm/track",
    tag = "utm",
    request_body = TrackVisitRequest,
    responses(
        (status = 200, description = "Visit recorded")
    )
)]
pub async fn track_visit(
    utm_service: web::Data<UtmService>,
    request: web::Json<TrackVisitRequest>,
) -> Result<HttpResponse> {
    match utm_service.track_visit(&request.into_inner()).await {
        Ok(()) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "message": "Visit recorded"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/utm/stats",
    tag = "utm",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Visit totals grouped by source and campaign"),
        (status = 403, description = "Admin only")
    )
)]
pub async fn stats(utm_service: web::Data<UtmService>, req: HttpRequest) -> Result<HttpResponse> {
    if get_role_from_request(&req).as_deref() != Some(ROLE_ADMIN) {
        return Ok(crate::error::AppError::Forbidden.error_response());
    }

    match utm_service.stats().await {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn utm_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/utm")
            .route("/track", web::post().to(track_visit))
            .route("/stats", web::get().to(stats)),
    );
}
