use crate::handlers::auth::get_user_id_from_request;
use crate::models::{BackRequest, SubmitAnswerRequest, SurveyStateResponse};
use crate::services::SurveyService;
use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

#[utoipa::path(
    get,
    path = "/survey/session",
    tag = "survey",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Current session state and next question", body = SurveyStateResponse),
        (status = 401, description = "Unauthorized")
    )
)]
pub async fn get_session(
    survey_service: web::Data<SurveyService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match survey_service.get_or_create_session(user_id).await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": state
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/survey/answer",
    tag = "survey",
    request_body = SubmitAnswerRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Answer recorded; next question or completion state", body = SurveyStateResponse),
        (status = 400, description = "Answer rejected; the reason code names the failed check"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Stale version or wrong question; body carries the current state")
    )
)]
pub async fn submit_answer(
    survey_service: web::Data<SurveyService>,
    req: HttpRequest,
    request: web::Json<SubmitAnswerRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match survey_service
        .submit_answer(user_id, request.into_inner())
        .await
    {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": state
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/survey/back",
    tag = "survey",
    request_body = BackRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Last answer undone", body = SurveyStateResponse),
        (status = 400, description = "The single undo was already spent"),
        (status = 401, description = "Unauthorized"),
        (status = 409, description = "Stale version; body carries the current state")
    )
)]
pub async fn go_back(
    survey_service: web::Data<SurveyService>,
    req: HttpRequest,
    request: web::Json<BackRequest>,
) -> Result<HttpResponse> {
    let user_id = get_user_id_from_request(&req).unwrap_or(0);

    match survey_service.go_back(user_id, request.version).await {
        Ok(state) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": state
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn survey_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/survey")
            .route("/session", web::get().to(get_session))
            .route("/answer", web::post().to(submit_answer))
            .route("/back", web::post().to(go_back)),
    );
}
