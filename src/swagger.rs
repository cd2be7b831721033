use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::register,
        handlers::auth::login,
        handlers::auth::refresh,
        handlers::auth::me,
        handlers::catalog::list_categories,
        handlers::catalog::list_products,
        handlers::catalog::get_product,
        handlers::cart::quote,
        handlers::promo::validate_code,
        handlers::order::create_order,
        handlers::order::list_orders,
        handlers::order::get_order,
        handlers::order::update_order_status,
        handlers::survey::get_session,
        handlers::survey::submit_answer,
        handlers::survey::go_back,
        handlers::dropship::create_claim,
        handlers::dropship::list_claims,
        handlers::dropship::approve_claim,
        handlers::dropship::pay_out_claim,
        handlers::utm::track_visit,
        handlers::utm::stats,
    ),
    components(
        schemas(
            User,
            UserResponse,
            RegisterRequest,
            LoginRequest,
            RefreshRequest,
            AuthResponse,
            Category,
            Product,
            ProductResponse,
            ProductQuery,
            CartItemRequest,
            CartLine,
            CartQuoteRequest,
            CartQuoteResponse,
            PromoCode,
            PromoCodeResponse,
            Order,
            OrderItem,
            CreateOrderRequest,
            OrderResponse,
            OrderQuery,
            UpdateOrderStatusRequest,
            DropshipOrder,
            CreateDropshipOrderRequest,
            DropshipOrderResponse,
            DropshipOrderQuery,
            UtmParams,
            TrackVisitRequest,
            UtmStatRow,
            UtmStatsResponse,
            QuestionPayload,
            SurveyStateResponse,
            SubmitAnswerRequest,
            BackRequest,
            ApiError,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "catalog", description = "Categories and products"),
        (name = "cart", description = "Cart pricing"),
        (name = "promo", description = "Promo code validation"),
        (name = "orders", description = "Checkout and order management"),
        (name = "survey", description = "Post-purchase survey"),
        (name = "dropship", description = "Dropshipper markup claims"),
        (name = "utm", description = "Campaign attribution"),
    ),
    info(
        title = "TwoComms Storefront API",
        version = "1.0.0",
        description = "TwoComms storefront backend REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
