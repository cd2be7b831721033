pub mod auth_service;
pub mod cart_service;
pub mod catalog_service;
pub mod dropship_service;
pub mod order_service;
pub mod promo_service;
pub mod survey_service;
pub mod utm_service;

pub use auth_service::AuthService;
pub use cart_service::CartService;
pub use catalog_service::CatalogService;
pub use dropship_service::DropshipService;
pub use order_service::OrderService;
pub use promo_service::PromoService;
pub use survey_service::SurveyService;
pub use utm_service::UtmService;
