pub mod auth;
pub mod cart;
pub mod catalog;
pub mod dropship;
pub mod order;
pub mod promo;
pub mod survey;
pub mod utm;
pub mod webhook;

pub use auth::auth_config;
pub use cart::cart_config;
pub use catalog::catalog_config;
pub use dropship::dropship_config;
pub use order::order_config;
pub use promo::promo_config;
pub use survey::survey_config;
pub use utm::utm_config;
pub use webhook::webhook_config;
