pub mod code_generator;
pub mod hashing;
pub mod jwt;
pub mod password;

pub use code_generator::{generate_promo_code, generate_unique_promo_code};
pub use hashing::sha256_normalized;
pub use jwt::*;
pub use password::*;
