pub mod cart;
pub mod common;
pub mod dropship;
pub mod order;
pub mod pagination;
pub mod product;
pub mod promo;
pub mod survey;
pub mod user;
pub mod utm;

pub use cart::*;
pub use common::*;
pub use dropship::*;
pub use order::*;
pub use pagination::*;
pub use product::*;
pub use promo::*;
pub use survey::*;
pub use user::*;
pub use utm::*;
