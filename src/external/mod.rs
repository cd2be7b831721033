pub mod facebook;
pub mod monobank;
pub mod novaposhta;
pub mod telegram;
pub mod tiktok;

pub use facebook::*;
pub use monobank::*;
pub use novaposhta::*;
pub use telegram::*;
pub use tiktok::*;
