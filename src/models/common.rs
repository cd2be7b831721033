use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Error payload carried inside the `{"success": false, "error": ...}`
/// envelope produced by `AppError`.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}
