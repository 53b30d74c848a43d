use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

/// Response of a successful profile image upload
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ImageUploadResponse {
    /// Public URL of the stored object
    pub url: String,
}

/// Query of the image delete endpoint
#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct DeleteImageQuery {
    /// Public URL of the image to delete
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteImageResponse {
    pub success: bool,
}
