//! API paths

pub const IMAGES_UPLOAD_PATH: &str = "/api/images/upload";
pub const USERS_PATH: &str = "/api/users";
pub const CONFIG_PATH: &str = "/api/config";
pub const OPENAPI_PATH: &str = "/api/openapi.json";
