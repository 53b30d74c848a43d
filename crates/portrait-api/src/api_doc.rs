//! OpenAPI documentation.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use portrait_core::models;

/// Returns the OpenAPI spec served at `/api/openapi.json`.
pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

struct BearerAuth;

impl Modify for BearerAuth {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Portrait API",
        version = "0.1.0",
        description = "Profile image upload, replacement and removal together with the profile it belongs to."
    ),
    paths(
        // Images
        handlers::images::upload_image,
        handlers::images::delete_image,
        // Users
        handlers::users::get_user,
        handlers::users::update_user,
        // Config
        handlers::config::get_config,
    ),
    components(
        schemas(
            models::ImageUploadResponse,
            models::DeleteImageResponse,
            models::User,
            models::UserWithProfile,
            models::Profile,
            models::UpdateProfileRequest,
            models::Gender,
            models::Interest,
            models::Availability,
            models::Language,
            models::Area,
            models::ConfigResponse,
            error::ErrorResponse,
        )
    ),
    modifiers(&BearerAuth),
    tags(
        (name = "images", description = "Profile image upload and deletion"),
        (name = "users", description = "Current user and profile"),
        (name = "config", description = "Reference data for the profile form")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_endpoints() {
        let spec = get_openapi_spec();
        assert!(spec.paths.paths.contains_key("/api/images/upload"));
        assert!(spec.paths.paths.contains_key("/api/users"));
        assert!(spec.paths.paths.contains_key("/api/config"));
        assert!(spec
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer")));
    }
}
