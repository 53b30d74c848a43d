use std::sync::Arc;

use axum::{extract::State, Json};
use portrait_core::models::{ImageChange, UpdateProfileRequest, UserWithProfile};
use portrait_core::{AppError, FieldErrors};
use validator::Validate;

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError, ValidatedJson};
use crate::state::AppState;

const INVALID_SELECTION: &str = "Invalid selection";

/// Current user with profile
#[utoipa::path(
    get,
    path = "/api/users",
    tag = "users",
    responses(
        (status = 200, description = "User and profile", body = UserWithProfile),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(skip(state), fields(user_id = %user.user_id, operation = "get_user"))]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> Result<Json<UserWithProfile>, HttpAppError> {
    let found = state
        .profiles
        .find_user_with_profile(user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(found))
}

/// Update the current user's profile
///
/// Omitted fields stay as they are. `image` accepts the stored value, an
/// empty string to remove the picture, or a URL previously returned by the
/// upload endpoint. List fields replace the stored selection.
#[utoipa::path(
    patch,
    path = "/api/users",
    tag = "users",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated", body = UserWithProfile),
        (status = 400, description = "Invalid profile data", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "User not found", body = ErrorResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(
    skip(state, request),
    fields(user_id = %user.user_id, operation = "update_profile")
)]
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    ValidatedJson(request): ValidatedJson<UpdateProfileRequest>,
) -> Result<Json<UserWithProfile>, HttpAppError> {
    request.validate()?;
    check_references(&state, &request).await?;

    let current = state.profiles.current_image(user.user_id).await?;
    let image = ImageChange::classify(request.image.as_deref(), current.as_deref(), |url| {
        state.gateway.is_owned_url(url)
    })?;

    let patch = request.into_patch(image);
    let updated = state.profiles.apply_patch(user.user_id, &patch).await?;

    Ok(Json(updated))
}

/// Reject ids that do not name known languages or areas.
async fn check_references(
    state: &AppState,
    request: &UpdateProfileRequest,
) -> Result<(), AppError> {
    let mut fields = FieldErrors::new();

    let unknown_languages = state
        .reference
        .unknown_language_ids(&request.language_ids())
        .await?;
    if !unknown_languages.is_empty() {
        let is_unknown = |ids: &Option<Vec<i32>>| {
            ids.iter()
                .flatten()
                .any(|id| unknown_languages.contains(id))
        };
        if is_unknown(&request.native_language_ids) {
            fields.insert("nativeLanguageIds".into(), vec![INVALID_SELECTION.into()]);
        }
        if is_unknown(&request.learning_language_ids) {
            fields.insert("learningLanguageIds".into(), vec![INVALID_SELECTION.into()]);
        }
    }

    let unknown_areas = state.reference.unknown_area_ids(&request.area_ids()).await?;
    if !unknown_areas.is_empty() {
        if request.area_id.is_some_and(|id| unknown_areas.contains(&id)) {
            fields.insert("areaId".into(), vec![INVALID_SELECTION.into()]);
        }
        if request
            .preference_area_ids
            .iter()
            .flatten()
            .any(|id| unknown_areas.contains(id))
        {
            fields.insert("preferenceAreaIds".into(), vec![INVALID_SELECTION.into()]);
        }
    }

    if fields.is_empty() {
        return Ok(());
    }

    tracing::debug!(?fields, "Profile update refers to unknown reference data");
    Err(AppError::Validation {
        message: "Invalid profile data".to_string(),
        fields,
    })
}
