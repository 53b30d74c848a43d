use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::{Multipart, Query, State},
    http::StatusCode,
    Json,
};
use portrait_core::models::{DeleteImageQuery, DeleteImageResponse, ImageUploadResponse};
use portrait_core::AppError;
use portrait_storage::{extension_from_filename, generate_profile_image_key};

use crate::auth::AuthUser;
use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;
use crate::utils::upload::extract_multipart_file;

/// Upload a profile image
///
/// Accepts exactly one `file` field. The declared type, the size and the
/// magic bytes are checked; the image is never decoded here. The object is
/// stored under a fresh key and its public URL returned.
#[utoipa::path(
    post,
    path = "/api/images/upload",
    tag = "images",
    request_body(
        content_type = "multipart/form-data",
        description = "Form with a single `file` field"
    ),
    responses(
        (status = 201, description = "Image uploaded", body = ImageUploadResponse),
        (status = 400, description = "Missing, invalid or oversized file", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Failed to upload image", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(
    skip(state, multipart),
    fields(user_id = %user.user_id, operation = "upload_image")
)]
pub async fn upload_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<ImageUploadResponse>), HttpAppError> {
    let file = extract_multipart_file(multipart).await?;

    state
        .validator
        .check_upload(&file.content_type, &file.data)
        .map_err(HttpAppError::from)?;

    let key = generate_profile_image_key(user.user_id, extension_from_filename(&file.file_name));
    let started = Instant::now();

    let object = state
        .gateway
        .upload(file.data, &key, &file.content_type)
        .await
        .map_err(|e| {
            tracing::error!(error = %e, key = %key, "Profile image upload failed");
            HttpAppError(AppError::storage("Failed to upload image", e))
        })?;

    tracing::info!(
        key = %object.key,
        size_bytes = object.size_bytes,
        duration_ms = started.elapsed().as_millis() as u64,
        "Profile image uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(ImageUploadResponse { url: object.url }),
    ))
}

/// Delete a profile image by its public URL
///
/// Only URLs inside the configured storage domain are accepted; anything else
/// is rejected before the backend is contacted. Deleting an object that no
/// longer exists succeeds.
#[utoipa::path(
    delete,
    path = "/api/images/upload",
    tag = "images",
    params(DeleteImageQuery),
    responses(
        (status = 200, description = "Image deleted", body = DeleteImageResponse),
        (status = 400, description = "Missing or foreign URL", body = ErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 500, description = "Failed to delete image", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
#[tracing::instrument(
    skip(state, query),
    fields(user_id = %user.user_id, operation = "delete_image")
)]
pub async fn delete_image(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Query(query): Query<DeleteImageQuery>,
) -> Result<Json<DeleteImageResponse>, HttpAppError> {
    let url = query
        .url
        .filter(|u| !u.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("No image URL provided".to_string()))?;

    if !state.gateway.is_owned_url(&url) {
        return Err(AppError::InvalidUrl(url).into());
    }

    let key = state.gateway.extract_key(&url);
    state.gateway.delete(&key).await.map_err(|e| {
        tracing::error!(error = %e, key = %key, "Profile image delete failed");
        HttpAppError::from(e)
    })?;

    tracing::info!(key = %key, "Profile image deleted");
    Ok(Json(DeleteImageResponse { success: true }))
}
