use std::sync::Arc;

use axum::{extract::State, Json};
use portrait_core::models::ConfigResponse;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

/// Languages and areas selectable in the profile form
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    responses(
        (status = 200, description = "Reference data", body = ConfigResponse),
        (status = 500, description = "Internal server error", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_config(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ConfigResponse>, HttpAppError> {
    let (languages, areas) =
        tokio::try_join!(state.reference.languages(), state.reference.areas())?;

    Ok(Json(ConfigResponse { languages, areas }))
}
