//! Save sequence for a profile with a picture.
//!
//! Replacing a picture is three calls with no transaction around them:
//! upload the new object, delete the old one, then persist the profile. A
//! failed upload stops everything. A failed delete only leaves an orphan
//! object behind and is reported as a warning. A failed persist after a
//! successful upload leaves the new object orphaned; [`SaveError::Persist`]
//! carries its URL.

use std::time::Duration;

use portrait_core::constants::SAVE_TIMEOUT_SECS;
use portrait_core::models::{UpdateProfileRequest, UserWithProfile};
use portrait_processing::ProcessedImage;
use thiserror::Error;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::{ClientError, ProfileApi};

/// What the save does with the picture.
#[derive(Debug, Clone)]
pub enum ImageIntent {
    /// Leave the stored picture alone.
    Keep,
    /// Delete the stored picture and clear the reference.
    Remove,
    /// Upload the cropped image and make it the new reference.
    Replace(ProcessedImage),
}

#[derive(Debug, Clone)]
pub struct SaveRequest {
    pub intent: ImageIntent,
    /// Reference stored before this save, if any
    pub current_image: Option<String>,
    /// Other profile fields. Its `image` is overwritten from `intent`.
    pub fields: UpdateProfileRequest,
}

#[derive(Debug, Clone)]
pub struct SaveOutcome {
    pub user: UserWithProfile,
    /// Non-fatal problems, such as a previous image that could not be deleted
    pub warnings: Vec<String>,
}

#[derive(Debug, Error)]
pub enum SaveError {
    #[error("Saving took longer than {0:?}")]
    Timeout(Duration),

    #[error("Save was cancelled")]
    Cancelled,

    #[error("Image upload failed: {0}")]
    Upload(#[source] ClientError),

    #[error("Profile update failed: {source}")]
    Persist {
        #[source]
        source: ClientError,
        /// URL uploaded during this save, now unreferenced
        uploaded: Option<String>,
    },
}

/// Progress of the current save.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Idle,
    Uploading,
    DeletingPrevious,
    Persisting,
    Completed,
    Failed,
}

pub struct UploadOrchestrator<A> {
    api: A,
    timeout: Duration,
    state: watch::Sender<SaveState>,
}

impl<A: ProfileApi> UploadOrchestrator<A> {
    pub fn new(api: A) -> Self {
        let (state, _) = watch::channel(SaveState::Idle);
        Self {
            api,
            timeout: Duration::from_secs(SAVE_TIMEOUT_SECS),
            state,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Receiver that observes every state change.
    pub fn subscribe(&self) -> watch::Receiver<SaveState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> SaveState {
        *self.state.borrow()
    }

    /// Run the save sequence.
    ///
    /// Cancelling `cancel` or hitting the timeout drops the request in flight.
    /// Whatever ran before that point is not rolled back.
    pub async fn save(
        &self,
        request: SaveRequest,
        cancel: &CancellationToken,
    ) -> Result<SaveOutcome, SaveError> {
        self.set_state(SaveState::Idle);

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(SaveError::Cancelled),
            run = tokio::time::timeout(self.timeout, self.run(request)) => {
                run.unwrap_or(Err(SaveError::Timeout(self.timeout)))
            }
        };

        match &result {
            Ok(outcome) => {
                tracing::info!(
                    user_id = %outcome.user.user.id,
                    warnings = outcome.warnings.len(),
                    "Profile saved"
                );
                self.set_state(SaveState::Completed);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Profile save failed");
                self.set_state(SaveState::Failed);
            }
        }

        result
    }

    async fn run(&self, request: SaveRequest) -> Result<SaveOutcome, SaveError> {
        let SaveRequest {
            intent,
            current_image,
            mut fields,
        } = request;
        let previous = current_image.filter(|url| !url.trim().is_empty());
        let mut warnings = Vec::new();
        let mut uploaded = None;

        match intent {
            ImageIntent::Keep => fields.image = None,
            ImageIntent::Remove => {
                if let Some(old) = previous.as_deref() {
                    self.delete_previous(old, &mut warnings).await;
                }
                fields.image = Some(String::new());
            }
            ImageIntent::Replace(image) => {
                self.set_state(SaveState::Uploading);
                let url = self
                    .api
                    .upload_image(&image)
                    .await
                    .map_err(SaveError::Upload)?;
                tracing::debug!(url = %url, "New profile image uploaded");

                if let Some(old) = previous.as_deref().filter(|old| *old != url) {
                    self.delete_previous(old, &mut warnings).await;
                }
                fields.image = Some(url.clone());
                uploaded = Some(url);
            }
        }

        self.set_state(SaveState::Persisting);
        let user = self
            .api
            .update_profile(&fields)
            .await
            .map_err(|source| SaveError::Persist { source, uploaded })?;

        Ok(SaveOutcome { user, warnings })
    }

    /// Best-effort delete of the superseded object.
    async fn delete_previous(&self, url: &str, warnings: &mut Vec<String>) {
        if !is_remote_url(url) {
            return;
        }

        self.set_state(SaveState::DeletingPrevious);
        match self.api.delete_image(url).await {
            Ok(()) => tracing::debug!(url = %url, "Previous profile image deleted"),
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to delete previous profile image");
                warnings.push(format!("Failed to delete previous image: {}", e));
            }
        }
    }

    fn set_state(&self, state: SaveState) {
        self.state.send_replace(state);
    }
}

fn is_remote_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}
