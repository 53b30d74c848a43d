use thiserror::Error;

/// Errors returned by [`crate::ApiClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The token was missing, invalid or expired.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The server answered with a non-success status.
    #[error("API error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    #[error("Client configuration error: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of the failed call, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Unauthorized(_) => Some(401),
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Transport(e) => e.status().map(|s| s.as_u16()),
            ClientError::Decode(_) | ClientError::Config(_) => None,
        }
    }

    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> &str {
        match self {
            ClientError::Api { message, .. } => message,
            ClientError::Unauthorized(_) => "Unauthorized",
            _ => "Something went wrong. Please try again.",
        }
    }
}
