//! HTTP client for the Portrait API.
//!
//! [`ApiClient`] talks to the upload, delete and profile endpoints with a
//! bearer token. [`orchestrator::UploadOrchestrator`] sequences those calls
//! when a profile is saved with a new, removed or unchanged picture.

pub mod api;
pub mod error;
pub mod orchestrator;

use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

pub use api::ProfileApi;
pub use error::ClientError;
pub use orchestrator::{
    ImageIntent, SaveError, SaveOutcome, SaveRequest, SaveState, UploadOrchestrator,
};

const DEFAULT_API_URL: &str = "http://localhost:4000";
const REQUEST_TIMEOUT_SECS: u64 = 60;

/// Client settings read from `PORTRAIT_API_URL` and `PORTRAIT_API_TOKEN`.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSettings {
    #[serde(default = "default_api_url")]
    pub url: String,
    pub token: String,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

/// Error body the server sends with every failure.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
    message: String,
}

/// HTTP client for the Portrait API, authenticated with a bearer token.
#[derive(Clone, Debug)]
pub struct ApiClient {
    client: Client,
    base_url: String,
    token: String,
}

impl ApiClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, ClientError> {
        let parsed = Url::parse(base_url)
            .map_err(|e| ClientError::Config(format!("Invalid API URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "API URL must be http(s): {}",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }

    /// Create client from environment: `PORTRAIT_API_URL` (optional) and `PORTRAIT_API_TOKEN`.
    pub fn from_env() -> Result<Self, ClientError> {
        let settings: ClientSettings = envy::prefixed("PORTRAIT_API_")
            .from_env()
            .map_err(|e| ClientError::Config(e.to_string()))?;
        Self::new(&settings.url, settings.token)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn build_url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub(crate) fn http(&self) -> &Client {
        &self.client
    }

    /// Send an authenticated request and decode the JSON response.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ClientError> {
        let response = request.bearer_auth(&self.token).send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &text));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClientError::Decode(e.to_string()))
    }
}

fn error_from_body(status: StatusCode, text: &str) -> ClientError {
    let (code, message) = match serde_json::from_str::<ErrorBody>(text) {
        Ok(body) => (body.error, body.message),
        Err(_) => (
            status
                .canonical_reason()
                .unwrap_or("unknown")
                .to_string(),
            text.to_string(),
        ),
    };

    if status == StatusCode::UNAUTHORIZED {
        return ClientError::Unauthorized(message);
    }

    ClientError::Api {
        status: status.as_u16(),
        code,
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_bad_url() {
        assert!(matches!(
            ApiClient::new("not a url", "t"),
            Err(ClientError::Config(_))
        ));
        assert!(matches!(
            ApiClient::new("ftp://example.com", "t"),
            Err(ClientError::Config(_))
        ));
    }

    #[test]
    fn test_build_url_trims_slash() {
        let client = ApiClient::new("http://localhost:4000/", "t").unwrap();
        assert_eq!(client.build_url("/api/users"), "http://localhost:4000/api/users");
    }

    #[test]
    fn test_error_from_json_body() {
        let err = error_from_body(
            StatusCode::BAD_REQUEST,
            r#"{"error":"invalidUrl","message":"Invalid URL","recoverable":false}"#,
        );
        match err {
            ClientError::Api {
                status,
                code,
                message,
            } => {
                assert_eq!(status, 400);
                assert_eq!(code, "invalidUrl");
                assert_eq!(message, "Invalid URL");
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_error_unauthorized() {
        let err = error_from_body(
            StatusCode::UNAUTHORIZED,
            r#"{"error":"unauthorized","message":"Unauthorized"}"#,
        );
        assert!(matches!(err, ClientError::Unauthorized(_)));
        assert_eq!(err.status(), Some(401));
    }

    #[test]
    fn test_error_from_plain_text() {
        let err = error_from_body(StatusCode::BAD_GATEWAY, "upstream down");
        assert_eq!(err.status(), Some(502));
        assert_eq!(err.user_message(), "upstream down");
    }
}
