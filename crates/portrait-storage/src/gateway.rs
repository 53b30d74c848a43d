//! Object storage gateway
//!
//! The single entry point handlers use to store and remove profile images. It
//! is built once per process around a backend and the public base URL of the
//! storage domain, and shared behind an `Arc`.

use std::sync::Arc;

use bytes::Bytes;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::Serialize;
use url::Url;

use crate::keys::validate_key;
use crate::{Storage, StorageBackend, StorageError, StorageResult};

// Characters that would change the meaning of a URL path if left raw.
const KEY_ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'\\')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// A stored object and where it can be fetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StorageObject {
    pub key: String,
    pub url: String,
    pub content_type: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone)]
struct PublicBase {
    /// Base URL as configured, without trailing slash
    raw: String,
    host: String,
    port: Option<u16>,
    /// Path prefix without trailing slash (empty for a bare host)
    path: String,
}

impl PublicBase {
    fn parse(raw: &str) -> StorageResult<Self> {
        let trimmed = raw.trim().trim_end_matches('/');
        let url = Url::parse(trimmed).map_err(|e| {
            StorageError::ConfigError(format!("Invalid public storage URL '{}': {}", raw, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StorageError::ConfigError(format!(
                "Public storage URL must be http(s): {}",
                raw
            )));
        }
        let host = url
            .host_str()
            .ok_or_else(|| {
                StorageError::ConfigError(format!("Public storage URL has no host: {}", raw))
            })?
            .to_ascii_lowercase();

        Ok(PublicBase {
            raw: trimmed.to_string(),
            host,
            port: url.port(),
            path: url.path().trim_end_matches('/').to_string(),
        })
    }

    /// Key part of `url` if it lives under this base.
    fn key_of(&self, url: &Url) -> Option<String> {
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        let host = url.host_str()?;
        if !host.eq_ignore_ascii_case(&self.host) || url.port() != self.port {
            return None;
        }
        let rest = url.path().strip_prefix(&self.path)?.strip_prefix('/')?;
        if rest.is_empty() {
            return None;
        }
        Some(decode(rest))
    }
}

fn decode(path: &str) -> String {
    percent_decode_str(path).decode_utf8_lossy().into_owned()
}

/// Gateway over a storage backend and its public URL space.
#[derive(Clone)]
pub struct ObjectStorageGateway {
    storage: Arc<dyn Storage>,
    public_base: Option<PublicBase>,
}

impl ObjectStorageGateway {
    /// Build the gateway.
    ///
    /// A missing `public_base_url` is allowed here so the service can boot and
    /// report it; uploads then fail with a configuration error.
    pub fn new(storage: Arc<dyn Storage>, public_base_url: Option<&str>) -> StorageResult<Self> {
        let public_base = public_base_url
            .filter(|u| !u.trim().is_empty())
            .map(PublicBase::parse)
            .transpose()?;

        Ok(ObjectStorageGateway {
            storage,
            public_base,
        })
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.storage.backend_type()
    }

    /// Configured public base URL, without trailing slash.
    pub fn public_base_url(&self) -> Option<&str> {
        self.public_base.as_ref().map(|b| b.raw.as_str())
    }

    /// Public URL of `key`.
    pub fn url_for(&self, key: &str) -> StorageResult<String> {
        let base = self.require_base()?;
        Ok(format!(
            "{}/{}",
            base.raw,
            utf8_percent_encode(key, KEY_ENCODE_SET)
        ))
    }

    fn require_base(&self) -> StorageResult<&PublicBase> {
        self.public_base.as_ref().ok_or_else(|| {
            StorageError::ConfigError("Public storage URL is not configured".to_string())
        })
    }

    /// Store `data` under `key` and return the stored object with its public URL.
    #[tracing::instrument(skip(self, data), fields(key = %key, size_bytes = data.len()))]
    pub async fn upload(
        &self,
        data: Bytes,
        key: &str,
        content_type: &str,
    ) -> StorageResult<StorageObject> {
        // Resolve the URL first: without a public base nothing is written.
        let url = self.url_for(key)?;
        validate_key(key)?;

        let size_bytes = data.len() as u64;
        self.storage
            .put(key, data, content_type)
            .await
            .map_err(|e| match e {
                StorageError::UploadFailed(_) | StorageError::InvalidKey(_) => e,
                other => StorageError::UploadFailed(other.to_string()),
            })?;

        Ok(StorageObject {
            key: key.to_string(),
            url,
            content_type: content_type.to_string(),
            size_bytes,
        })
    }

    /// Delete the object under `key`. A missing object is not an error.
    #[tracing::instrument(skip(self), fields(key = %key))]
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        validate_key(key)?;

        self.storage.delete(key).await.map_err(|e| match e {
            StorageError::DeleteFailed(_) | StorageError::InvalidKey(_) => e,
            other => StorageError::DeleteFailed(other.to_string()),
        })
    }

    /// Whether an object exists under `key`.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        self.storage.exists(key).await
    }

    /// Whether `url` points into the configured storage domain.
    ///
    /// Host comparison is case-insensitive, the scheme is ignored and the path
    /// must sit under the base path on a segment boundary. Malformed input and
    /// a gateway without public base are never owned.
    pub fn is_owned_url(&self, url: &str) -> bool {
        let Some(base) = self.public_base.as_ref() else {
            return false;
        };
        match Url::parse(url.trim()) {
            Ok(parsed) => base.key_of(&parsed).is_some(),
            Err(_) => false,
        }
    }

    /// Storage key of `url`.
    ///
    /// URLs under the public base yield the path after the base. Other URLs
    /// yield their path without the leading slash. Input that does not parse
    /// as a URL is taken to be a key already.
    pub fn extract_key(&self, url: &str) -> String {
        let Ok(parsed) = Url::parse(url.trim()) else {
            return url.to_string();
        };

        if let Some(key) = self.public_base.as_ref().and_then(|b| b.key_of(&parsed)) {
            return key;
        }

        decode(parsed.path().trim_start_matches('/'))
    }
}
