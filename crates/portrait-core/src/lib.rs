//! Portrait Core Library
//!
//! Domain models, error types, configuration and shared constants used by the
//! profile image pipeline crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, LogFormat, ServiceConfig, StorageTarget};
pub use error::{AppError, ErrorMetadata, FieldErrors, LogLevel};
pub use storage_types::StorageBackend;
