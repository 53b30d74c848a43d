//! Portrait Storage Library
//!
//! Object storage for profile images: the [`Storage`] backend trait with S3
//! and local filesystem implementations, the key naming scheme, and the
//! [`ObjectStorageGateway`] that ties backends to their public URL space.
//!
//! # Storage key format
//!
//! `profile-images/{userId}-{unixMillis}-{random7}.{ext}`
//!
//! Keys must not contain `..` or a leading `/`. Key generation is centralized
//! in the `keys` module so every backend and every client agree on it.

pub mod factory;
pub mod gateway;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

pub use factory::create_storage;
pub use gateway::{ObjectStorageGateway, StorageObject};
pub use keys::{extension_from_filename, generate_profile_image_key};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use portrait_core::StorageBackend;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
