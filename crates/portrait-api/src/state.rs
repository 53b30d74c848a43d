//! Application state shared by all handlers.
//!
//! Built once in `setup::initialize_app` and handed to handlers as
//! `State<Arc<AppState>>`. Stores are trait objects so the HTTP layer can be
//! exercised against in-memory implementations.

use std::sync::Arc;

use portrait_core::Config;
use portrait_db::{ProfileStore, ReferenceStore};
use portrait_processing::ImageValidator;
use portrait_storage::ObjectStorageGateway;
use sqlx::PgPool;

use crate::auth::JwtVerifier;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub gateway: Arc<ObjectStorageGateway>,
    pub profiles: Arc<dyn ProfileStore>,
    pub reference: Arc<dyn ReferenceStore>,
    pub validator: ImageValidator,
    pub jwt: JwtVerifier,
    /// Pool used by health checks; absent when stores are not Postgres-backed
    pub db_pool: Option<PgPool>,
}
