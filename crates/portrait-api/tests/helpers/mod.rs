pub mod auth;
pub mod storage;
pub mod stores;

use std::sync::Arc;

use axum_test::TestServer;
use portrait_api::auth::JwtVerifier;
use portrait_api::setup::routes::setup_routes;
use portrait_api::state::AppState;
use portrait_core::constants::MAX_IMAGE_BYTES;
use portrait_core::{BaseConfig, Config, LogFormat, ServiceConfig, StorageBackend, StorageTarget};
use portrait_processing::ImageValidator;
use portrait_storage::{LocalStorage, ObjectStorageGateway};
use tempfile::TempDir;

use self::storage::RecordingStorage;
use self::stores::{InMemoryProfiles, InMemoryReference};

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";
pub const PUBLIC_BASE_URL: &str = "https://cdn.example.com";

/// HTTP server over in-memory stores and a tempdir-backed storage.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<RecordingStorage>,
    pub profiles: Arc<InMemoryProfiles>,
    pub jwt: JwtVerifier,
    pub _temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Bearer token for `user_id`.
    pub fn token_for(&self, user_id: uuid::Uuid) -> String {
        auth::mint_token(&self.jwt, user_id)
    }
}

pub fn test_config(storage_path: &str) -> Config {
    Config(Box::new(ServiceConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["*".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            log_format: LogFormat::Compact,
        },
        database_url: "postgresql://localhost/unused".to_string(),
        storage_backend: Some(StorageBackend::Local),
        storage_target: StorageTarget {
            bucket: None,
            public_base_url: Some(PUBLIC_BASE_URL.to_string()),
        },
        s3_region: None,
        s3_endpoint: None,
        local_storage_path: Some(storage_path.to_string()),
        local_storage_base_url: Some(PUBLIC_BASE_URL.to_string()),
        max_file_size_bytes: MAX_IMAGE_BYTES,
    }))
}

/// Setup a test application with empty stores.
pub async fn setup_test_app() -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let storage_path = temp_dir.path().to_string_lossy().to_string();
    let config = test_config(&storage_path);

    let local = LocalStorage::new(temp_dir.path())
        .await
        .expect("Failed to create local storage");
    let storage = Arc::new(RecordingStorage::new(local));
    let gateway = ObjectStorageGateway::new(storage.clone(), config.public_base_url())
        .expect("Failed to build gateway");

    let profiles = Arc::new(InMemoryProfiles::default());
    let jwt = JwtVerifier::new(config.jwt_secret());

    let state = Arc::new(AppState {
        config: config.clone(),
        gateway: Arc::new(gateway),
        profiles: profiles.clone(),
        reference: Arc::new(InMemoryReference::seeded()),
        validator: ImageValidator::default(),
        jwt: jwt.clone(),
        db_pool: None,
    });

    let router = setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(router).expect("Failed to start test server");

    TestApp {
        server,
        storage,
        profiles,
        jwt,
        _temp_dir: temp_dir,
    }
}
