//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p storefront-api`. No external services
//! are needed; object storage is the in-memory backend wrapped in
//! [`storage::FlakyStorage`].

#![allow(dead_code)]

pub mod fixtures;
pub mod storage;

use axum_test::TestServer;
use std::sync::Arc;
use storefront_api::setup::routes;
use storefront_api::state::AppState;
use storefront_core::{Config, InMemoryProductAssets, MockCardNetwork};

use storage::FlakyStorage;

/// Small parts so test files span several of them.
pub const PART_SIZE: usize = 1024;
pub const MAX_TEMPLATE_SIZE: usize = 64 * 1024;
pub const MAX_IMAGE_SIZE: usize = 16 * 1024;

/// Test application: server plus handles on the injected backends.
pub struct TestApp {
    pub server: TestServer,
    pub storage: Arc<FlakyStorage>,
    pub config: Config,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }
}

pub fn test_config() -> Config {
    let mut config = Config::default();
    config.storage.part_size_bytes = PART_SIZE;
    config.limits.max_template_size_bytes = MAX_TEMPLATE_SIZE;
    config.limits.max_image_size_bytes = MAX_IMAGE_SIZE;
    config
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with(test_config(), FlakyStorage::default())
}

pub fn setup_test_app_with(config: Config, storage: FlakyStorage) -> TestApp {
    let storage = Arc::new(storage);
    let state = Arc::new(AppState::new(
        config.clone(),
        storage.clone(),
        Arc::new(InMemoryProductAssets::new()),
        Arc::new(MockCardNetwork),
    ));

    let app = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        storage,
        config,
    }
}
