//! Application state
//!
//! Everything a handler needs is built once at startup and injected here; no
//! handler reads configuration from the environment.

use std::sync::Arc;

use storefront_core::{CardNetwork, Config, ProductAssets};
use storefront_storage::{ChunkedUploader, Storage, UploadSettings};

pub struct AppState {
    pub config: Config,
    pub storage: Arc<dyn Storage>,
    pub uploader: ChunkedUploader,
    pub assets: Arc<dyn ProductAssets>,
    pub card_network: Arc<dyn CardNetwork>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        assets: Arc<dyn ProductAssets>,
        card_network: Arc<dyn CardNetwork>,
    ) -> Self {
        let uploader = ChunkedUploader::new(
            Arc::clone(&storage),
            UploadSettings::from(&config.storage),
        );
        AppState {
            config,
            storage,
            uploader,
            assets,
            card_network,
        }
    }
}
