//! Application state management
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;
use vault_core::AppConfig;
use vault_store::RecordStore;

/// Application state shared across handlers
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Encrypted record store
    pub store: Arc<RecordStore>,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    pub fn new(config: AppConfig, store: RecordStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
