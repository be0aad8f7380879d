//! Storage layer.
//!
//! The [`FactoidStore`] trait is the whole persistence boundary. Two
//! backends ship with the crate:
//! - [`persistence::SqliteFactoidStore`]: durable, file-backed
//! - [`persistence::MemoryFactoidStore`]: volatile, for tests and demos

// Allow significant_drop_tightening - holding the connection for the whole
// statement is intended.
#![allow(clippy::significant_drop_tightening)]

pub mod persistence;
pub mod sqlite;
pub mod traits;

pub use persistence::{MemoryFactoidStore, SqliteFactoidStore};
pub use traits::FactoidStore;

use crate::Result;
use crate::config::{FactkeeperConfig, StorageBackend};
use std::sync::Arc;
use std::time::Duration;

/// Opens the store selected by the configuration.
///
/// # Errors
///
/// Returns [`crate::Error::StoreUnavailable`] if the `SQLite` database cannot
/// be opened.
pub fn open_store(config: &FactkeeperConfig) -> Result<Arc<dyn FactoidStore>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::info!(backend = "memory", "opening factoid store");
            Ok(Arc::new(MemoryFactoidStore::new()))
        },
        StorageBackend::Sqlite => {
            let path = config.storage.resolved_path(&config.data_dir);
            tracing::info!(backend = "sqlite", path = %path.display(), "opening factoid store");
            let store = SqliteFactoidStore::open_with_timeout(
                path,
                Duration::from_millis(config.storage.busy_timeout_ms),
            )?;
            Ok(Arc::new(store))
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_memory_store() {
        let mut config = FactkeeperConfig::default();
        config.storage.backend = StorageBackend::Memory;
        let store = open_store(&config).unwrap();
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_open_sqlite_store_in_data_dir() {
        let dir = TempDir::new().unwrap();
        let config = FactkeeperConfig::default().with_data_dir(dir.path());
        let store = open_store(&config).unwrap();
        assert_eq!(store.count().unwrap(), 0);
        assert!(dir.path().join("factoids.db").exists());
    }
}
