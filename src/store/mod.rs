pub mod document;
pub mod json;
pub mod keyspace;
pub mod memory;

use crate::core::config::{AppConfig, StorageBackend};
use crate::core::store::RateStore;
use anyhow::{Context, Result};
use document::DocumentFile;
use json::JsonFileStore;
use keyspace::KeyspaceStore;
use memory::MemoryStore;
use std::sync::Arc;
use tracing::info;

/// Opens the rate store selected by the configuration.
pub fn open_store(config: &AppConfig) -> Result<Arc<dyn RateStore>> {
    let store: Arc<dyn RateStore> = match config.storage.backend {
        StorageBackend::Json => Arc::new(JsonFileStore::new(config.store_path()?)),
        StorageBackend::Keyspace => {
            let path = config.keyspace_path()?;
            Arc::new(
                KeyspaceStore::open(&path)
                    .with_context(|| format!("Failed to open keyspace at {}", path.display()))?,
            )
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    info!(store = %store.describe(), "Opened rate store");
    Ok(store)
}

/// The report document location selected by the configuration.
pub fn report_document(config: &AppConfig) -> Result<DocumentFile> {
    Ok(DocumentFile::new(config.report_path()?))
}
