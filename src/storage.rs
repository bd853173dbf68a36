//! Storage subsystem
//!
//! This module provides abstractions and implementations for persisting
//! video records, their derived metadata, and analysis history under a hard
//! capacity budget.
//!
//! Components:
//! - `video_store`: the VideoStore trait defining a uniform API.
//! - `types`: shared data types used by storage backends.
//! - `document_storage`: text-encoded backend holding the whole library as
//!   one JSON document, payloads as data URLs.
//! - `database_storage`: SQLite-backed implementation storing payloads as
//!   binary blobs.

pub mod database_storage;
pub mod document_storage;
pub mod types;
pub mod video_store;

pub use database_storage::DatabaseStorage;
pub use document_storage::DocumentStorage;
pub use video_store::VideoStore;

use crate::configuration::config::Config;
use crate::error_handling::types::StorageError;

/// Opens the backend selected by the configuration.
pub fn open_store(config: &Config) -> Result<Box<dyn VideoStore>, StorageError> {
    use crate::configuration::types::BackendKind;
    match config.backend {
        BackendKind::Document => Ok(Box::new(DocumentStorage::new(&config.storage_dir)?)),
        BackendKind::Database => Ok(Box::new(DatabaseStorage::new_in_dir(&config.storage_dir)?)),
    }
}
