//! VideoStore Trait
//!
//! This module defines the `VideoStore` trait, which provides an interface
//! for capacity-budgeted video storage backends.
//!
//! Implementors of this trait are responsible for:
//! - Persisting and retrieving video records keyed by id
//! - Enforcing the byte capacity and record-count ceilings on save,
//!   evicting oldest records when a save would exceed them
//! - Appending analysis results to a record's history
//! - Reconstructing playable handles from stored payloads
//!
//! All methods return a `Result` to handle potential storage errors.

use crate::error_handling::types::StorageError;
use crate::quota::capacity::{CapacityBudget, StorageInfo};
use crate::storage::types::{AnalysisResult, PlayableHandle, VideoRecord, VideoUpload};

/// The `VideoStore` trait defines the interface for video storage backends.
///
/// A save runs the full quota protocol: capacity check, oldest-first
/// eviction cascade, persist, emergency fallback, count-ceiling truncation.
/// Mutations are serialized per store instance; reads observe consistent
/// snapshots.
pub trait VideoStore: Send + Sync {
    /// Saves an upload, evicting older records if needed to restore
    /// capacity. Returns the id of the new record.
    ///
    /// Evictions performed before a failed save are kept; they are a real
    /// side effect, not a transaction.
    fn save(&self, upload: VideoUpload) -> Result<String, StorageError>;

    /// Retrieves all currently persisted records. No ordering is promised.
    fn get_all(&self) -> Result<Vec<VideoRecord>, StorageError>;

    /// Retrieves one record by id; absence is not an error.
    fn get_by_id(&self, id: &str) -> Result<Option<VideoRecord>, StorageError>;

    /// Deletes a record. Deleting an absent id is a no-op.
    fn delete(&self, id: &str) -> Result<(), StorageError>;

    /// Appends one analysis entry to a record's history.
    ///
    /// Fails with `NotFound` if the id does not exist.
    fn append_analysis(&self, id: &str, entry: AnalysisResult) -> Result<(), StorageError>;

    /// Unconditionally empties the store.
    fn clear_all(&self) -> Result<(), StorageError>;

    /// Decodes a record's payload into a playable handle.
    ///
    /// Corruption surfaces as `MalformedPayload` and affects only the one
    /// record.
    fn playable_handle<'a>(
        &self,
        record: &'a VideoRecord,
    ) -> Result<PlayableHandle<'a>, StorageError>;

    /// Live usage snapshot, recomputed on every call.
    fn storage_info(&self) -> Result<StorageInfo, StorageError>;

    /// The backend's configured ceilings, for display.
    fn budget(&self) -> CapacityBudget;
}
