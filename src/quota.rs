//! Quota subsystem
//!
//! Shared capacity accounting and eviction planning used by both storage
//! backends.
//!
//! Components:
//! - `capacity`: byte budget arithmetic and live storage usage reporting.
//! - `eviction`: deterministic oldest-first victim selection.

pub mod capacity;
pub mod eviction;

pub use capacity::{format_bytes, CapacityBudget, RecordSummary, StorageInfo};
pub use eviction::EvictionPlan;
