use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which persistence strategy backs the library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Text-encoded single-document store; small but portable.
    Document,
    /// SQLite blob store; larger budget, binary payloads.
    Database,
}

impl Default for BackendKind {
    fn default() -> Self {
        BackendKind::Database
    }
}
