use std::borrow::Cow;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A raw uploaded file, before any backend-specific encoding.
#[derive(Debug, Clone)]
pub struct RawFile {
    pub name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

/// Backend-specific encoded form of a video's bytes.
///
/// The binary variant keeps the original bytes with their MIME type; the
/// text variant is a self-describing `data:<mime>;base64,<bytes>` string.
#[derive(Debug, Clone, PartialEq)]
pub enum VideoPayload {
    Binary { mime_type: String, bytes: Vec<u8> },
    DataUrl(String),
}

/// A reference consumable by a playback surface: decoded bytes plus their
/// MIME type. Borrows from the record when the backend stores raw bytes.
#[derive(Debug, Clone)]
pub struct PlayableHandle<'a> {
    pub mime_type: String,
    pub bytes: Cow<'a, [u8]>,
}

/// One analysis run against a stored video.
///
/// Exactly one of `result` / `error` is set; `success` records which. Use
/// the constructors rather than building the struct by hand.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub mode: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub result: Option<Value>,
    pub error: Option<String>,
}

impl AnalysisResult {
    pub fn success<S: Into<String>>(mode: S, result: Value) -> Self {
        Self {
            mode: mode.into(),
            timestamp: Utc::now(),
            success: true,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure<S: Into<String>, E: Into<String>>(mode: S, error: E) -> Self {
        Self {
            mode: mode.into(),
            timestamp: Utc::now(),
            success: false,
            result: None,
            error: Some(error.into()),
        }
    }
}

/// One stored video: encoded payload plus metadata and analysis history.
#[derive(Debug, Clone)]
pub struct VideoRecord {
    pub id: String,
    pub name: String,
    pub payload: VideoPayload,
    /// Opaque reference to the remote counterpart, stored verbatim.
    pub remote_handle: Value,
    pub uploaded_at: DateTime<Utc>,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
    /// Byte length of the original file, fixed at creation.
    pub size: u64,
    pub analysis_history: Vec<AnalysisResult>,
}

/// Input to `VideoStore::save`.
#[derive(Debug, Clone)]
pub struct VideoUpload {
    pub file: RawFile,
    pub remote_handle: Value,
    pub size: u64,
    pub thumbnail: Option<String>,
    pub duration: Option<f64>,
}

impl VideoUpload {
    /// Builds an upload with `size` taken from the raw byte length.
    pub fn new(file: RawFile, remote_handle: Value) -> Self {
        let size = file.bytes.len() as u64;
        Self { file, remote_handle, size, thumbnail: None, duration: None }
    }

    pub fn with_thumbnail(mut self, thumbnail: Option<String>) -> Self {
        self.thumbnail = thumbnail;
        self
    }

    pub fn with_duration(mut self, duration: Option<f64>) -> Self {
        self.duration = duration;
        self
    }
}
