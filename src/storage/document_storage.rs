use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::codec;
use crate::error_handling::types::StorageError;
use crate::quota::capacity::{format_bytes, CapacityBudget, RecordSummary, StorageInfo};
use crate::quota::eviction;
use crate::storage::types::{
    AnalysisResult, PlayableHandle, VideoPayload, VideoRecord, VideoUpload,
};
use crate::storage::video_store::VideoStore;

/// Text-encoded storage backend.
///
/// The whole library lives in one JSON document on disk; payloads are kept
/// as `data:<mime>;base64,<bytes>` strings. Sized for environments with a
/// hard per-document quota, hence the small budget.
pub struct DocumentStorage {
    path: PathBuf,
    budget: CapacityBudget,
    // Serializes every operation; readers always see a whole document.
    lock: Mutex<()>,
}

/// Persisted shape of one record inside the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DocumentRecord {
    id: String,
    name: String,
    payload: String,
    remote_handle: Value,
    uploaded_at: DateTime<Utc>,
    thumbnail: Option<String>,
    duration: Option<f64>,
    size: u64,
    #[serde(default)]
    analysis_history: Vec<AnalysisResult>,
}

impl DocumentRecord {
    fn into_record(self) -> VideoRecord {
        VideoRecord {
            id: self.id,
            name: self.name,
            payload: VideoPayload::DataUrl(self.payload),
            remote_handle: self.remote_handle,
            uploaded_at: self.uploaded_at,
            thumbnail: self.thumbnail,
            duration: self.duration,
            size: self.size,
            analysis_history: self.analysis_history,
        }
    }
}

impl DocumentStorage {
    /// Document filename inside the storage directory.
    const DOCUMENT_FILE: &'static str = "videotheque.json";

    /// Realistic per-document quota for text-encoded persistence.
    const MAX_STORAGE_BYTES: u64 = 8 * 1024 * 1024;

    /// Reasonable record ceiling for a single text document.
    pub const MAX_VIDEOS: usize = 5;

    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        Self::with_budget(
            dir,
            CapacityBudget {
                capacity_bytes: Self::MAX_STORAGE_BYTES,
                max_records: Self::MAX_VIDEOS,
            },
        )
    }

    /// Construct using env var VIDEOTHEQUE_STORAGE_DIR if set, otherwise the
    /// current directory.
    pub fn new_default() -> Result<Self, StorageError> {
        if let Ok(dir) = std::env::var("VIDEOTHEQUE_STORAGE_DIR") {
            info!("Using DocumentStorage from VIDEOTHEQUE_STORAGE_DIR: {}", dir);
            return Self::new(PathBuf::from(dir));
        }
        let cwd = std::env::current_dir().map_err(|e| {
            error!("Failed to get current dir: {}", e);
            StorageError::BackendUnavailable(e.to_string())
        })?;
        Self::new(cwd)
    }

    pub fn with_budget<P: AsRef<Path>>(
        dir: P,
        budget: CapacityBudget,
    ) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            error!("Failed to create storage dir {}: {}", dir.display(), e);
            StorageError::BackendUnavailable(e.to_string())
        })?;
        let path = dir.join(Self::DOCUMENT_FILE);
        info!("DocumentStorage initialized at {}", path.display());
        Ok(Self { path, budget, lock: Mutex::new(()) })
    }

    /// Loads the whole document. A missing file is an empty library; an
    /// unreadable or corrupt one is treated as empty after a loud log, the
    /// way the store has always behaved under corruption.
    fn load(&self) -> Vec<DocumentRecord> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                error!("Failed to read document {}: {}", self.path.display(), e);
                return Vec::new();
            }
        };
        match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(e) => {
                error!("Corrupt document {}: {}", self.path.display(), e);
                Vec::new()
            }
        }
    }

    fn persist(&self, records: &[DocumentRecord]) -> Result<(), StorageError> {
        let json = serde_json::to_string(records).map_err(|e| {
            error!("Failed to serialize document: {}", e);
            StorageError::WriteFailed
        })?;
        fs::write(&self.path, json).map_err(|e| {
            error!("Failed to write document {}: {}", self.path.display(), e);
            StorageError::WriteFailed
        })
    }

    fn summaries(records: &[DocumentRecord]) -> Vec<RecordSummary> {
        records
            .iter()
            .map(|r| RecordSummary {
                id: r.id.clone(),
                uploaded_at: r.uploaded_at,
                size: r.size,
            })
            .collect()
    }

    fn sort_oldest_first(records: &mut [DocumentRecord]) {
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id)));
    }
}

impl VideoStore for DocumentStorage {
    fn save(&self, upload: VideoUpload) -> Result<String, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::WriteFailed)?;
        let mut records = self.load();

        let summaries = Self::summaries(&records);
        let projected = CapacityBudget::projected(&summaries, upload.size);
        if projected > self.budget.capacity_bytes {
            let needed = projected - self.budget.capacity_bytes;
            let plan = eviction::plan(&summaries, needed);
            info!(
                "Storage limit exceeded ({} > {}), evicting {} record(s)",
                format_bytes(projected),
                format_bytes(self.budget.capacity_bytes),
                plan.victims.len()
            );
            for victim in &plan.victims {
                match records.iter().position(|r| &r.id == victim) {
                    Some(pos) => {
                        let removed = records.remove(pos);
                        debug!("Evicted {} ({})", removed.name, format_bytes(removed.size));
                    }
                    None => warn!("Eviction candidate {} already gone, skipping", victim),
                }
            }
            // Evictions are kept even if the save below fails.
            if !plan.victims.is_empty() {
                self.persist(&records)?;
            }

            let used: u64 = records.iter().map(|r| r.size).sum();
            if used + upload.size > self.budget.capacity_bytes {
                return Err(StorageError::PayloadTooLarge {
                    required: upload.size,
                    available: self.budget.capacity_bytes,
                });
            }
        }

        let record = DocumentRecord {
            id: Uuid::new_v4().to_string(),
            name: upload.file.name.clone(),
            payload: codec::encode_data_url(&upload.file),
            remote_handle: upload.remote_handle,
            uploaded_at: Utc::now(),
            thumbnail: upload.thumbnail,
            duration: upload.duration,
            size: upload.size,
            analysis_history: Vec::new(),
        };
        let id = record.id.clone();
        records.push(record);

        if self.persist(&records).is_err() {
            // The document layer refused the write even though accounting
            // said it fits. Keep only the newest two records (the incoming
            // one included) and retry exactly once.
            warn!("Document write refused - emergency cleanup, keeping newest two records");
            Self::sort_oldest_first(&mut records);
            let keep_from = records.len().saturating_sub(2);
            records.drain(..keep_from);
            self.persist(&records).map_err(|_| StorageError::PersistenceExhausted)?;
        }

        if records.len() > self.budget.max_records {
            let excess = records.len() - self.budget.max_records;
            Self::sort_oldest_first(&mut records);
            records.drain(..excess);
            info!("Record ceiling exceeded, dropped {} oldest record(s)", excess);
            self.persist(&records)?;
        }

        debug!("Saved video {} ({})", id, format_bytes(upload.size));
        Ok(id)
    }

    fn get_all(&self) -> Result<Vec<VideoRecord>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::ReadFailed)?;
        Ok(self.load().into_iter().map(DocumentRecord::into_record).collect())
    }

    fn get_by_id(&self, id: &str) -> Result<Option<VideoRecord>, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::ReadFailed)?;
        Ok(self
            .load()
            .into_iter()
            .find(|r| r.id == id)
            .map(DocumentRecord::into_record))
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::WriteFailed)?;
        let mut records = self.load();
        let before = records.len();
        records.retain(|r| r.id != id);
        if records.len() != before {
            self.persist(&records)?;
            debug!("Deleted video {}", id);
        }
        Ok(())
    }

    fn append_analysis(&self, id: &str, entry: AnalysisResult) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::WriteFailed)?;
        let mut records = self.load();
        let record = records.iter_mut().find(|r| r.id == id).ok_or(StorageError::NotFound)?;
        record.analysis_history.push(entry);
        self.persist(&records)
    }

    fn clear_all(&self) -> Result<(), StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::WriteFailed)?;
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => {
                error!("Failed to clear document {}: {}", self.path.display(), e);
                Err(StorageError::WriteFailed)
            }
        }
    }

    fn playable_handle<'a>(
        &self,
        record: &'a VideoRecord,
    ) -> Result<PlayableHandle<'a>, StorageError> {
        codec::decode(&record.payload)
    }

    fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        let _guard = self.lock.lock().map_err(|_| StorageError::ReadFailed)?;
        let records = self.load();
        Ok(self.budget.info(&Self::summaries(&records)))
    }

    fn budget(&self) -> CapacityBudget {
        self.budget
    }
}
