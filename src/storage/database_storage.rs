use std::env;
use std::path::Path;
use std::str::FromStr;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Pool, Sqlite,
};
use uuid::Uuid;

use crate::codec;
use crate::error_handling::types::StorageError;
use crate::quota::capacity::{format_bytes, CapacityBudget, RecordSummary, StorageInfo};
use crate::quota::eviction;
use crate::storage::types::{
    AnalysisResult, PlayableHandle, VideoPayload, VideoRecord, VideoUpload,
};
use crate::storage::video_store::VideoStore;

// Internal row mapping for videos to avoid manual try_get
#[derive(Debug, sqlx::FromRow)]
struct VideoRow {
    id: String,
    name: String,
    mime_type: String,
    payload: Vec<u8>,
    remote_handle: String,
    uploaded_at: String,
    thumbnail: Option<String>,
    duration: Option<f64>,
    size: i64,
}

impl VideoRow {
    fn into_record(self, analysis_history: Vec<AnalysisResult>) -> Result<VideoRecord, StorageError> {
        Ok(VideoRecord {
            id: self.id,
            name: self.name,
            payload: VideoPayload::Binary { mime_type: self.mime_type, bytes: self.payload },
            remote_handle: serde_json::from_str(&self.remote_handle)
                .map_err(|_| StorageError::ReadFailed)?,
            uploaded_at: DateTime::parse_from_rfc3339(&self.uploaded_at)
                .map_err(|_| StorageError::ReadFailed)?
                .with_timezone(&Utc),
            thumbnail: self.thumbnail,
            duration: self.duration,
            size: self.size as u64,
            analysis_history,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct HistoryRow {
    mode: String,
    timestamp: String,
    success: bool,
    result: Option<String>,
    error: Option<String>,
}

impl HistoryRow {
    fn into_entry(self) -> Result<AnalysisResult, StorageError> {
        Ok(AnalysisResult {
            mode: self.mode,
            timestamp: DateTime::parse_from_rfc3339(&self.timestamp)
                .map_err(|_| StorageError::ReadFailed)?
                .with_timezone(&Utc),
            success: self.success,
            result: match self.result {
                Some(s) => Some(serde_json::from_str(&s).map_err(|_| StorageError::ReadFailed)?),
                None => None,
            },
            error: self.error,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    id: String,
    uploaded_at: String,
    size: i64,
}

/// Binary-blob storage backend.
///
/// Payloads are stored as SQLite BLOBs with their MIME type alongside, so
/// playback needs no re-encoding. Sized for the larger budget a real
/// database affords.
pub struct DatabaseStorage {
    rt: tokio::runtime::Runtime,
    pool: Pool<Sqlite>,
    budget: CapacityBudget,
    // One mutation in flight at a time; the capacity check and the write it
    // guards must not interleave with another save.
    write_lock: Mutex<()>,
}

impl DatabaseStorage {
    /// Default database filename used in the application's working directory
    const DEFAULT_DB_FILE: &'static str = "videotheque.sqlite3";

    /// Byte budget for blob persistence.
    const MAX_STORAGE_BYTES: u64 = 500 * 1024 * 1024;

    /// Record ceiling; a database holds more than a text document.
    pub const MAX_VIDEOS: usize = 20;

    /// Create or open the database in the current working directory with the default filename
    pub fn new() -> Result<Self, StorageError> {
        let cwd = env::current_dir()
            .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;
        Self::new_file(cwd.join(Self::DEFAULT_DB_FILE))
    }

    /// Create or open the database inside the given directory.
    pub fn new_in_dir<P: AsRef<Path>>(dir: P) -> Result<Self, StorageError> {
        Self::new_file(dir.as_ref().join(Self::DEFAULT_DB_FILE))
    }

    pub fn new_file<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        Self::with_budget(
            path,
            CapacityBudget {
                capacity_bytes: Self::MAX_STORAGE_BYTES,
                max_records: Self::MAX_VIDEOS,
            },
        )
    }

    pub fn with_budget<P: AsRef<Path>>(
        path: P,
        budget: CapacityBudget,
    ) -> Result<Self, StorageError> {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;
        let path_ref = path.as_ref();
        if let Some(parent) = path_ref.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?;
        }
        let pool = rt.block_on(async {
            let opts = SqliteConnectOptions::from_str("sqlite://")
                .map_err(|e| StorageError::BackendUnavailable(e.to_string()))?
                .filename(path_ref)
                .create_if_missing(true)
                .foreign_keys(true);
            let pool = SqlitePoolOptions::new()
                .max_connections(5)
                .connect_with(opts)
                .await
                .map_err(|e| {
                    error!("Failed to open database {}: {}", path_ref.display(), e);
                    StorageError::BackendUnavailable(e.to_string())
                })?;
            // create schema
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS videos (
                    id TEXT PRIMARY KEY,
                    name TEXT NOT NULL,
                    mime_type TEXT NOT NULL,
                    payload BLOB NOT NULL,
                    remote_handle TEXT NOT NULL,
                    uploaded_at TEXT NOT NULL,
                    thumbnail TEXT,
                    duration REAL,
                    size INTEGER NOT NULL
                );",
            )
            .execute(&pool)
            .await
            .map_err(|_| StorageError::WriteFailed)?;
            sqlx::query(
                "CREATE TABLE IF NOT EXISTS analysis_history (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    video_id TEXT NOT NULL,
                    mode TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    success INTEGER NOT NULL,
                    result TEXT,
                    error TEXT,
                    FOREIGN KEY(video_id) REFERENCES videos(id) ON DELETE CASCADE
                );",
            )
            .execute(&pool)
            .await
            .map_err(|_| StorageError::WriteFailed)?;
            Ok::<_, StorageError>(pool)
        })?;
        info!("DatabaseStorage initialized at {}", path_ref.display());
        Ok(Self { rt, pool, budget, write_lock: Mutex::new(()) })
    }

    async fn summaries(&self) -> Result<Vec<RecordSummary>, StorageError> {
        let rows: Vec<SummaryRow> =
            sqlx::query_as("SELECT id, uploaded_at, size FROM videos")
                .fetch_all(&self.pool)
                .await
                .map_err(|_| StorageError::ReadFailed)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(RecordSummary {
                id: row.id,
                uploaded_at: DateTime::parse_from_rfc3339(&row.uploaded_at)
                    .map_err(|_| StorageError::ReadFailed)?
                    .with_timezone(&Utc),
                size: row.size as u64,
            });
        }
        Ok(out)
    }

    async fn history_for(&self, video_id: &str) -> Result<Vec<AnalysisResult>, StorageError> {
        let rows: Vec<HistoryRow> = sqlx::query_as(
            "SELECT mode, timestamp, success, result, error
             FROM analysis_history WHERE video_id = ?1 ORDER BY id ASC",
        )
        .bind(video_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|_| StorageError::ReadFailed)?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(row.into_entry()?);
        }
        Ok(out)
    }

    async fn insert_video(&self, upload: &VideoUpload, id: &str, uploaded_at: &DateTime<Utc>) -> Result<(), sqlx::Error> {
        let remote = upload.remote_handle.to_string();
        sqlx::query(
            "INSERT INTO videos (id, name, mime_type, payload, remote_handle, uploaded_at, thumbnail, duration, size)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(id)
        .bind(&upload.file.name)
        .bind(&upload.file.mime_type)
        .bind(upload.file.bytes.as_slice())
        .bind(remote)
        .bind(uploaded_at.to_rfc3339())
        .bind(upload.thumbnail.clone())
        .bind(upload.duration)
        .bind(upload.size as i64)
        .execute(&self.pool)
        .await
        .map(|_| ())
    }

    async fn delete_ids(&self, ids: &[String]) {
        // Best-effort: a victim that refuses to delete is logged and
        // skipped, the cascade moves on.
        for id in ids {
            match sqlx::query("DELETE FROM videos WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
            {
                Ok(_) => debug!("Evicted video {}", id),
                Err(e) => error!("Failed to evict {}: {}", id, e),
            }
        }
    }
}

impl VideoStore for DatabaseStorage {
    fn save(&self, upload: VideoUpload) -> Result<String, StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::WriteFailed)?;
        self.rt.block_on(async {
            let summaries = self.summaries().await?;
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
                self.delete_ids(&plan.victims).await;

                // Recompute from the database: failed evictions count.
                let remaining = self.summaries().await?;
                if !self.budget.fits(&remaining, upload.size) {
                    return Err(StorageError::PayloadTooLarge {
                        required: upload.size,
                        available: self.budget.capacity_bytes,
                    });
                }
            }

            let id = Uuid::new_v4().to_string();
            let uploaded_at = Utc::now();
            if let Err(e) = self.insert_video(&upload, &id, &uploaded_at).await {
                // Out-of-accounting-model refusal: keep only the newest two
                // records (the incoming one included) and retry once.
                warn!("Database write refused ({}), emergency cleanup", e);
                let keep: Option<String> =
                    sqlx::query_scalar(
                        "SELECT id FROM videos ORDER BY uploaded_at DESC, id DESC LIMIT 1",
                    )
                    .fetch_optional(&self.pool)
                    .await
                    .map_err(|_| StorageError::PersistenceExhausted)?;
                let purge = match keep {
                    Some(keep_id) => sqlx::query("DELETE FROM videos WHERE id != ?1")
                        .bind(keep_id)
                        .execute(&self.pool)
                        .await,
                    None => sqlx::query("DELETE FROM videos").execute(&self.pool).await,
                };
                purge.map_err(|_| StorageError::PersistenceExhausted)?;
                self.insert_video(&upload, &id, &uploaded_at)
                    .await
                    .map_err(|_| StorageError::PersistenceExhausted)?;
            }

            // Count ceiling, independent of the byte budget.
            let mut after = self.summaries().await?;
            if after.len() > self.budget.max_records {
                after.sort_by(|a, b| {
                    a.uploaded_at.cmp(&b.uploaded_at).then_with(|| a.id.cmp(&b.id))
                });
                let excess = after.len() - self.budget.max_records;
                let oldest: Vec<String> =
                    after.iter().take(excess).map(|s| s.id.clone()).collect();
                info!("Record ceiling exceeded, dropping {} oldest record(s)", excess);
                self.delete_ids(&oldest).await;
            }

            debug!("Saved video {} ({})", id, format_bytes(upload.size));
            Ok(id)
        })
    }

    fn get_all(&self) -> Result<Vec<VideoRecord>, StorageError> {
        self.rt.block_on(async {
            let rows: Vec<VideoRow> = sqlx::query_as(
                "SELECT id, name, mime_type, payload, remote_handle, uploaded_at, thumbnail, duration, size
                 FROM videos",
            )
            .fetch_all(&self.pool)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
            let mut out = Vec::with_capacity(rows.len());
            for row in rows {
                let history = self.history_for(&row.id).await?;
                out.push(row.into_record(history)?);
            }
            Ok(out)
        })
    }

    fn get_by_id(&self, id: &str) -> Result<Option<VideoRecord>, StorageError> {
        self.rt.block_on(async {
            let row: Option<VideoRow> = sqlx::query_as(
                "SELECT id, name, mime_type, payload, remote_handle, uploaded_at, thumbnail, duration, size
                 FROM videos WHERE id = ?1",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|_| StorageError::ReadFailed)?;
            match row {
                Some(row) => {
                    let history = self.history_for(&row.id).await?;
                    Ok(Some(row.into_record(history)?))
                }
                None => Ok(None),
            }
        })
    }

    fn delete(&self, id: &str) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::WriteFailed)?;
        self.rt.block_on(async {
            sqlx::query("DELETE FROM videos WHERE id = ?1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(|_| StorageError::WriteFailed)?;
            Ok(())
        })
    }

    fn append_analysis(&self, id: &str, entry: AnalysisResult) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::WriteFailed)?;
        self.rt.block_on(async {
            let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM videos WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|_| StorageError::ReadFailed)?;
            if exists.is_none() {
                return Err(StorageError::NotFound);
            }
            sqlx::query(
                "INSERT INTO analysis_history (video_id, mode, timestamp, success, result, error)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )
            .bind(id)
            .bind(&entry.mode)
            .bind(entry.timestamp.to_rfc3339())
            .bind(entry.success)
            .bind(entry.result.as_ref().map(|v| v.to_string()))
            .bind(entry.error.clone())
            .execute(&self.pool)
            .await
            .map_err(|_| StorageError::WriteFailed)?;
            Ok(())
        })
    }

    fn clear_all(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().map_err(|_| StorageError::WriteFailed)?;
        self.rt.block_on(async {
            sqlx::query("DELETE FROM videos")
                .execute(&self.pool)
                .await
                .map_err(|_| StorageError::WriteFailed)?;
            Ok(())
        })
    }

    fn playable_handle<'a>(
        &self,
        record: &'a VideoRecord,
    ) -> Result<PlayableHandle<'a>, StorageError> {
        codec::decode(&record.payload)
    }

    fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        self.rt.block_on(async {
            let summaries = self.summaries().await?;
            Ok(self.budget.info(&summaries))
        })
    }

    fn budget(&self) -> CapacityBudget {
        self.budget
    }
}
