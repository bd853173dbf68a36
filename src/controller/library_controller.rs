//! Library controller
//!
//! Thin orchestration layer between a `VideoStore` and whatever surface
//! presents the library. Owns the injected store instance, keeps a cached
//! presentation list, and translates store failures into a user-facing
//! error state instead of letting them crash the application. A failed save
//! downgrades to `SaveOutcome::Unsaved` so an upload/analysis flow can
//! continue without a persisted library entry.

use log::{error, info, warn};
use serde_json::Value;

use crate::error_handling::types::StorageError;
use crate::quota::capacity::{CapacityBudget, StorageInfo};
use crate::storage::types::{AnalysisResult, PlayableHandle, RawFile, VideoRecord, VideoUpload};
use crate::storage::video_store::VideoStore;

/// Plain-function form of the thumbnail capture capability, for callers
/// that have no capture source.
pub type ThumbnailCapture = fn(&RawFile) -> Result<String, String>;

/// What became of a save request.
#[derive(Debug)]
pub enum SaveOutcome {
    Saved(String),
    /// The library entry could not be persisted; the surrounding flow may
    /// still analyze the in-memory upload.
    Unsaved { reason: String },
}

pub struct LibraryController {
    store: Box<dyn VideoStore>,
    videos: Vec<VideoRecord>,
    selected: Option<String>,
    last_error: Option<String>,
}

impl LibraryController {
    /// Builds a controller around an injected store and loads the full set.
    ///
    /// A failed initial load leaves an empty list and an error state; the
    /// controller stays usable.
    pub fn new(store: Box<dyn VideoStore>) -> Self {
        let mut controller =
            Self { store, videos: Vec::new(), selected: None, last_error: None };
        controller.reload();
        info!("Library loaded with {} video(s)", controller.videos.len());
        controller
    }

    /// Reloads the presentation list from the store, newest first.
    pub fn reload(&mut self) {
        match self.store.get_all() {
            Ok(mut videos) => {
                videos.sort_by(|a, b| {
                    b.uploaded_at.cmp(&a.uploaded_at).then_with(|| b.id.cmp(&a.id))
                });
                self.videos = videos;
                self.last_error = None;
            }
            Err(e) => {
                error!("Error loading stored videos: {}", e);
                self.last_error = Some("Failed to load videos from storage".to_string());
            }
        }
        if let Some(selected) = &self.selected {
            if !self.videos.iter().any(|v| &v.id == selected) {
                self.selected = None;
            }
        }
    }

    pub fn videos(&self) -> &[VideoRecord] {
        &self.videos
    }

    /// Saves an upload, capturing a thumbnail through the supplied
    /// capability at most once. A capture failure is tolerated: the save
    /// proceeds without a thumbnail.
    pub fn save_video<F>(
        &mut self,
        file: RawFile,
        remote_handle: Value,
        duration: Option<f64>,
        capture: Option<F>,
    ) -> SaveOutcome
    where
        F: FnOnce(&RawFile) -> Result<String, String>,
    {
        let thumbnail = capture.and_then(|grab| match grab(&file) {
            Ok(image) => Some(image),
            Err(e) => {
                warn!("Failed to generate thumbnail: {}", e);
                None
            }
        });
        let upload = VideoUpload::new(file, remote_handle)
            .with_thumbnail(thumbnail)
            .with_duration(duration);
        match self.store.save(upload) {
            Ok(id) => {
                self.reload();
                SaveOutcome::Saved(id)
            }
            Err(e) => {
                error!("Error saving video: {}", e);
                let reason = e.to_string();
                self.last_error = Some(reason.clone());
                // Evictions may already have happened; refresh the view.
                self.reload_keeping_error();
                SaveOutcome::Unsaved { reason }
            }
        }
    }

    pub fn delete_video(&mut self, id: &str) {
        if let Err(e) = self.store.delete(id) {
            error!("Error deleting video: {}", e);
            self.last_error = Some("Failed to delete video".to_string());
            return;
        }
        self.reload();
    }

    /// Appends one analysis entry to a stored video's history.
    pub fn record_analysis(&mut self, id: &str, entry: AnalysisResult) {
        if let Err(e) = self.store.append_analysis(id, entry) {
            error!("Error saving analysis result: {}", e);
            self.last_error = Some("Failed to save analysis result".to_string());
            return;
        }
        self.reload();
    }

    /// Marks a video as the active selection; returns it if present.
    pub fn select_video(&mut self, id: &str) -> Option<&VideoRecord> {
        if self.videos.iter().any(|v| v.id == id) {
            self.selected = Some(id.to_string());
        } else {
            self.selected = None;
        }
        self.selected_video()
    }

    pub fn selected_video(&self) -> Option<&VideoRecord> {
        let id = self.selected.as_deref()?;
        self.videos.iter().find(|v| v.id == id)
    }

    /// Decodes a cached record into a playable handle.
    pub fn playable(&self, id: &str) -> Result<PlayableHandle<'_>, StorageError> {
        let record =
            self.videos.iter().find(|v| v.id == id).ok_or(StorageError::NotFound)?;
        self.store.playable_handle(record)
    }

    pub fn clear(&mut self) {
        if let Err(e) = self.store.clear_all() {
            error!("Error clearing library: {}", e);
            self.last_error = Some("Failed to clear library".to_string());
            return;
        }
        self.reload();
    }

    pub fn storage_info(&self) -> Result<StorageInfo, StorageError> {
        self.store.storage_info()
    }

    pub fn budget(&self) -> CapacityBudget {
        self.store.budget()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    // Reload that keeps a failure message visible for the surface.
    fn reload_keeping_error(&mut self) {
        let kept = self.last_error.take();
        self.reload();
        if kept.is_some() {
            self.last_error = kept;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quota::capacity::CapacityBudget;
    use crate::storage::document_storage::DocumentStorage;
    use serde_json::json;
    use tempfile::TempDir;

    fn raw(name: &str, bytes: usize) -> RawFile {
        RawFile { name: name.into(), mime_type: "video/mp4".into(), bytes: vec![7u8; bytes] }
    }

    fn controller(dir: &TempDir, capacity: u64) -> LibraryController {
        let store = DocumentStorage::with_budget(
            dir.path(),
            CapacityBudget { capacity_bytes: capacity, max_records: 10 },
        )
        .unwrap();
        LibraryController::new(Box::new(store))
    }

    fn no_capture() -> Option<fn(&RawFile) -> Result<String, String>> {
        None
    }

    #[test]
    fn test_startup_loads_existing_records() {
        let dir = TempDir::new().unwrap();
        {
            let mut seed = controller(&dir, 10_000);
            seed.save_video(raw("a.mp4", 10), json!(null), None, no_capture());
            seed.save_video(raw("b.mp4", 10), json!(null), None, no_capture());
        }
        let fresh = controller(&dir, 10_000);
        assert_eq!(fresh.videos().len(), 2);
        assert!(fresh.last_error().is_none());
    }

    #[test]
    fn test_save_lists_newest_first() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        ctl.save_video(raw("old.mp4", 10), json!(null), None, no_capture());
        ctl.save_video(raw("new.mp4", 10), json!(null), None, no_capture());
        assert_eq!(ctl.videos()[0].name, "new.mp4");
        assert_eq!(ctl.videos()[1].name, "old.mp4");
    }

    #[test]
    fn test_thumbnail_capture_runs_once_and_sticks() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        let outcome = ctl.save_video(
            raw("clip.mp4", 10),
            json!(null),
            Some(3.5),
            Some(|_: &RawFile| Ok("data:image/jpeg;base64,AAAA".to_string())),
        );
        let id = match outcome {
            SaveOutcome::Saved(id) => id,
            other => panic!("expected Saved, got {:?}", other),
        };
        let record = ctl.videos().iter().find(|v| v.id == id).unwrap();
        assert_eq!(record.thumbnail.as_deref(), Some("data:image/jpeg;base64,AAAA"));
        assert_eq!(record.duration, Some(3.5));
    }

    #[test]
    fn test_failed_thumbnail_capture_does_not_fail_save() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        let outcome = ctl.save_video(
            raw("clip.mp4", 10),
            json!(null),
            None,
            Some(|_: &RawFile| Err("no frame ready".to_string())),
        );
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert!(ctl.videos()[0].thumbnail.is_none());
        assert!(ctl.last_error().is_none());
    }

    #[test]
    fn test_oversize_save_degrades_without_crashing() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 100);
        let outcome = ctl.save_video(raw("huge.mp4", 500), json!(null), None, no_capture());
        match outcome {
            SaveOutcome::Unsaved { reason } => assert!(reason.contains("too large")),
            other => panic!("expected Unsaved, got {:?}", other),
        }
        assert!(ctl.last_error().is_some());
        assert!(ctl.videos().is_empty());
        // The flow continues: a smaller file still saves.
        let outcome = ctl.save_video(raw("small.mp4", 50), json!(null), None, no_capture());
        assert!(matches!(outcome, SaveOutcome::Saved(_)));
        assert!(ctl.last_error().is_none());
    }

    #[test]
    fn test_delete_and_selection() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        let id = match ctl.save_video(raw("clip.mp4", 10), json!(null), None, no_capture()) {
            SaveOutcome::Saved(id) => id,
            other => panic!("expected Saved, got {:?}", other),
        };
        assert!(ctl.select_video(&id).is_some());
        ctl.delete_video(&id);
        assert!(ctl.videos().is_empty());
        assert!(ctl.selected_video().is_none());
    }

    #[test]
    fn test_record_analysis_roundtrip() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        let id = match ctl.save_video(raw("clip.mp4", 10), json!(null), None, no_capture()) {
            SaveOutcome::Saved(id) => id,
            other => panic!("expected Saved, got {:?}", other),
        };
        ctl.record_analysis(&id, AnalysisResult::success("Key moments", json!([1, 2])));
        let record = ctl.videos().iter().find(|v| v.id == id).unwrap();
        assert_eq!(record.analysis_history.len(), 1);
        assert!(ctl.last_error().is_none());
    }

    #[test]
    fn test_record_analysis_unknown_id_sets_error_state() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        ctl.record_analysis("ghost", AnalysisResult::failure("Chart", "n/a"));
        assert_eq!(ctl.last_error(), Some("Failed to save analysis result"));
    }

    #[test]
    fn test_playable_distinguishes_missing_from_corrupt() {
        let dir = TempDir::new().unwrap();
        let mut ctl = controller(&dir, 10_000);
        match ctl.playable("ghost") {
            Err(StorageError::NotFound) => {}
            other => panic!("expected NotFound, got {:?}", other),
        }
        let id = match ctl.save_video(raw("clip.mp4", 10), json!(null), None, no_capture()) {
            SaveOutcome::Saved(id) => id,
            other => panic!("expected Saved, got {:?}", other),
        };
        assert!(ctl.playable(&id).is_ok());
    }
}
