pub mod library_controller;

pub use library_controller::{LibraryController, SaveOutcome, ThumbnailCapture};
