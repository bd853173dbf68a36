use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::error;
use serde_json::Value;

use videotheque::configuration::config::Config;
use videotheque::configuration::types::BackendKind;
use videotheque::controller::library_controller::{
    LibraryController, SaveOutcome, ThumbnailCapture,
};
use videotheque::quota::capacity::format_bytes;
use videotheque::storage;
use videotheque::storage::types::{AnalysisResult, RawFile};

#[derive(Parser)]
#[command(name = "videotheque")]
#[command(version = "0.1.0")]
#[command(about = "A capacity-budgeted local video library")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Storage backend, overriding the configuration file
    #[arg(long, value_enum)]
    backend: Option<BackendKind>,

    /// Storage directory, overriding the configuration file
    #[arg(long, env = "VIDEOTHEQUE_STORAGE_DIR")]
    storage_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Save a video file into the library
    Add {
        path: PathBuf,
        /// Remote file handle as JSON, stored verbatim
        #[arg(long)]
        remote: Option<String>,
    },
    /// List stored videos
    List,
    /// Show one video, analysis history included
    Show { id: String },
    /// Delete a video
    Remove { id: String },
    /// Empty the library
    Clear,
    /// Storage usage and ceilings
    Info,
    /// Append an analysis entry to a video's history
    LogAnalysis {
        id: String,
        #[arg(long)]
        mode: String,
        /// Success payload as JSON (or a bare string)
        #[arg(long, conflicts_with = "error")]
        result: Option<String>,
        /// Failure description
        #[arg(long)]
        error: Option<String>,
    },
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .init();

    let args = Args::parse();
    if let Err(e) = run(args) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    if let Some(backend) = args.backend {
        config.backend = backend;
    }
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }

    let store = storage::open_store(&config)?;
    let mut controller = LibraryController::new(store);

    match args.command {
        Command::Add { path, remote } => {
            let bytes = fs::read(&path)?;
            let name = path
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("video")
                .to_string();
            let mime_type = mime_guess::from_path(&path)
                .first_or_octet_stream()
                .essence_str()
                .to_string();
            let remote_handle: Value = match remote {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Value::Null,
            };
            let file = RawFile { name, mime_type, bytes };
            match controller.save_video(file, remote_handle, None, None::<ThumbnailCapture>) {
                SaveOutcome::Saved(id) => println!("Saved {}", id),
                SaveOutcome::Unsaved { reason } => {
                    println!("Not saved: {}", reason);
                    std::process::exit(1);
                }
            }
        }
        Command::List => {
            for video in controller.videos() {
                println!(
                    "{}  {:>10}  {}  {}  ({} analyses)",
                    video.id,
                    format_bytes(video.size),
                    video.uploaded_at.format("%Y-%m-%d %H:%M:%S"),
                    video.name,
                    video.analysis_history.len()
                );
            }
        }
        Command::Show { id } => match controller.select_video(&id) {
            Some(video) => {
                println!("id:          {}", video.id);
                println!("name:        {}", video.name);
                println!("size:        {}", format_bytes(video.size));
                println!("uploaded_at: {}", video.uploaded_at.to_rfc3339());
                if let Some(duration) = video.duration {
                    println!("duration:    {:.1}s", duration);
                }
                println!("thumbnail:   {}", if video.thumbnail.is_some() { "yes" } else { "no" });
                println!("remote:      {}", video.remote_handle);
                for entry in &video.analysis_history {
                    let detail = if entry.success {
                        entry.result.as_ref().map(|v| v.to_string()).unwrap_or_default()
                    } else {
                        entry.error.clone().unwrap_or_default()
                    };
                    println!(
                        "  [{}] {} {}: {}",
                        entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
                        if entry.success { "ok" } else { "failed" },
                        entry.mode,
                        detail
                    );
                }
            }
            None => {
                println!("No video with id {}", id);
                std::process::exit(1);
            }
        },
        Command::Remove { id } => {
            controller.delete_video(&id);
        }
        Command::Clear => {
            controller.clear();
        }
        Command::Info => {
            let info = controller.storage_info()?;
            let budget = controller.budget();
            println!(
                "{} used of {} ({:.1}%), {} available",
                format_bytes(info.used),
                format_bytes(info.total),
                info.percentage,
                format_bytes(info.available)
            );
            println!(
                "{} of at most {} video(s) stored",
                controller.videos().len(),
                budget.max_records
            );
        }
        Command::LogAnalysis { id, mode, result, error } => {
            let entry = match (result, error) {
                (Some(raw), None) => {
                    let value =
                        serde_json::from_str(&raw).unwrap_or_else(|_| Value::String(raw));
                    AnalysisResult::success(mode, value)
                }
                (None, Some(message)) => AnalysisResult::failure(mode, message),
                _ => return Err("exactly one of --result / --error is required".into()),
            };
            controller.record_analysis(&id, entry);
        }
    }

    if let Some(message) = controller.last_error() {
        return Err(message.to_string().into());
    }
    Ok(())
}
