use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use name_card_merge::{
    composition::{resolve_output_path, CompositionEngine, ExportRequest, ExportSession, JobState},
    config::Config,
    library::{FolderLibrary, LibraryImporter},
    video::FfmpegBackend,
};

#[derive(Parser)]
#[command(
    name = "name-card-merge",
    version,
    about = "Merge two clips into one video with a name card overlay",
    long_about = "Name-Card-Merge plays the first clip, cuts to the second, and draws a \
                  centered name card over every frame. The output uses the second \
                  clip's resolution at 30 fps."
)]
struct Cli {
    /// First clip, played from the start
    #[arg(short, long)]
    first: PathBuf,

    /// Second clip, played after the cut; sets the output resolution
    #[arg(short, long)]
    second: PathBuf,

    /// Output file, or a directory to receive a timestamped file
    #[arg(short, long)]
    output: PathBuf,

    /// Configuration file (optional)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Copy the finished export into this library folder
    #[arg(long)]
    import_to: Option<PathBuf>,

    /// Person name shown at the top of the card
    #[arg(long)]
    person_name: Option<String>,

    /// First descriptor line
    #[arg(long)]
    part_one: Option<String>,

    /// Second descriptor line
    #[arg(long)]
    part_two: Option<String>,

    /// Workplace shown next to the "C H E Z" label
    #[arg(long)]
    work_place: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    info!("Starting Name-Card-Merge v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = match &cli.config {
        Some(config_path) => {
            info!("Loading configuration from {:?}", config_path);
            Config::from_file(config_path)?
        }
        None => {
            info!("Using default configuration");
            Config::default()
        }
    };

    let text = &mut config.overlay.text;
    if let Some(value) = cli.person_name {
        text.person_name = value;
    }
    if let Some(value) = cli.part_one {
        text.part_one = value;
    }
    if let Some(value) = cli.part_two {
        text.part_two = value;
    }
    if let Some(value) = cli.work_place {
        text.work_place = value;
    }

    let backend = FfmpegBackend::new(&config.export);
    if !backend.is_available() {
        warn!("ffmpeg/ffprobe not found; set export.ffmpeg_path and export.ffprobe_path");
    }

    let output = resolve_output_path(&cli.output, chrono::Local::now());
    let mut request = ExportRequest::new(&cli.first, &cli.second, &output);
    if let Some(dir) = cli.import_to.or_else(|| config.library.dir.clone()) {
        let library: Arc<dyn LibraryImporter> = Arc::new(FolderLibrary::new(dir));
        request = request.with_library(library);
    }

    let session = ExportSession::new(CompositionEngine::new(config), Arc::new(backend));
    let handle = session.start(request);

    // Ctrl-C cancels the running export
    let cancel = handle.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling export...");
            cancel.cancel();
        }
    });

    // Report status changes and progress every 10%
    let mut status = handle.status();
    tokio::spawn(async move {
        let mut last_message = String::new();
        let mut last_decile = 0;
        while status.changed().await.is_ok() {
            let current = status.borrow_and_update().clone();
            if current.message != last_message {
                info!("{}", current.message);
                last_message = current.message.clone();
            }
            let decile = (current.progress() * 10.0) as u32;
            if current.state == JobState::Running && decile > last_decile {
                info!(
                    "   {}% ({}/{} frames)",
                    decile * 10,
                    current.frames_rendered,
                    current.total_frames
                );
                last_decile = decile;
            }
        }
    });

    handle
        .on_complete(|result| match result {
            Ok(outcome) => {
                info!("Merged video saved to: {:?}", outcome.output);
                info!(
                    "   {} at 30 fps, {} frames, {:.2}s",
                    outcome.size,
                    outcome.frames,
                    outcome.duration.to_f64()
                );
                match outcome.import {
                    Some(Ok(path)) => info!("   Imported to: {:?}", path),
                    Some(Err(e)) => warn!("   Library import skipped: {}", e),
                    None => {}
                }
                Ok(())
            }
            Err(e) => Err(anyhow::anyhow!(e.user_message())),
        })
        .await
}
