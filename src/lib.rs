//! # Name-Card-Merge
//!
//! Merge two video clips into one and stamp a name card over the whole result.
//!
//! The first clip plays, then a hard cut switches to the second one. The output
//! takes the second clip's resolution, runs at a constant 30 fps, and carries a
//! text overlay (person name, two descriptor lines and a workplace) centered
//! in every frame.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use name_card_merge::{
//!     composition::{CompositionEngine, ExportRequest, ExportSession},
//!     config::Config,
//!     video::FfmpegBackend,
//! };
//!
//! # #[tokio::main]
//! # async fn main() -> anyhow::Result<()> {
//! let config = Config::default();
//! let backend = Arc::new(FfmpegBackend::new(&config.export));
//! let session = ExportSession::new(CompositionEngine::new(config), backend);
//!
//! let handle = session.start(ExportRequest::new("first.mp4", "second.mov", "merged.mov"));
//! let outcome = handle.wait().await?;
//! println!("{} frames written to {:?}", outcome.frames, outcome.output);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`timing`] - Exact rational time
//! - [`video`] - Decoder and encoder seams, ffmpeg implementation
//! - [`overlay`] - Name card layout and rasterization
//! - [`composition`] - Timeline, frame compositor and export jobs
//! - [`library`] - Copying finished exports into a library folder
//! - [`config`] - Configuration management
//!
//! ## Plugging in another backend
//!
//! The export driver only talks to the [`MediaBackend`](video::MediaBackend)
//! trait, so any decoder/encoder pair can be used:
//!
//! ```rust,no_run
//! use std::path::Path;
//! use name_card_merge::video::{ClipDecoder, EncoderSettings, FrameEncoder, MediaBackend};
//! use name_card_merge::Result;
//!
//! struct MyBackend;
//!
//! impl MediaBackend for MyBackend {
//!     fn open(&self, path: &Path) -> Result<Box<dyn ClipDecoder>> {
//!         todo!("open {:?}", path)
//!     }
//!
//!     fn create_encoder(
//!         &self,
//!         path: &Path,
//!         settings: &EncoderSettings,
//!     ) -> Result<Box<dyn FrameEncoder>> {
//!         todo!("encode {:?} at {}", path, settings.size)
//!     }
//!
//!     fn name(&self) -> &str {
//!         "my-backend"
//!     }
//! }
//! ```

pub mod composition;
pub mod config;
pub mod error;
pub mod library;
pub mod overlay;
pub mod timing;
pub mod video;

// Re-export commonly used types for convenience
pub use crate::{
    composition::{CompositionEngine, ExportRequest, ExportSession},
    config::Config,
    error::{MergeError, Result},
    overlay::TextParts,
    timing::{Rational, OUTPUT_FPS},
};
