//! # Video Module
//!
//! Decoding source clips, encoding the merged output, and the frame type both
//! sides share.

pub mod backend;
pub mod encoder;
pub mod loader;
pub mod types;

pub use backend::{ClipDecoder, FrameEncoder, MediaBackend};
pub use encoder::FfmpegEncoder;
pub use loader::{is_supported, FfmpegBackend, FfmpegClip};
pub use types::{ClipInfo, EncoderSettings, Frame, FrameSize};
