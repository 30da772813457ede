//! # Composition
//!
//! Turns two source clips into one merged video: the timeline places the
//! clips end to end, the compositor draws each output frame, and the engine
//! drives the whole export on a worker thread.

pub mod compositor;
pub mod engine;
pub mod job;
pub mod timeline;

// Re-exports for convenience
pub use compositor::{blend_overlay, FrameCompositor};
pub use engine::CompositionEngine;
pub use job::{
    export_blocking, output_file_name, resolve_output_path, CancelToken, ExportHandle,
    ExportOutcome, ExportRequest, ExportResult, ExportSession, JobState, JobStatus, StatusSender,
};
pub use timeline::{Segment, Timeline};
