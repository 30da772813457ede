//! Decoder and encoder seams.
//!
//! The export driver only talks to these traits. The production
//! implementation shells out to ffmpeg (see [`FfmpegBackend`](super::FfmpegBackend));
//! other backends can be plugged in without touching the pipeline.

use std::path::Path;

use crate::error::Result;
use crate::timing::Rational;
use crate::video::types::{ClipInfo, EncoderSettings, Frame};

/// An opened source clip that yields decoded frames
///
/// Instances are not shared between threads; the export worker owns them and
/// calls into them sequentially. Dropping a decoder closes it.
pub trait ClipDecoder: Send {
    /// Metadata read when the clip was opened
    fn info(&self) -> &ClipInfo;

    /// Decode the frame whose presentation interval contains `t`
    ///
    /// When `t` falls between two frames the later one is returned. Seeking
    /// backwards is allowed.
    fn frame_at(&mut self, t: Rational) -> Result<Frame>;
}

/// A sink that encodes composited frames into an output file
pub trait FrameEncoder: Send {
    /// Push the next frame; frames arrive in ascending presentation order
    fn write_frame(&mut self, frame: &Frame) -> Result<()>;

    /// Flush and close the output, consuming the encoder
    fn finish(self: Box<Self>) -> Result<()>;

    /// Stop encoding without finalizing; the caller removes the partial file
    fn abort(self: Box<Self>);
}

/// Provider of decoders and encoders
pub trait MediaBackend: Send + Sync {
    /// Open a source clip
    fn open(&self, path: &Path) -> Result<Box<dyn ClipDecoder>>;

    /// Create an encoder writing to `path`
    fn create_encoder(
        &self,
        path: &Path,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn FrameEncoder>>;

    /// Backend name for logging
    fn name(&self) -> &str;
}
