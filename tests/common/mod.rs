//! In-process media backend for integration tests.
//!
//! A "clip" is a small JSON descriptor file. Its frames are solid colors:
//! red carries the clip tag, green and blue carry the source frame index, so a
//! test can tell from any pixel outside the overlay which clip and which source
//! frame an output frame came from.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use name_card_merge::{
    composition::{CancelToken, CompositionEngine},
    config::Config,
    error::VideoError,
    overlay::{load_font, OverlayRasterizer},
    video::{ClipDecoder, ClipInfo, EncoderSettings, Frame, FrameEncoder, FrameSize, MediaBackend},
    MergeError, Rational, Result,
};

/// Red channel of frames from the first and second clip
pub const TAGS: [u8; 2] = [50, 200];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipDescriptor {
    pub width: u32,
    pub height: u32,
    pub duration: String,
    pub fps: String,
    pub tag: u8,

    /// Frames at or after this time fail to decode
    #[serde(default)]
    pub decodable: Option<String>,
}

impl ClipDescriptor {
    pub fn new(width: u32, height: u32, duration: &str, tag: u8) -> Self {
        Self {
            width,
            height,
            duration: duration.to_string(),
            fps: "30".to_string(),
            tag,
            decodable: None,
        }
    }

    pub fn truncated_at(mut self, seconds: &str) -> Self {
        self.decodable = Some(seconds.to_string());
        self
    }

    pub fn write(&self, path: &Path) {
        std::fs::write(path, serde_json::to_string(self).unwrap()).unwrap();
    }
}

/// Summary of one encoded frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameRecord {
    pub size: FrameSize,
    pub corner: [u8; 4],
}

impl FrameRecord {
    pub fn tag(&self) -> u8 {
        self.corner[0]
    }

    pub fn source_index(&self) -> u32 {
        self.corner[1] as u32 + self.corner[2] as u32 * 256
    }
}

#[derive(Debug, Default)]
pub struct Recording {
    pub settings: Option<EncoderSettings>,
    pub frames: Vec<FrameRecord>,
    pub kept: Vec<Frame>,
    pub finished: bool,
    pub aborted: bool,
}

#[derive(Clone, Default)]
pub struct SyntheticBackend {
    pub recording: Arc<Mutex<Recording>>,

    /// Keep full copies of every encoded frame
    pub keep_frames: bool,

    /// Trip this token once the given number of frames has been written
    pub cancel_after: Option<(usize, CancelToken)>,
}

impl SyntheticBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keeping_frames(mut self) -> Self {
        self.keep_frames = true;
        self
    }

    pub fn cancelling_after(mut self, frames: usize, token: CancelToken) -> Self {
        self.cancel_after = Some((frames, token));
        self
    }

    pub fn frames(&self) -> Vec<FrameRecord> {
        self.recording.lock().unwrap().frames.clone()
    }

    pub fn kept_frames(&self) -> Vec<Frame> {
        self.recording.lock().unwrap().kept.clone()
    }

    pub fn finished(&self) -> bool {
        self.recording.lock().unwrap().finished
    }

    pub fn aborted(&self) -> bool {
        self.recording.lock().unwrap().aborted
    }
}

impl MediaBackend for SyntheticBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ClipDecoder>> {
        let text = std::fs::read_to_string(path)?;
        let descriptor: ClipDescriptor =
            serde_json::from_str(&text).map_err(|e| VideoError::OpenFailed {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        let parse = |value: &str| {
            Rational::parse(value)
                .ok_or_else(|| MergeError::generic(format!("bad rational {}", value)))
        };
        let duration = parse(&descriptor.duration)?;
        let fps = parse(&descriptor.fps)?;
        let decodable = match &descriptor.decodable {
            Some(value) => Some(parse(value)?),
            None => None,
        };

        Ok(Box::new(SyntheticClip {
            info: ClipInfo {
                path: path.to_path_buf(),
                size: FrameSize::new(descriptor.width, descriptor.height),
                duration,
                fps,
                frame_count: duration.frames_at(fps) as u64,
            },
            tag: descriptor.tag,
            decodable,
        }))
    }

    fn create_encoder(
        &self,
        path: &Path,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn FrameEncoder>> {
        std::fs::write(path, b"")?;
        self.recording.lock().unwrap().settings = Some(settings.clone());
        Ok(Box::new(RecordingEncoder {
            path: path.to_path_buf(),
            backend: self.clone(),
        }))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

struct SyntheticClip {
    info: ClipInfo,
    tag: u8,
    decodable: Option<Rational>,
}

impl ClipDecoder for SyntheticClip {
    fn info(&self) -> &ClipInfo {
        &self.info
    }

    fn frame_at(&mut self, t: Rational) -> Result<Frame> {
        if t.is_negative() || t > self.info.duration {
            return Err(VideoError::TimeOutOfRange {
                time: t.to_string(),
                duration: self.info.duration.to_string(),
            }
            .into());
        }
        if let Some(limit) = self.decodable {
            if t >= limit {
                return Err(VideoError::DecodingFailed {
                    reason: format!("truncated stream at {}s", limit),
                }
                .into());
            }
        }

        let index = self.info.frame_index_at(t);
        Ok(Frame::new_filled(
            self.info.size.width,
            self.info.size.height,
            [self.tag, (index % 256) as u8, (index / 256) as u8, 255],
        ))
    }
}

struct RecordingEncoder {
    path: PathBuf,
    backend: SyntheticBackend,
}

impl FrameEncoder for RecordingEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        let written = {
            let mut recording = self.backend.recording.lock().unwrap();
            recording.frames.push(FrameRecord {
                size: frame.size(),
                corner: frame.get_pixel(0, 0),
            });
            if self.backend.keep_frames {
                recording.kept.push(frame.clone());
            }
            recording.frames.len()
        };

        use std::io::Write;
        let mut file = std::fs::OpenOptions::new().append(true).open(&self.path)?;
        writeln!(file, "frame {}", written)?;

        if let Some((after, token)) = &self.backend.cancel_after {
            if written >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn finish(self: Box<Self>) -> Result<()> {
        self.backend.recording.lock().unwrap().finished = true;
        Ok(())
    }

    fn abort(self: Box<Self>) {
        self.backend.recording.lock().unwrap().aborted = true;
    }
}

/// An overlay rasterizer on the system font, if one is installed
pub fn system_rasterizer() -> Option<OverlayRasterizer> {
    let font = load_font(None).ok()?;
    Some(OverlayRasterizer::new(font, [255, 255, 0, 255]))
}

/// An engine with the system font, if one is installed
pub fn engine() -> Option<CompositionEngine> {
    Some(CompositionEngine::new(Config::default()).with_rasterizer(system_rasterizer()?))
}

/// Write two clip descriptors into `dir` and return their paths
pub fn write_clips(
    dir: &Path,
    first: ClipDescriptor,
    second: ClipDescriptor,
) -> (PathBuf, PathBuf) {
    let first_path = dir.join("first.clip");
    let second_path = dir.join("second.clip");
    first.write(&first_path);
    second.write(&second_path);
    (first_path, second_path)
}
