use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::config::ExportConfig;
use crate::error::{Result, VideoError};
use crate::timing::Rational;
use crate::video::backend::{ClipDecoder, FrameEncoder, MediaBackend};
use crate::video::encoder::FfmpegEncoder;
use crate::video::types::{ClipInfo, EncoderSettings, Frame, FrameSize};

/// Media backend that shells out to the ffmpeg command line tools
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_path: PathBuf,
    ffprobe_path: PathBuf,
}

impl FfmpegBackend {
    pub fn new(config: &ExportConfig) -> Self {
        Self {
            ffmpeg_path: config.ffmpeg_path.clone(),
            ffprobe_path: config.ffprobe_path.clone(),
        }
    }

    /// Check that both ffmpeg and ffprobe can be executed
    pub fn is_available(&self) -> bool {
        [&self.ffmpeg_path, &self.ffprobe_path].iter().all(|tool| {
            Command::new(tool)
                .arg("-version")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map(|status| status.success())
                .unwrap_or(false)
        })
    }

    /// Read clip metadata with ffprobe
    pub fn probe(&self, path: &Path) -> Result<ClipInfo> {
        let output = Command::new(&self.ffprobe_path)
            .args(["-v", "error", "-print_format", "json"])
            .args(["-show_streams", "-show_format", "-select_streams", "v:0"])
            .arg(path)
            .output()
            .map_err(|e| VideoError::OpenFailed {
                path: path.display().to_string(),
                reason: format!("ffprobe could not be started: {}", e),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VideoError::OpenFailed {
                path: path.display().to_string(),
                reason: stderr.trim().to_string(),
            }
            .into());
        }

        parse_probe_output(path, &output.stdout)
    }
}

impl MediaBackend for FfmpegBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn ClipDecoder>> {
        if !path.is_file() {
            return Err(VideoError::OpenFailed {
                path: path.display().to_string(),
                reason: "file does not exist".to_string(),
            }
            .into());
        }

        if !is_supported(path) {
            warn!("Unrecognised video extension for {:?}, probing anyway", path);
        }

        let info = self.probe(path)?;
        info!(
            "Opened {}: {} @ {:.2} fps, {:.2}s, {} frames",
            info.file_name(),
            info.size,
            info.fps.to_f64(),
            info.duration.to_f64(),
            info.frame_count
        );

        Ok(Box::new(FfmpegClip::new(self.ffmpeg_path.clone(), info)))
    }

    fn create_encoder(
        &self,
        path: &Path,
        settings: &EncoderSettings,
    ) -> Result<Box<dyn FrameEncoder>> {
        Ok(Box::new(FfmpegEncoder::spawn(&self.ffmpeg_path, path, settings)?))
    }

    fn name(&self) -> &str {
        "ffmpeg"
    }
}

/// Extensions the decoder is known to handle
pub fn is_supported<P: AsRef<Path>>(path: P) -> bool {
    matches!(
        path.as_ref().extension().and_then(|ext| ext.to_str()),
        Some(ext) if matches!(
            ext.to_lowercase().as_str(),
            "mp4" | "mov" | "m4v" | "mkv" | "avi" | "webm"
        )
    )
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    avg_frame_rate: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
    nb_frames: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

fn parse_probe_output(path: &Path, json: &[u8]) -> Result<ClipInfo> {
    let open_failed = |reason: String| VideoError::OpenFailed {
        path: path.display().to_string(),
        reason,
    };

    let probe: ProbeOutput = serde_json::from_slice(json)
        .map_err(|e| open_failed(format!("invalid ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref().unwrap_or("video") == "video")
        .ok_or_else(|| VideoError::NoVideoStream {
            path: path.display().to_string(),
        })?;

    let (width, height) = match (stream.width, stream.height) {
        (Some(w), Some(h)) if w > 0 && h > 0 => (w, h),
        _ => return Err(open_failed("video stream has no frame size".to_string()).into()),
    };

    let fps = [&stream.avg_frame_rate, &stream.r_frame_rate]
        .into_iter()
        .flatten()
        .filter_map(|rate| Rational::parse(rate))
        .find(|rate| !rate.is_zero() && !rate.is_negative())
        .ok_or_else(|| open_failed("video stream has no frame rate".to_string()))?;

    let duration = stream
        .duration
        .as_deref()
        .and_then(Rational::parse)
        .or_else(|| probe.format.as_ref()?.duration.as_deref().and_then(Rational::parse))
        .filter(|d| !d.is_zero() && !d.is_negative())
        .ok_or_else(|| open_failed("video stream has no duration".to_string()))?;

    let frame_count = stream
        .nb_frames
        .as_deref()
        .and_then(|n| n.parse::<u64>().ok())
        .filter(|&n| n > 0)
        .unwrap_or_else(|| duration.frames_at(fps).max(1) as u64);

    Ok(ClipInfo {
        path: path.to_path_buf(),
        size: FrameSize::new(width, height),
        duration,
        fps,
        frame_count,
    })
}

/// A clip decoded by a streaming ffmpeg child process
///
/// Frames are read forward from a rawvideo pipe. A request for an earlier
/// frame restarts the pipe at the seek point.
pub struct FfmpegClip {
    ffmpeg_path: PathBuf,
    info: ClipInfo,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    next_index: u64,
    last: Option<(u64, Frame)>,
}

impl FfmpegClip {
    fn new(ffmpeg_path: PathBuf, info: ClipInfo) -> Self {
        Self {
            ffmpeg_path,
            info,
            child: None,
            reader: None,
            next_index: 0,
            last: None,
        }
    }

    fn restart_at(&mut self, index: u64) -> Result<()> {
        self.stop();

        // Half a frame early so float rounding in -ss cannot skip the target frame
        let fps = self.info.fps;
        let seek = (Rational::frame_time(index as i64, fps) - Rational::new(1, 2) / fps)
            .max(Rational::zero());
        debug!(
            "Starting decoder for {} at frame {} ({:.3}s)",
            self.info.file_name(),
            index,
            seek.to_f64()
        );

        let mut cmd = Command::new(&self.ffmpeg_path);
        cmd.args(["-hide_banner", "-loglevel", "error", "-noautorotate"]);
        if index > 0 {
            cmd.args(["-ss", &format!("{:.6}", seek.to_f64())]);
        }
        cmd.arg("-i")
            .arg(&self.info.path)
            .args(["-map", "0:v:0", "-an", "-fps_mode", "passthrough"])
            .args(["-pix_fmt", "rgba", "-f", "rawvideo", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|e| VideoError::DecodingFailed {
            reason: format!("Failed to spawn FFmpeg process: {}", e),
        })?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::DecodingFailed {
            reason: "Failed to capture FFmpeg stdout".to_string(),
        })?;

        self.reader = Some(BufReader::with_capacity(self.info.size.rgba_len(), stdout));
        self.child = Some(child);
        self.next_index = index;
        Ok(())
    }

    fn read_next(&mut self) -> Result<Frame> {
        let size = self.info.size;
        let reader = self.reader.as_mut().ok_or_else(|| VideoError::DecodingFailed {
            reason: "decoder is not running".to_string(),
        })?;

        let mut data = vec![0u8; size.rgba_len()];
        match reader.read_exact(&mut data) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                return Err(VideoError::DecodingFailed {
                    reason: format!(
                        "{} ended at frame {} but declares {} frames",
                        self.info.file_name(),
                        self.next_index,
                        self.info.frame_count
                    ),
                }
                .into());
            }
            Err(e) => {
                return Err(VideoError::DecodingFailed {
                    reason: format!("Failed to read FFmpeg output: {}", e),
                }
                .into());
            }
        }

        let frame = Frame::from_rgba_bytes(size.width, size.height, data).ok_or_else(|| {
            VideoError::DecodingFailed {
                reason: "decoded frame has the wrong size".to_string(),
            }
        })?;
        self.next_index += 1;
        Ok(frame)
    }

    fn stop(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl ClipDecoder for FfmpegClip {
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

        let index = self.info.frame_index_at(t);

        if let Some((cached, frame)) = &self.last {
            if *cached == index {
                return Ok(frame.clone());
            }
        }

        if self.reader.is_none() || index < self.next_index {
            self.restart_at(index)?;
        }

        while self.next_index < index {
            self.read_next()?;
        }

        let frame = self.read_next()?;
        self.last = Some((index, frame.clone()));
        Ok(frame)
    }
}

impl Drop for FfmpegClip {
    fn drop(&mut self) {
        self.stop();
    }
}
