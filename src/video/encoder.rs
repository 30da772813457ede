use std::collections::VecDeque;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, Command, Stdio};
use std::thread::JoinHandle;

use tracing::{debug, info, warn};

use crate::error::{Result, VideoError};
use crate::video::backend::FrameEncoder;
use crate::video::types::{EncoderSettings, Frame};

/// Encoder that pipes raw RGBA frames into an ffmpeg child process
///
/// The output is a QuickTime file with the moov atom written up front
/// (`+faststart`) and no audio track.
pub struct FfmpegEncoder {
    child: Child,
    stdin: Option<BufWriter<ChildStdin>>,
    stderr: Option<JoinHandle<Vec<String>>>,
    settings: EncoderSettings,
    frames_written: u64,
}

/// Lines of ffmpeg diagnostics kept for error messages
const STDERR_TAIL_LINES: usize = 5;

impl FfmpegEncoder {
    pub fn spawn(
        ffmpeg_path: &Path,
        output_path: &Path,
        settings: &EncoderSettings,
    ) -> Result<Self> {
        let args = encoder_args(output_path, settings);
        debug!("Spawning encoder: {} {}", ffmpeg_path.display(), args.join(" "));

        let mut child = Command::new(ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| VideoError::EncodingFailed {
                reason: format!("Failed to spawn FFmpeg process: {}", e),
            })?;

        let stdin = child.stdin.take().ok_or_else(|| VideoError::EncodingFailed {
            reason: "Failed to open FFmpeg stdin".to_string(),
        })?;

        // ffmpeg blocks once the stderr pipe fills, so it is drained as it runs
        let stderr = child
            .stderr
            .take()
            .map(|pipe| std::thread::spawn(move || tail_lines(pipe, STDERR_TAIL_LINES)));

        info!(
            "Encoder started: {} {} @ {} fps, preset {}, crf {}",
            settings.codec,
            settings.size,
            settings.fps,
            settings.preset,
            settings.crf()
        );

        Ok(Self {
            child,
            stdin: Some(BufWriter::with_capacity(settings.size.rgba_len(), stdin)),
            stderr,
            settings: settings.clone(),
            frames_written: 0,
        })
    }

    /// Collect the drained diagnostics; only valid once the child has exited
    fn stderr_tail(&mut self) -> String {
        self.stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default()
            .join("\n")
    }
}

/// Read `pipe` to the end, keeping only its last `keep` lines
fn tail_lines(pipe: impl Read, keep: usize) -> Vec<String> {
    let mut tail = VecDeque::with_capacity(keep);
    for line in BufReader::new(pipe).lines() {
        let Ok(line) = line else { break };
        if tail.len() == keep {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    tail.into()
}

impl FrameEncoder for FfmpegEncoder {
    fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        if frame.size() != self.settings.size {
            return Err(VideoError::EncodingFailed {
                reason: format!(
                    "frame is {} but the encoder expects {}",
                    frame.size(),
                    self.settings.size
                ),
            }
            .into());
        }

        let stdin = self.stdin.as_mut().ok_or_else(|| VideoError::EncodingFailed {
            reason: "encoder input is closed".to_string(),
        })?;

        stdin.write_all(frame.as_rgba_bytes()).map_err(|e| VideoError::EncodingFailed {
            reason: format!("FFmpeg rejected frame {}: {}", self.frames_written, e),
        })?;
        self.frames_written += 1;
        Ok(())
    }

    fn finish(mut self: Box<Self>) -> Result<()> {
        if let Some(mut stdin) = self.stdin.take() {
            stdin.flush().map_err(|e| VideoError::EncodingFailed {
                reason: format!("Failed to flush frames to FFmpeg: {}", e),
            })?;
        }

        let status = self.child.wait().map_err(|e| VideoError::EncodingFailed {
            reason: format!("FFmpeg execution failed: {}", e),
        })?;

        let stderr = self.stderr_tail();
        if !status.success() {
            return Err(VideoError::EncodingFailed {
                reason: format!("FFmpeg failed: {}", stderr),
            }
            .into());
        }

        info!("Encoder finished after {} frames", self.frames_written);
        Ok(())
    }

    fn abort(mut self: Box<Self>) {
        self.stdin = None;
        if let Err(e) = self.child.kill() {
            warn!("Failed to stop FFmpeg encoder: {}", e);
        }
        let _ = self.child.wait();
        let stderr = self.stderr_tail();
        debug!(
            "Encoder aborted after {} frames {}",
            self.frames_written, stderr
        );
    }
}

/// Build the ffmpeg argument list for a raw RGBA pipe into a QuickTime file
pub fn encoder_args(output_path: &Path, settings: &EncoderSettings) -> Vec<String> {
    let mut args: Vec<String> = [
        "-hide_banner",
        "-loglevel",
        "error",
        "-y",
        "-f",
        "rawvideo",
        "-pix_fmt",
        "rgba",
        "-s:v",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    args.push(settings.size.to_string());
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    args.extend(["-i".to_string(), "-".to_string(), "-an".to_string()]);
    args.extend(["-c:v".to_string(), settings.codec.clone()]);
    args.extend(["-preset".to_string(), settings.preset.clone()]);
    args.extend(["-crf".to_string(), settings.crf().to_string()]);
    args.extend(["-pix_fmt".to_string(), "yuv420p".to_string()]);
    args.extend(["-r".to_string(), settings.fps.to_string()]);
    args.extend(["-movflags".to_string(), "+faststart".to_string()]);
    args.extend(["-f".to_string(), "mov".to_string()]);
    args.push(output_path.display().to_string());
    args
}
