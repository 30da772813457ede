use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the name-card-merge library
#[derive(Error, Debug)]
pub enum MergeError {
    #[error("Video processing error: {0}")]
    Video(#[from] VideoError),

    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Overlay error: {0}")]
    Overlay(#[from] OverlayError),

    #[error("Export failed: {0}")]
    Export(#[from] ExportError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Library import error: {0}")]
    Import(#[from] ImportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic error: {0}")]
    Generic(String),
}

/// Which of the two source clips an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputSlot {
    First,
    Second,
}

impl InputSlot {
    /// Zero-based clip index on the timeline
    pub fn index(self) -> usize {
        match self {
            Self::First => 0,
            Self::Second => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::First
        } else {
            Self::Second
        }
    }
}

impl std::fmt::Display for InputSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Second => write!(f, "second"),
        }
    }
}

/// Decoder and encoder errors
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("Failed to open video file: {path} ({reason})")]
    OpenFailed { path: String, reason: String },

    #[error("No video stream in file: {path}")]
    NoVideoStream { path: String },

    #[error("Video decoding failed: {reason}")]
    DecodingFailed { reason: String },

    #[error("Requested time {time}s is outside the clip (duration {duration}s)")]
    TimeOutOfRange { time: String, duration: String },

    #[error("Video encoding failed: {reason}")]
    EncodingFailed { reason: String },

    #[error("Frame processing failed: {reason}")]
    FrameProcessingFailed { reason: String },
}

/// Timeline construction and lookup errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Output time {time}s is outside the timeline [0, {total}s)")]
    OutOfRange { time: String, total: String },

    #[error("Clip {index} has no duration")]
    EmptySegment { index: usize },

    #[error("Timeline has no segments")]
    Empty,

    #[error("Clip {index} cannot be placed: time arithmetic overflows")]
    Overflow { index: usize },
}

/// Overlay layout and rasterization errors
#[derive(Error, Debug)]
pub enum OverlayError {
    #[error("No usable font found (searched: {searched})")]
    FontNotFound { searched: String },

    #[error("Failed to parse font {path}: {reason}")]
    FontInvalid { path: String, reason: String },

    #[error("Invalid frame size {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },
}

/// Reasons an export job ends in `Failed`
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("The {which} input is missing")]
    InputMissing { which: InputSlot },

    #[error("Output location is not writable: {path}")]
    OutputNotWritable { path: String },

    #[error("Failed to load {which} track: {reason}")]
    OpenFailed { which: InputSlot, reason: String },

    #[error("Decoding failed at output frame {frame_index}: {reason}")]
    DecodeFailed { frame_index: u64, reason: String },

    #[error("Encoding failed: {reason}")]
    EncodeFailed { reason: String },

    #[error("Export was cancelled")]
    Cancelled,
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to parse configuration file: {path}")]
    ParseFailed { path: String },

    #[error("Invalid configuration value: {key} = {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found: {path}")]
    FileNotFound { path: String },
}

/// Errors from the photo-library import step
#[derive(Error, Debug)]
pub enum ImportError {
    #[error("Permission denied for library at {path}")]
    PermissionDenied { path: PathBuf },

    #[error("Failed to copy {from} into the library: {reason}")]
    CopyFailed { from: PathBuf, reason: String },
}

/// Convenience type alias for Results using MergeError
pub type Result<T> = std::result::Result<T, MergeError>;

impl MergeError {
    /// Create a generic error with a custom message
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// Check if this error is recoverable (can be retried)
    ///
    /// The export core never retries on its own; callers may.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Io(_) => true,
            Self::Video(VideoError::DecodingFailed { .. }) => true,
            Self::Export(ExportError::DecodeFailed { .. }) => true,
            Self::Import(ImportError::CopyFailed { .. }) => true,
            _ => false,
        }
    }

    /// Get a user-friendly error message
    pub fn user_message(&self) -> String {
        match self {
            Self::Export(ExportError::OpenFailed { which, .. }) => {
                format!("Failed to load {} track", which)
            }
            Self::Export(ExportError::InputMissing { which }) => {
                format!("The {} video could not be found.", which)
            }
            Self::Export(ExportError::Cancelled) => "Export cancelled".to_string(),
            Self::Overlay(OverlayError::FontNotFound { .. }) => {
                "No font available for the overlay. Set overlay.font_path in the configuration."
                    .to_string()
            }
            Self::Config(ConfigError::FileNotFound { path }) => {
                format!("Configuration file '{}' not found.", path)
            }
            _ => self.to_string(),
        }
    }

    /// The export failure reason, if this error ended an export job
    pub fn export_reason(&self) -> Option<&ExportError> {
        match self {
            Self::Export(reason) => Some(reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_failure_names_the_track() {
        let err: MergeError = ExportError::OpenFailed {
            which: InputSlot::First,
            reason: "no video stream".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "Failed to load first track");

        let err: MergeError = ExportError::OpenFailed {
            which: InputSlot::Second,
            reason: "missing".to_string(),
        }
        .into();
        assert_eq!(err.user_message(), "Failed to load second track");
    }

    #[test]
    fn test_recoverable_classification() {
        let decode: MergeError = ExportError::DecodeFailed {
            frame_index: 3,
            reason: "corrupt packet".to_string(),
        }
        .into();
        assert!(decode.is_recoverable());

        let cancelled: MergeError = ExportError::Cancelled.into();
        assert!(!cancelled.is_recoverable());
        assert!(matches!(cancelled.export_reason(), Some(ExportError::Cancelled)));
    }

    #[test]
    fn test_input_slot_index_roundtrip() {
        assert_eq!(InputSlot::from_index(InputSlot::First.index()), InputSlot::First);
        assert_eq!(InputSlot::from_index(InputSlot::Second.index()), InputSlot::Second);
    }
}
