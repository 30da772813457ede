use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, Result},
    overlay::TextParts,
};

/// Main configuration for name-card-merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Overlay text and appearance
    pub overlay: OverlayConfig,

    /// Encoder and tool settings
    pub export: ExportConfig,

    /// Where finished exports are imported
    pub library: LibraryConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.display().to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|_| ConfigError::ParseFailed {
            path: path.display().to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| ConfigError::InvalidValue {
            key: "config".to_string(),
            value: e.to_string(),
        })?;

        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.overlay.validate()?;
        self.export.validate()?;
        Ok(())
    }
}

/// Overlay configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayConfig {
    /// The four text lines of the name card
    pub text: TextParts,

    /// RGBA text color
    pub color: [u8; 4],

    /// Font file; when unset a system sans-serif font is searched for
    pub font_path: Option<PathBuf>,
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            text: TextParts::default(),
            color: [255, 255, 0, 255],
            font_path: None,
        }
    }
}

impl OverlayConfig {
    fn validate(&self) -> Result<()> {
        if self.color[3] == 0 {
            return Err(ConfigError::InvalidValue {
                key: "overlay.color".to_string(),
                value: format!("{:?}", self.color),
            }
            .into());
        }

        if let Some(font_path) = &self.font_path {
            if font_path.as_os_str().is_empty() {
                return Err(ConfigError::InvalidValue {
                    key: "overlay.font_path".to_string(),
                    value: String::new(),
                }
                .into());
            }
        }

        Ok(())
    }
}

/// Export configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// ffmpeg executable
    pub ffmpeg_path: PathBuf,

    /// ffprobe executable
    pub ffprobe_path: PathBuf,

    /// Video codec to use for output
    pub codec: String,

    /// Encoder preset
    pub preset: String,

    /// Quality setting (0-100, higher is better)
    pub quality: u8,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            codec: "libx264".to_string(),
            preset: "veryslow".to_string(),
            quality: 90,
        }
    }
}

impl ExportConfig {
    fn validate(&self) -> Result<()> {
        if self.quality > 100 {
            return Err(ConfigError::InvalidValue {
                key: "export.quality".to_string(),
                value: self.quality.to_string(),
            }
            .into());
        }

        if self.codec.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                key: "export.codec".to_string(),
                value: self.codec.clone(),
            }
            .into());
        }

        Ok(())
    }
}

/// Library import configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LibraryConfig {
    /// Folder that finished exports are copied into
    pub dir: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.overlay.text.person_name, "MATHILDE");
        assert_eq!(config.overlay.color, [255, 255, 0, 255]);
    }

    #[test]
    fn test_config_roundtrip() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("test_config.toml");

        let mut original = Config::default();
        original.overlay.text.work_place = "ACME".to_string();
        original.library.dir = Some(dir.path().join("library"));

        original.save_to_file(&file_path).unwrap();
        let loaded = Config::from_file(&file_path).unwrap();

        assert_eq!(original, loaded);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("partial.toml");
        std::fs::write(
            &file_path,
            "[overlay.text]\nperson_name = \"ALEX\"\n\n[export]\nquality = 75\n",
        )
        .unwrap();

        let config = Config::from_file(&file_path).unwrap();
        assert_eq!(config.overlay.text.person_name, "ALEX");
        assert_eq!(config.overlay.text.part_one, "UX / UI");
        assert_eq!(config.export.quality, 75);
        assert_eq!(config.export.codec, "libx264");
    }

    #[test]
    fn test_invalid_quality() {
        let mut config = Config::default();
        config.export.quality = 101;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_transparent_text_color_rejected() {
        let mut config = Config::default();
        config.overlay.color = [255, 255, 0, 0];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file() {
        let result = Config::from_file("/no/such/config.toml");
        assert!(matches!(
            result,
            Err(crate::MergeError::Config(ConfigError::FileNotFound { .. }))
        ));
    }
}
