//! Importing finished exports into a media library.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::ImportError;

/// Destination for finished exports
pub trait LibraryImporter: Send + Sync {
    /// Copy `file` into the library and return where it landed
    fn import(&self, file: &Path) -> std::result::Result<PathBuf, ImportError>;

    /// Where the library lives, for logging
    fn location(&self) -> &Path;
}

/// A plain folder used as the library
#[derive(Debug, Clone)]
pub struct FolderLibrary {
    dir: PathBuf,
}

impl FolderLibrary {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn ensure_dir(&self) -> std::result::Result<(), ImportError> {
        std::fs::create_dir_all(&self.dir).map_err(|_| ImportError::PermissionDenied {
            path: self.dir.clone(),
        })
    }
}

impl LibraryImporter for FolderLibrary {
    fn import(&self, file: &Path) -> std::result::Result<PathBuf, ImportError> {
        self.ensure_dir()?;

        let name = file.file_name().ok_or_else(|| ImportError::CopyFailed {
            from: file.to_path_buf(),
            reason: "not a file path".to_string(),
        })?;
        let target = self.dir.join(name);
        debug!("Importing {:?} into {:?}", file, self.dir);

        match std::fs::copy(file, &target) {
            Ok(bytes) => {
                info!("📚 Imported into library: {:?} ({} bytes)", target, bytes);
                Ok(target)
            }
            Err(e) if e.kind() == ErrorKind::PermissionDenied => Err(ImportError::PermissionDenied {
                path: self.dir.clone(),
            }),
            Err(e) => Err(ImportError::CopyFailed {
                from: file.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    fn location(&self) -> &Path {
        &self.dir
    }
}
