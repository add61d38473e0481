//! Platform locations: where state is stored and where libraries live.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use directories::{ProjectDirs, UserDirs};
use mangashelf_model::{ANDROID_MEDIA_ROOT, ViewerSettings};

use crate::error::{Result, ShelfError};

/// Environment variable overriding the state directory.
pub const DATA_DIR_ENV: &str = "MANGASHELF_DATA_DIR";

/// Folder created under the documents directory on desktop platforms.
pub const LIBRARY_FOLDER_NAME: &str = "TruyenPDF";

const ANDROID_STORAGE_ROOT: &str = "/storage/emulated/0";

/// Resolved on-disk locations for persisted state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    data_dir: PathBuf,
}

impl AppPaths {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Resolves the data directory: explicit override, then
    /// [`DATA_DIR_ENV`], then the platform's per-user data directory.
    pub fn resolve(data_dir: Option<PathBuf>) -> Result<Self> {
        Self::resolve_with(data_dir, std::env::var_os(DATA_DIR_ENV))
    }

    fn resolve_with(
        data_dir: Option<PathBuf>,
        env: Option<OsString>,
    ) -> Result<Self> {
        if let Some(dir) = data_dir {
            return Ok(Self::new(dir));
        }
        if let Some(dir) = env.filter(|v| !v.is_empty()) {
            return Ok(Self::new(dir));
        }
        let dirs = ProjectDirs::from("", "", "mangashelf").ok_or_else(|| {
            ShelfError::Storage(
                "Unable to determine data directory".to_string(),
            )
        })?;
        Ok(Self::new(dirs.data_dir()))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Directory holding the key-value records.
    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }
}

/// Library folder used until the user picks one.
pub fn default_library_folder() -> PathBuf {
    if cfg!(target_os = "android") {
        return PathBuf::from(ANDROID_MEDIA_ROOT);
    }
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LIBRARY_FOLDER_NAME)
}

/// Highest folder the picker may navigate to.
pub fn storage_root() -> PathBuf {
    if cfg!(target_os = "android") {
        PathBuf::from(ANDROID_STORAGE_ROOT)
    } else {
        PathBuf::from("/")
    }
}

/// Built-in settings for this platform.
pub fn platform_defaults() -> ViewerSettings {
    ViewerSettings::with_library_folder(default_library_folder())
}
