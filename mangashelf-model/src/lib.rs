//! Core data model definitions shared across mangashelf crates.
#![allow(missing_docs)]

pub mod error;
pub mod files;
pub mod manga;
pub mod progress;
pub mod settings;

// Intentionally curated re-exports for downstream consumers.
pub use error::{ModelError, Result as ModelResult};
pub use files::{
    CHAPTER_EXTENSION, FileEntry, FileKind, chapter_display_name,
    format_file_size, has_chapter_extension,
};
pub use manga::{
    COVER_FILE, ChapterRef, METADATA_FILE, MangaEntry, MangaMetadata,
    MangaStatus,
};
pub use progress::{HistoryLedger, MangaReadingHistory, ReadingProgress};
pub use settings::{ANDROID_MEDIA_ROOT, ViewerSettings, ViewerSettingsPatch};
