use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// File extension (without the dot) that marks a chapter file.
pub const CHAPTER_EXTENSION: &str = "pdf";

/// Kind of a directory-listing entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FileKind {
    File,
    Directory,
}

/// One record of a directory listing.
///
/// Produced fresh on every read and never persisted. `path` is unique
/// within a single listing.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct FileEntry {
    pub name: String,
    pub path: PathBuf,
    pub size: u64,
    pub kind: FileKind,
    pub modified_at: Option<SystemTime>,
}

impl FileEntry {
    pub fn file<P: Into<PathBuf>>(path: P, size: u64) -> Self {
        Self::with_kind(path.into(), size, FileKind::File)
    }

    pub fn directory<P: Into<PathBuf>>(path: P) -> Self {
        Self::with_kind(path.into(), 0, FileKind::Directory)
    }

    fn with_kind(path: PathBuf, size: u64, kind: FileKind) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.to_string_lossy().into_owned());
        Self {
            name,
            path,
            size,
            kind,
            modified_at: None,
        }
    }

    pub fn with_modified(mut self, modified_at: Option<SystemTime>) -> Self {
        self.modified_at = modified_at;
        self
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }

    /// True for regular files whose name ends in `.pdf`, any case.
    pub fn is_chapter(&self) -> bool {
        self.is_file() && has_chapter_extension(&self.name)
    }

    /// File name with a trailing `.pdf` removed, for display.
    pub fn display_name(&self) -> &str {
        chapter_display_name(&self.name)
    }
}

/// Case-insensitive `.pdf` suffix check on a bare file name.
pub fn has_chapter_extension(name: &str) -> bool {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CHAPTER_EXTENSION))
}

/// Strips the chapter extension from a file name if present.
pub fn chapter_display_name(name: &str) -> &str {
    if has_chapter_extension(name) {
        &name[..name.len() - CHAPTER_EXTENSION.len() - 1]
    } else {
        name
    }
}

/// Formats a byte count as `B`/`KB`/`MB`/`GB` with one decimal.
///
/// Zero bytes render as an empty string so list rows can omit the size.
pub fn format_file_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    if bytes == 0 {
        return String::new();
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{value:.1} {}", UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chapter_extension_is_case_insensitive() {
        assert!(has_chapter_extension("Chapter 1.pdf"));
        assert!(has_chapter_extension("Chapter 1.PDF"));
        assert!(!has_chapter_extension("cover.jpg"));
        assert!(!has_chapter_extension("pdf"));
    }

    #[test]
    fn directories_are_never_chapters() {
        let dir = FileEntry::directory("/lib/odd.pdf");
        assert!(!dir.is_chapter());
        assert!(FileEntry::file("/lib/c1.pdf", 10).is_chapter());
    }

    #[test]
    fn display_name_strips_extension() {
        let entry = FileEntry::file("/lib/Chapter 12.PDF", 1);
        assert_eq!(entry.display_name(), "Chapter 12");
        assert_eq!(chapter_display_name("notes.txt"), "notes.txt");
    }

    #[test]
    fn file_sizes_render_with_units() {
        assert_eq!(format_file_size(0), "");
        assert_eq!(format_file_size(512), "512.0 B");
        assert_eq!(format_file_size(1536), "1.5 KB");
        assert_eq!(format_file_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_file_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }
}
