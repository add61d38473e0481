use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::{ModelError, Result};

/// Metadata sidecar every manga folder must contain.
pub const METADATA_FILE: &str = "data.json";
/// Cover image every manga folder must contain.
pub const COVER_FILE: &str = "main.jpg";

/// Publication status as recorded by the downloader.
///
/// Unknown strings are preserved verbatim so they survive a round trip.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum MangaStatus {
    Completed,
    #[default]
    Ongoing,
    Other(String),
}

impl MangaStatus {
    pub fn as_str(&self) -> &str {
        match self {
            MangaStatus::Completed => "completed",
            MangaStatus::Ongoing => "ongoing",
            MangaStatus::Other(raw) => raw,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, MangaStatus::Completed)
    }
}

impl From<&str> for MangaStatus {
    fn from(raw: &str) -> Self {
        match raw {
            "completed" => MangaStatus::Completed,
            "ongoing" => MangaStatus::Ongoing,
            other => MangaStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for MangaStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for MangaStatus {
    fn serialize<S>(
        &self,
        serializer: S,
    ) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for MangaStatus {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(MangaStatus::from(raw.as_str()))
    }
}

/// Chapter reference listed in the sidecar. Informational only: chapter
/// files are resolved from the folder listing, never from these links.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChapterRef {
    pub title: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub link: String,
}

/// Parsed `data.json` sidecar.
///
/// `download_complete_count <= total_chapter_count` is expected but not
/// enforced; the downloader's numbers are taken as-is.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MangaMetadata {
    pub title: String,
    #[cfg_attr(feature = "serde", serde(rename = "url", default))]
    pub source_url: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub chapters: Vec<ChapterRef>,
    #[cfg_attr(feature = "serde", serde(rename = "total", default))]
    pub total_chapter_count: u32,
    #[cfg_attr(
        feature = "serde",
        serde(rename = "downloadComplete", default)
    )]
    pub download_complete_count: u32,
    #[cfg_attr(feature = "serde", serde(default))]
    pub status: MangaStatus,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "isDownload",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub is_download: Option<bool>,
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "mainPhoto",
            default,
            skip_serializing_if = "Option::is_none"
        )
    )]
    pub main_photo: Option<String>,
}

impl MangaMetadata {
    /// Rejects records that cannot be displayed at all.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(ModelError::InvalidMetadata(
                "title is empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// A manga folder that passed the sidecar probe.
///
/// `path` is the identity key: stable across scans as long as the folder
/// is not moved or renamed.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MangaEntry {
    pub name: String,
    pub path: PathBuf,
    pub title: String,
    pub cover_path: PathBuf,
    pub metadata: MangaMetadata,
}

impl MangaEntry {
    pub fn new(folder: &Path, metadata: MangaMetadata) -> Self {
        let name = folder
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            path: folder.to_path_buf(),
            title: metadata.title.clone(),
            cover_path: folder.join(COVER_FILE),
            metadata,
        }
    }

    pub fn metadata_path(&self) -> PathBuf {
        self.path.join(METADATA_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_keeps_unknown_values() {
        assert_eq!(MangaStatus::from("completed"), MangaStatus::Completed);
        assert_eq!(MangaStatus::from("ongoing"), MangaStatus::Ongoing);
        let hiatus = MangaStatus::from("hiatus");
        assert_eq!(hiatus.as_str(), "hiatus");
        assert!(!hiatus.is_completed());
    }

    #[test]
    fn entry_derives_cover_and_title() {
        let metadata = MangaMetadata {
            title: "One Piece".to_string(),
            ..MangaMetadata::default()
        };
        let entry = MangaEntry::new(Path::new("/lib/one-piece"), metadata);
        assert_eq!(entry.name, "one-piece");
        assert_eq!(entry.title, "One Piece");
        assert_eq!(entry.cover_path, Path::new("/lib/one-piece/main.jpg"));
        assert_eq!(
            entry.metadata_path(),
            Path::new("/lib/one-piece/data.json")
        );
    }

    #[test]
    fn blank_title_is_rejected() {
        let metadata = MangaMetadata {
            title: "   ".to_string(),
            ..MangaMetadata::default()
        };
        assert!(metadata.validate().is_err());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn sidecar_parses_downloader_fields() {
        let raw = r#"{
            "title": "Dr. Stone",
            "url": "https://example.test/dr-stone",
            "path": "/sdcard/TruyenPDF/dr-stone",
            "mainPhoto": "https://example.test/cover.jpg",
            "chapters": [
                {"title": "Chapter 1", "link": "https://example.test/1"}
            ],
            "total": 232,
            "isDownload": true,
            "downloadComplete": 120,
            "status": "completed"
        }"#;
        let parsed: MangaMetadata = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.title, "Dr. Stone");
        assert_eq!(parsed.source_url, "https://example.test/dr-stone");
        assert_eq!(parsed.chapters.len(), 1);
        assert_eq!(parsed.total_chapter_count, 232);
        assert_eq!(parsed.download_complete_count, 120);
        assert!(parsed.status.is_completed());
        assert_eq!(parsed.is_download, Some(true));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn sidecar_only_requires_title() {
        let parsed: MangaMetadata =
            serde_json::from_str(r#"{"title": "Solo"}"#).unwrap();
        assert_eq!(parsed.total_chapter_count, 0);
        assert_eq!(parsed.status, MangaStatus::Ongoing);
        assert!(serde_json::from_str::<MangaMetadata>("{}").is_err());
    }
}
