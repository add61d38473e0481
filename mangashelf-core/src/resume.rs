//! "Continue reading" resolution and per-manga progress figures.

use mangashelf_model::{
    FileEntry, MangaEntry, MangaReadingHistory, ReadingProgress,
    format_file_size,
};

use crate::library::ChapterListing;

/// Where to pick a manga back up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    /// Position of the chapter within the current listing.
    pub index: usize,
    pub chapter: FileEntry,
    pub progress: ReadingProgress,
}

/// Locates the last-read chapter in `listing`.
///
/// `None` when nothing was read yet, or when that chapter file is no longer
/// part of the listing.
pub fn resume_point(
    history: Option<&MangaReadingHistory>,
    listing: &ChapterListing,
) -> Option<ResumePoint> {
    let progress = history?.last_read_chapter.as_ref()?;
    let index = listing.position(&progress.chapter_path)?;
    Some(ResumePoint {
        index,
        chapter: listing.chapters()[index].clone(),
        progress: progress.clone(),
    })
}

/// Reading figures shown next to a manga.
#[derive(Debug, Clone, PartialEq)]
pub struct MangaProgressSummary {
    pub read_count: usize,
    pub total_chapters: u32,
    /// In `0.0..=1.0`.
    pub ratio: f64,
    pub percent: u32,
    pub last_read: Option<ReadingProgress>,
}

impl MangaProgressSummary {
    /// Summary against the chapter total recorded in the manga's metadata.
    pub fn new(
        manga: &MangaEntry,
        history: Option<&MangaReadingHistory>,
    ) -> Self {
        let total = manga.metadata.total_chapter_count;
        match history {
            Some(history) => Self {
                read_count: history.read_count(),
                total_chapters: total,
                ratio: history.read_ratio(total),
                percent: history.read_percent(total),
                last_read: history.last_read_chapter.clone(),
            },
            None => Self {
                read_count: 0,
                total_chapters: total,
                ratio: 0.0,
                percent: 0,
                last_read: None,
            },
        }
    }

    /// `"3/10 (30%)"`.
    pub fn label(&self) -> String {
        format!(
            "{}/{} ({}%)",
            self.read_count, self.total_chapters, self.percent
        )
    }
}

/// One chapter row: display name, size text and read markers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRow {
    pub title: String,
    pub size: String,
    pub is_read: bool,
    pub is_last_read: bool,
}

pub fn chapter_rows(
    listing: &ChapterListing,
    history: Option<&MangaReadingHistory>,
) -> Vec<ChapterRow> {
    let last = history
        .and_then(|h| h.last_read_chapter.as_ref())
        .map(|p| p.chapter_path.as_path());
    listing
        .chapters()
        .iter()
        .map(|chapter| ChapterRow {
            title: chapter.display_name().to_string(),
            size: format_file_size(chapter.size),
            is_read: history.is_some_and(|h| h.has_read(&chapter.path)),
            is_last_read: last == Some(chapter.path.as_path()),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mangashelf_model::MangaMetadata;
    use std::path::Path;
    use std::sync::Arc;

    fn listing() -> ChapterListing {
        let chapters: Arc<[FileEntry]> = vec![
            FileEntry::file("/m/c1.pdf", 2048),
            FileEntry::file("/m/c2.pdf", 0),
        ]
        .into();
        ChapterListing::Found(chapters)
    }

    fn history_at(chapter: &str) -> MangaReadingHistory {
        let mut history = MangaReadingHistory::new("/m", "M", 0);
        history.record(ReadingProgress::new(chapter, "c", 3, 7, 5));
        history
    }

    #[test]
    fn resumes_at_last_read_chapter() {
        let history = history_at("/m/c2.pdf");
        let point =
            resume_point(Some(&history), &listing()).expect("resume point");
        assert_eq!(point.index, 1);
        assert_eq!(point.chapter.name, "c2.pdf");
        assert_eq!(point.progress.current_page, 3);
    }

    #[test]
    fn no_resume_without_history_or_file() {
        assert!(resume_point(None, &listing()).is_none());
        let gone = history_at("/m/c9.pdf");
        assert!(resume_point(Some(&gone), &listing()).is_none());
        assert!(resume_point(Some(&gone), &ChapterListing::Empty).is_none());
    }

    #[test]
    fn summary_uses_metadata_total() {
        let manga = MangaEntry::new(
            Path::new("/m"),
            MangaMetadata {
                title: "M".into(),
                total_chapter_count: 4,
                ..Default::default()
            },
        );
        let mut history = history_at("/m/c1.pdf");
        history.mark_read(Path::new("/m/c2.pdf"), 9);

        let summary = MangaProgressSummary::new(&manga, Some(&history));
        assert_eq!(summary.read_count, 2);
        assert_eq!(summary.percent, 50);
        assert_eq!(summary.label(), "2/4 (50%)");

        let empty = MangaProgressSummary::new(&manga, None);
        assert_eq!(empty.label(), "0/4 (0%)");
    }

    #[test]
    fn rows_mark_read_and_last_read() {
        let history = history_at("/m/c1.pdf");
        let rows = chapter_rows(&listing(), Some(&history));
        assert_eq!(rows[0].title, "c1");
        assert_eq!(rows[0].size, "2.0 KB");
        assert!(rows[0].is_read && rows[0].is_last_read);
        assert!(!rows[1].is_read);
        assert_eq!(rows[1].size, "");
    }
}
