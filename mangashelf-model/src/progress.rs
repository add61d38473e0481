//! Reading progress and per-manga reading history.
//!
//! All timestamps are epoch milliseconds.

use std::path::{Path, PathBuf};

/// Page position within one chapter at the last observation.
///
/// `is_completed` is computed when the record is built and frozen until the
/// next update; it is never re-derived from the page numbers on read.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct ReadingProgress {
    pub chapter_path: PathBuf,
    pub chapter_name: String,
    pub current_page: u32,
    /// Zero while the page count is still unknown.
    pub total_pages: u32,
    pub last_read_time: i64,
    pub is_completed: bool,
}

impl ReadingProgress {
    pub fn new(
        chapter_path: impl Into<PathBuf>,
        chapter_name: impl Into<String>,
        current_page: u32,
        total_pages: u32,
        now: i64,
    ) -> Self {
        let current_page = current_page.max(1);
        Self {
            chapter_path: chapter_path.into(),
            chapter_name: chapter_name.into(),
            current_page,
            total_pages,
            last_read_time: now,
            is_completed: current_page >= total_pages,
        }
    }
}

/// Aggregate reading record for one manga.
///
/// Once any progress has been recorded, `last_read_chapter.chapter_path`
/// is always a member of `read_chapters`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct MangaReadingHistory {
    pub manga_path: PathBuf,
    pub manga_title: String,
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub last_read_chapter: Option<ReadingProgress>,
    /// Visited chapter paths in first-visit order, without duplicates.
    #[cfg_attr(feature = "serde", serde(default))]
    pub read_chapters: Vec<PathBuf>,
    pub last_access_time: i64,
}

impl MangaReadingHistory {
    pub fn new(
        manga_path: impl Into<PathBuf>,
        manga_title: impl Into<String>,
        now: i64,
    ) -> Self {
        Self {
            manga_path: manga_path.into(),
            manga_title: manga_title.into(),
            last_read_chapter: None,
            read_chapters: Vec::new(),
            last_access_time: now,
        }
    }

    /// Replaces the last-read chapter and marks it visited.
    pub fn record(&mut self, progress: ReadingProgress) {
        self.last_access_time = progress.last_read_time;
        self.insert_read(&progress.chapter_path);
        self.last_read_chapter = Some(progress);
    }

    /// Adds a chapter to the visited set. Returns false if already present.
    pub fn mark_read(&mut self, chapter_path: &Path, now: i64) -> bool {
        if self.insert_read(chapter_path) {
            self.last_access_time = now;
            true
        } else {
            false
        }
    }

    fn insert_read(&mut self, chapter_path: &Path) -> bool {
        if self.has_read(chapter_path) {
            return false;
        }
        self.read_chapters.push(chapter_path.to_path_buf());
        true
    }

    pub fn has_read(&self, chapter_path: &Path) -> bool {
        self.read_chapters.iter().any(|p| p == chapter_path)
    }

    pub fn read_count(&self) -> usize {
        self.read_chapters.len()
    }

    /// Fraction of `total_chapters` visited, clamped to `0.0..=1.0`.
    pub fn read_ratio(&self, total_chapters: u32) -> f64 {
        if total_chapters == 0 {
            return 0.0;
        }
        (self.read_count() as f64 / total_chapters as f64).min(1.0)
    }

    pub fn read_percent(&self, total_chapters: u32) -> u32 {
        (self.read_ratio(total_chapters) * 100.0).round() as u32
    }
}

/// Insertion-ordered map from manga path to its reading history.
///
/// Persisted as a JSON object keyed by manga path; document order is kept
/// on load so recency ties stay stable across restarts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryLedger {
    entries: Vec<MangaReadingHistory>,
}

impl HistoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, manga_path: &Path) -> Option<&MangaReadingHistory> {
        self.entries.iter().find(|h| h.manga_path == manga_path)
    }

    pub fn get_mut(
        &mut self,
        manga_path: &Path,
    ) -> Option<&mut MangaReadingHistory> {
        self.entries.iter_mut().find(|h| h.manga_path == manga_path)
    }

    /// Returns the record for `manga_path`, creating it if absent.
    pub fn get_or_insert(
        &mut self,
        manga_path: &Path,
        manga_title: &str,
        now: i64,
    ) -> &mut MangaReadingHistory {
        let index = match self
            .entries
            .iter()
            .position(|h| h.manga_path == manga_path)
        {
            Some(index) => index,
            None => {
                self.entries.push(MangaReadingHistory::new(
                    manga_path,
                    manga_title,
                    now,
                ));
                self.entries.len() - 1
            }
        };
        &mut self.entries[index]
    }

    /// Inserts or replaces the record keyed by its `manga_path`.
    pub fn insert(&mut self, history: MangaReadingHistory) {
        match self.get_mut(&history.manga_path) {
            Some(existing) => *existing = history,
            None => self.entries.push(history),
        }
    }

    pub fn remove(&mut self, manga_path: &Path) -> Option<MangaReadingHistory> {
        let index = self
            .entries
            .iter()
            .position(|h| h.manga_path == manga_path)?;
        Some(self.entries.remove(index))
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &MangaReadingHistory> {
        self.entries.iter()
    }

    /// Records sorted by `last_access_time`, most recent first. Equal times
    /// keep insertion order.
    pub fn recent(&self) -> Vec<&MangaReadingHistory> {
        let mut recent: Vec<&MangaReadingHistory> =
            self.entries.iter().collect();
        recent.sort_by(|a, b| b.last_access_time.cmp(&a.last_access_time));
        recent
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for HistoryLedger {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for history in &self.entries {
            map.serialize_entry(
                &history.manga_path.to_string_lossy(),
                history,
            )?;
        }
        map.end()
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for HistoryLedger {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct LedgerVisitor;

        impl<'de> serde::de::Visitor<'de> for LedgerVisitor {
            type Value = HistoryLedger;

            fn expecting(
                &self,
                f: &mut std::fmt::Formatter<'_>,
            ) -> std::fmt::Result {
                f.write_str("a map of manga path to reading history")
            }

            fn visit_map<A>(
                self,
                mut access: A,
            ) -> Result<Self::Value, A::Error>
            where
                A: serde::de::MapAccess<'de>,
            {
                let mut ledger = HistoryLedger::new();
                while let Some((key, mut history)) =
                    access.next_entry::<String, MangaReadingHistory>()?
                {
                    // The key is the identity; a disagreeing body loses.
                    history.manga_path = PathBuf::from(key);
                    ledger.insert(history);
                }
                Ok(ledger)
            }
        }

        deserializer.deserialize_map(LedgerVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(
        chapter: &str,
        page: u32,
        total: u32,
        now: i64,
    ) -> ReadingProgress {
        ReadingProgress::new(chapter, chapter, page, total, now)
    }

    #[test]
    fn completion_is_frozen_at_construction() {
        assert!(progress("/m/c1.pdf", 5, 5, 1).is_completed);
        assert!(!progress("/m/c1.pdf", 3, 5, 1).is_completed);
        // Page numbers start at one.
        assert_eq!(progress("/m/c1.pdf", 0, 5, 1).current_page, 1);
    }

    #[test]
    fn record_keeps_read_chapters_unique() {
        let mut history = MangaReadingHistory::new("/m", "M", 0);
        history.record(progress("/m/c1.pdf", 1, 10, 10));
        history.record(progress("/m/c1.pdf", 2, 10, 20));
        history.record(progress("/m/c2.pdf", 1, 10, 30));

        assert_eq!(
            history.read_chapters,
            vec![PathBuf::from("/m/c1.pdf"), PathBuf::from("/m/c2.pdf")]
        );
        assert_eq!(history.last_access_time, 30);
        let last = history.last_read_chapter.as_ref().unwrap();
        assert!(history.has_read(&last.chapter_path));
    }

    #[test]
    fn mark_read_only_touches_on_change() {
        let mut history = MangaReadingHistory::new("/m", "M", 0);
        assert!(history.mark_read(Path::new("/m/c1.pdf"), 5));
        assert!(!history.mark_read(Path::new("/m/c1.pdf"), 9));
        assert_eq!(history.last_access_time, 5);
    }

    #[test]
    fn read_ratio_handles_unknown_totals() {
        let mut history = MangaReadingHistory::new("/m", "M", 0);
        history.mark_read(Path::new("/m/c1.pdf"), 1);
        history.mark_read(Path::new("/m/c2.pdf"), 1);
        assert_eq!(history.read_ratio(0), 0.0);
        assert_eq!(history.read_percent(3), 67);
        assert_eq!(history.read_ratio(1), 1.0);
    }

    #[test]
    fn recent_orders_by_access_time_descending() {
        let mut ledger = HistoryLedger::new();
        for (path, time) in [("/a", 100), ("/b", 300), ("/c", 200)] {
            ledger.insert(MangaReadingHistory::new(path, path, time));
        }
        let times: Vec<i64> =
            ledger.recent().iter().map(|h| h.last_access_time).collect();
        assert_eq!(times, vec![300, 200, 100]);
    }

    #[test]
    fn recent_ties_keep_insertion_order() {
        let mut ledger = HistoryLedger::new();
        for path in ["/z", "/a", "/m"] {
            ledger.insert(MangaReadingHistory::new(path, path, 7));
        }
        let order: Vec<&Path> = ledger
            .recent()
            .iter()
            .map(|h| h.manga_path.as_path())
            .collect();
        assert_eq!(
            order,
            vec![Path::new("/z"), Path::new("/a"), Path::new("/m")]
        );
    }

    #[test]
    fn get_or_insert_does_not_retitle() {
        let mut ledger = HistoryLedger::new();
        ledger.get_or_insert(Path::new("/m"), "First", 1);
        let again = ledger.get_or_insert(Path::new("/m"), "Second", 2);
        assert_eq!(again.manga_title, "First");
        assert_eq!(ledger.len(), 1);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ledger_serializes_as_keyed_object() {
        let mut ledger = HistoryLedger::new();
        let history = ledger.get_or_insert(Path::new("/lib/b"), "B", 1);
        history.record(progress("/lib/b/c1.pdf", 2, 9, 4));
        ledger.get_or_insert(Path::new("/lib/a"), "A", 2);

        let json = serde_json::to_value(&ledger).unwrap();
        let entry = &json["/lib/b"];
        assert_eq!(entry["mangaTitle"], "B");
        assert_eq!(entry["lastReadChapter"]["currentPage"], 2);
        assert_eq!(entry["lastReadChapter"]["isCompleted"], false);
        assert_eq!(entry["readChapters"][0], "/lib/b/c1.pdf");
        assert!(json["/lib/a"].get("lastReadChapter").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn ledger_load_keeps_document_order() {
        let raw = r#"{
            "/z": {"mangaPath": "/z", "mangaTitle": "Z",
                   "readChapters": [], "lastAccessTime": 5},
            "/a": {"mangaPath": "/elsewhere", "mangaTitle": "A",
                   "readChapters": [], "lastAccessTime": 5}
        }"#;
        let ledger: HistoryLedger = serde_json::from_str(raw).unwrap();
        let order: Vec<&Path> =
            ledger.iter().map(|h| h.manga_path.as_path()).collect();
        assert_eq!(order, vec![Path::new("/z"), Path::new("/a")]);
    }
}
