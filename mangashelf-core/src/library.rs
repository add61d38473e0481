//! Library scanning and chapter discovery.
//!
//! A library root contains one folder per manga. A folder counts as a manga
//! only if it holds both [`METADATA_FILE`] and [`COVER_FILE`]; anything else
//! is silently ignored. Chapters are the `.pdf` files directly inside a
//! manga folder.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use mangashelf_model::{
    COVER_FILE, FileEntry, METADATA_FILE, MangaEntry, MangaMetadata,
};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::collation::{Collation, sort_entries_by_name, sort_manga_by_title};
use crate::error::{Result, ShelfError};
use crate::fs::FileSystem;

/// Result of one [`LibraryScanner::scan_library`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibraryScan {
    pub root: PathBuf,
    /// Monotonic per scanner; later scans carry larger numbers.
    pub generation: u64,
    /// Sorted by title, natural order.
    pub manga: Vec<MangaEntry>,
}

impl LibraryScan {
    pub fn is_empty(&self) -> bool {
        self.manga.is_empty()
    }

    pub fn find(&self, manga_path: &Path) -> Option<&MangaEntry> {
        self.manga.iter().find(|m| m.path == manga_path)
    }
}

/// Outcome of listing a manga's chapters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterListing {
    /// Chapter files in natural filename order.
    Found(Arc<[FileEntry]>),
    /// The folder holds no `.pdf` files. A normal outcome, not an error.
    Empty,
}

impl ChapterListing {
    pub fn chapters(&self) -> &[FileEntry] {
        match self {
            ChapterListing::Found(chapters) => chapters,
            ChapterListing::Empty => &[],
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, ChapterListing::Empty)
    }

    pub fn len(&self) -> usize {
        self.chapters().len()
    }

    /// Position of a chapter file within the listing.
    pub fn position(&self, chapter_path: &Path) -> Option<usize> {
        self.chapters().iter().position(|c| c.path == chapter_path)
    }
}

/// Walks library roots and lists chapter files, caching chapter listings
/// per manga path until invalidated.
pub struct LibraryScanner {
    fs: Arc<dyn FileSystem>,
    generation: AtomicU64,
    chapter_cache: RwLock<HashMap<PathBuf, Arc<[FileEntry]>>>,
}

impl std::fmt::Debug for LibraryScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LibraryScanner")
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl LibraryScanner {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self {
            fs,
            generation: AtomicU64::new(0),
            chapter_cache: RwLock::new(HashMap::new()),
        }
    }

    /// Lists the manga folders directly under `root`.
    ///
    /// Only a failure to list `root` itself is an error. Folders without both
    /// sidecar files are skipped quietly; folders whose metadata cannot be
    /// read or parsed are skipped with a warning.
    pub async fn scan_library(&self, root: &Path) -> Result<LibraryScan> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let children = self.fs.list_dir(root).await?;

        let mut manga = Vec::new();
        for child in children.iter().filter(|c| c.is_dir()) {
            if let Some(entry) = self.probe_manga_folder(&child.path).await {
                manga.push(entry);
            }
        }
        sort_manga_by_title(&mut manga);

        info!(
            "Scanned {}: found {} manga folders",
            root.display(),
            manga.len()
        );
        Ok(LibraryScan {
            root: root.to_path_buf(),
            generation,
            manga,
        })
    }

    async fn probe_manga_folder(&self, folder: &Path) -> Option<MangaEntry> {
        let metadata_path = folder.join(METADATA_FILE);
        let has_metadata = self.fs.exists(&metadata_path).await;
        let has_cover = self.fs.exists(&folder.join(COVER_FILE)).await;
        if !has_metadata || !has_cover {
            return None;
        }

        let raw = match self.fs.read_to_string(&metadata_path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping manga folder {}: {}", folder.display(), e);
                return None;
            }
        };
        let metadata = match serde_json::from_str::<MangaMetadata>(&raw) {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(
                    "Skipping manga folder {}: invalid {}: {}",
                    folder.display(),
                    METADATA_FILE,
                    e
                );
                return None;
            }
        };
        if let Err(e) = metadata.validate() {
            warn!("Skipping manga folder {}: {}", folder.display(), e);
            return None;
        }
        Some(MangaEntry::new(folder, metadata))
    }

    /// Loads a single manga folder, reporting why it does not qualify.
    pub async fn load_manga(&self, folder: &Path) -> Result<MangaEntry> {
        for sidecar in [METADATA_FILE, COVER_FILE] {
            let path = folder.join(sidecar);
            if !self.fs.exists(&path).await {
                return Err(ShelfError::NotFound { path });
            }
        }
        let raw = self.fs.read_to_string(&folder.join(METADATA_FILE)).await?;
        let metadata: MangaMetadata = serde_json::from_str(&raw)?;
        metadata.validate()?;
        Ok(MangaEntry::new(folder, metadata))
    }

    /// Lists a manga's chapter files, serving repeated calls from the cache.
    ///
    /// Empty listings are not cached, so chapters that appear later are
    /// picked up without an explicit refresh.
    pub async fn list_chapters(
        &self,
        manga: &MangaEntry,
    ) -> Result<ChapterListing> {
        if let Some(cached) = self.chapter_cache.read().await.get(&manga.path) {
            debug!("Using cached chapters for {}", manga.title);
            return Ok(ChapterListing::Found(Arc::clone(cached)));
        }

        let mut chapters: Vec<FileEntry> = self
            .fs
            .list_dir(&manga.path)
            .await?
            .into_iter()
            .filter(FileEntry::is_chapter)
            .collect();
        if chapters.is_empty() {
            debug!("No chapter files in {}", manga.path.display());
            return Ok(ChapterListing::Empty);
        }
        sort_entries_by_name(&mut chapters, Collation::Base);

        let chapters: Arc<[FileEntry]> = chapters.into();
        debug!(
            "Cached {} chapters for {}",
            chapters.len(),
            manga.title
        );
        self.chapter_cache
            .write()
            .await
            .insert(manga.path.clone(), Arc::clone(&chapters));
        Ok(ChapterListing::Found(chapters))
    }

    /// Drops one cached chapter listing, or all of them when `manga_path`
    /// is `None`.
    pub async fn invalidate_cache(&self, manga_path: Option<&Path>) {
        let mut cache = self.chapter_cache.write().await;
        match manga_path {
            Some(path) => {
                cache.remove(path);
            }
            None => cache.clear(),
        }
    }
}

/// Most recently applied library scan.
///
/// Scans may finish out of order; only a scan newer than the current one is
/// accepted, so a slow superseded scan never replaces fresher results.
#[derive(Debug, Default)]
pub struct LibraryIndex {
    current: Option<LibraryScan>,
}

impl LibraryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs `scan` if it is newer than the current one. Returns whether
    /// it was applied.
    pub fn apply(&mut self, scan: LibraryScan) -> bool {
        if let Some(current) = &self.current
            && scan.generation <= current.generation
        {
            debug!(
                stale = scan.generation,
                current = current.generation,
                "discarding superseded library scan"
            );
            return false;
        }
        self.current = Some(scan);
        true
    }

    pub fn current(&self) -> Option<&LibraryScan> {
        self.current.as_ref()
    }

}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn add_manga(fs: &InMemoryFs, folder: &str, title: &str) {
        fs.add_file(
            format!("{folder}/{METADATA_FILE}"),
            format!(
                r#"{{"title": "{title}", "total": 3, "status": "ongoing"}}"#
            ),
        );
        fs.add_file(format!("{folder}/{COVER_FILE}"), "jpeg");
    }

    fn scanner(fs: &InMemoryFs) -> LibraryScanner {
        LibraryScanner::new(Arc::new(fs.clone()))
    }

    #[tokio::test]
    async fn includes_only_folders_with_both_sidecars() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/naruto", "Naruto");
        fs.add_file("/lib/no-cover/data.json", r#"{"title": "No Cover"}"#);
        fs.add_file("/lib/no-data/main.jpg", "jpeg");
        fs.add_dir("/lib/empty");
        fs.add_file("/lib/stray.pdf", "pdf");

        let scan = scanner(&fs).scan_library(Path::new("/lib")).await.unwrap();
        assert_eq!(scan.manga.len(), 1);
        assert_eq!(scan.manga[0].title, "Naruto");
        assert_eq!(scan.manga[0].name, "naruto");
        assert_eq!(
            scan.manga[0].cover_path,
            PathBuf::from("/lib/naruto/main.jpg")
        );
    }

    #[tokio::test]
    async fn broken_metadata_skips_only_that_folder() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/good", "Good");
        fs.add_file("/lib/bad/data.json", "{ title: ");
        fs.add_file("/lib/bad/main.jpg", "jpeg");
        add_manga(&fs, "/lib/locked", "Locked");
        fs.deny("/lib/locked/data.json");
        fs.add_file("/lib/blank/data.json", r#"{"title": "  "}"#);
        fs.add_file("/lib/blank/main.jpg", "jpeg");

        let scan = scanner(&fs).scan_library(Path::new("/lib")).await.unwrap();
        let titles: Vec<_> =
            scan.manga.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Good"]);
    }

    #[tokio::test]
    async fn titles_sort_numerically() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/a", "Chapter 10");
        add_manga(&fs, "/lib/b", "Chapter 2");
        add_manga(&fs, "/lib/c", "apple");

        let scan = scanner(&fs).scan_library(Path::new("/lib")).await.unwrap();
        let titles: Vec<_> =
            scan.manga.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["apple", "Chapter 2", "Chapter 10"]);
    }

    #[tokio::test]
    async fn accented_titles_file_under_their_letter() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/zoro", "Zoro");
        add_manga(&fs, "/lib/dao", "Đảo Hải Tặc");
        add_manga(&fs, "/lib/anh", "Ánh Trăng");
        add_manga(&fs, "/lib/bleach", "Bleach");

        let scan = scanner(&fs).scan_library(Path::new("/lib")).await.unwrap();
        let titles: Vec<_> =
            scan.manga.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["Ánh Trăng", "Bleach", "Đảo Hải Tặc", "Zoro"]);
    }

    #[tokio::test]
    async fn unreadable_root_is_reported() {
        let fs = InMemoryFs::new();
        fs.add_dir("/locked");
        fs.deny("/locked");
        let scanner = scanner(&fs);

        let err = scanner.scan_library(Path::new("/locked")).await.unwrap_err();
        assert!(err.is_permission());

        let err = scanner
            .scan_library(Path::new("/missing"))
            .await
            .unwrap_err();
        assert!(matches!(err, ShelfError::NotFound { .. }));
    }

    #[tokio::test]
    async fn empty_root_is_not_an_error() {
        let fs = InMemoryFs::new();
        fs.add_dir("/lib");
        let scan = scanner(&fs).scan_library(Path::new("/lib")).await.unwrap();
        assert!(scan.is_empty());
    }

    #[tokio::test]
    async fn load_manga_explains_rejections() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/ok", "Ok");
        fs.add_file("/lib/no-cover/data.json", r#"{"title": "x"}"#);
        fs.add_file("/lib/bad/data.json", "nope");
        fs.add_file("/lib/bad/main.jpg", "jpeg");
        let scanner = scanner(&fs);

        let manga = scanner.load_manga(Path::new("/lib/ok")).await.unwrap();
        assert_eq!(manga.title, "Ok");
        assert_eq!(manga.metadata.total_chapter_count, 3);

        match scanner.load_manga(Path::new("/lib/no-cover")).await {
            Err(ShelfError::NotFound { path }) => {
                assert_eq!(path, PathBuf::from("/lib/no-cover/main.jpg"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            scanner.load_manga(Path::new("/lib/bad")).await,
            Err(ShelfError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn chapters_are_filtered_and_naturally_sorted() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/m", "M");
        fs.add_file("/lib/m/c2.pdf", "2");
        fs.add_file("/lib/m/c10.pdf", "10");
        fs.add_file("/lib/m/c1.PDF", "1");
        fs.add_file("/lib/m/notes.txt", "x");
        fs.add_dir("/lib/m/extra.pdf");

        let scanner = scanner(&fs);
        let scan = scanner.scan_library(Path::new("/lib")).await.unwrap();
        let listing = scanner.list_chapters(&scan.manga[0]).await.unwrap();
        let names: Vec<_> =
            listing.chapters().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["c1.PDF", "c2.pdf", "c10.pdf"]);
        assert_eq!(listing.position(Path::new("/lib/m/c10.pdf")), Some(2));
    }

    #[tokio::test]
    async fn second_listing_is_served_from_cache() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/m", "M");
        fs.add_file("/lib/m/c1.pdf", "1");
        let scanner = scanner(&fs);
        let manga = MangaEntry::new(Path::new("/lib/m"), MangaMetadata {
            title: "M".into(),
            ..Default::default()
        });

        let first = scanner.list_chapters(&manga).await.unwrap();
        let second = scanner.list_chapters(&manga).await.unwrap();
        assert_eq!(fs.list_calls("/lib/m"), 1);
        match (&first, &second) {
            (ChapterListing::Found(a), ChapterListing::Found(b)) => {
                assert!(Arc::ptr_eq(a, b));
            }
            other => panic!("expected cached listings, got {other:?}"),
        }

        // Stale until invalidated.
        fs.add_file("/lib/m/c2.pdf", "2");
        assert_eq!(scanner.list_chapters(&manga).await.unwrap().len(), 1);

        scanner.invalidate_cache(Some(Path::new("/lib/m"))).await;
        assert_eq!(scanner.list_chapters(&manga).await.unwrap().len(), 2);
        assert_eq!(fs.list_calls("/lib/m"), 2);

        scanner.invalidate_cache(None).await;
        scanner.list_chapters(&manga).await.unwrap();
        assert_eq!(fs.list_calls("/lib/m"), 3);
    }

    #[tokio::test]
    async fn folder_without_pdfs_is_empty_and_uncached() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/m", "M");
        let scanner = scanner(&fs);
        let manga = MangaEntry::new(Path::new("/lib/m"), MangaMetadata {
            title: "M".into(),
            ..Default::default()
        });

        assert!(scanner.list_chapters(&manga).await.unwrap().is_empty());
        fs.add_file("/lib/m/c1.pdf", "1");
        assert_eq!(scanner.list_chapters(&manga).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn index_ignores_superseded_scans() {
        let fs = InMemoryFs::new();
        add_manga(&fs, "/lib/a", "A");
        let scanner = scanner(&fs);

        let older = scanner.scan_library(Path::new("/lib")).await.unwrap();
        add_manga(&fs, "/lib/b", "B");
        let newer = scanner.scan_library(Path::new("/lib")).await.unwrap();
        assert!(newer.generation > older.generation);

        let newer_generation = newer.generation;
        let mut index = LibraryIndex::new();
        assert!(index.apply(newer));
        assert!(!index.apply(older));
        let current = index.current().expect("applied scan");
        assert_eq!(current.manga.len(), 2);
        assert_eq!(current.generation, newer_generation);
    }
}
