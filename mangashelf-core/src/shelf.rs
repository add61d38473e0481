//! Composition root wiring the stores and the scanner together.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mangashelf_model::{MangaEntry, ViewerSettings, ViewerSettingsPatch};
use tokio::sync::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{Result, ShelfError};
use crate::fs::{FileSystem, RealFs};
use crate::history::ReadingHistoryStore;
use crate::library::{ChapterListing, LibraryIndex, LibraryScan, LibraryScanner};
use crate::paths::{AppPaths, platform_defaults, storage_root};
use crate::picker::FolderPicker;
use crate::resume::{MangaProgressSummary, ResumePoint, resume_point};
use crate::session::ReadingSession;
use crate::settings::SettingsStore;
use crate::storage::{FileKvStore, KeyValueStore};

/// Everything one running application needs, built once and passed
/// around explicitly.
pub struct Shelf {
    fs: Arc<dyn FileSystem>,
    settings: SettingsStore,
    history: Arc<ReadingHistoryStore>,
    scanner: LibraryScanner,
    index: Mutex<LibraryIndex>,
    storage_root: PathBuf,
}

impl fmt::Debug for Shelf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shelf")
            .field("settings", &self.settings)
            .field("scanner", &self.scanner)
            .field("storage_root", &self.storage_root)
            .finish_non_exhaustive()
    }
}

impl Shelf {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        kv: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        defaults: ViewerSettings,
    ) -> Self {
        Self {
            scanner: LibraryScanner::new(Arc::clone(&fs)),
            settings: SettingsStore::new(Arc::clone(&kv), defaults),
            history: Arc::new(ReadingHistoryStore::new(kv, clock)),
            index: Mutex::new(LibraryIndex::new()),
            storage_root: storage_root(),
            fs,
        }
    }

    /// Real filesystem, file-backed storage under `paths` and persisted
    /// settings already loaded.
    pub async fn open(paths: &AppPaths) -> Result<Self> {
        tokio::fs::create_dir_all(paths.data_dir()).await?;
        let shelf = Self::new(
            Arc::new(RealFs::new()),
            Arc::new(FileKvStore::new(paths.storage_dir())),
            Arc::new(SystemClock),
            platform_defaults(),
        );
        shelf.settings.load().await;
        tracing::debug!("opened shelf at {}", paths.data_dir().display());
        Ok(shelf)
    }

    /// Overrides the highest folder the picker may reach.
    pub fn with_storage_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.storage_root = root.into();
        self
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn history(&self) -> &Arc<ReadingHistoryStore> {
        &self.history
    }

    pub fn scanner(&self) -> &LibraryScanner {
        &self.scanner
    }

    /// `root` if given, else the configured library folder.
    pub async fn library_root(&self, root: Option<&Path>) -> PathBuf {
        match root {
            Some(root) => root.to_path_buf(),
            None => self.settings.current().await.default_library_folder,
        }
    }

    /// Rescans the library and drops every cached chapter listing.
    ///
    /// The returned scan is the one that was just taken, even if a newer
    /// scan has already been applied to the index in the meantime.
    pub async fn refresh_library(
        &self,
        root: Option<&Path>,
    ) -> Result<LibraryScan> {
        let root = self.library_root(root).await;
        self.scanner.invalidate_cache(None).await;
        let scan = self.scanner.scan_library(&root).await?;
        self.index.lock().await.apply(scan.clone());
        Ok(scan)
    }

    /// Finds a manga by folder, from the last scan when possible.
    pub async fn manga(&self, folder: &Path) -> Result<MangaEntry> {
        if let Some(manga) = self
            .index
            .lock()
            .await
            .current()
            .and_then(|scan| scan.find(folder))
        {
            return Ok(manga.clone());
        }
        self.scanner.load_manga(folder).await
    }

    pub async fn chapters(&self, manga: &MangaEntry) -> Result<ChapterListing> {
        self.scanner.list_chapters(manga).await
    }

    pub async fn resume(
        &self,
        manga: &MangaEntry,
    ) -> Result<Option<ResumePoint>> {
        let listing = self.chapters(manga).await?;
        let history = self.history.get_manga_history(&manga.path).await;
        Ok(resume_point(history.as_ref(), &listing))
    }

    pub async fn summary(&self, manga: &MangaEntry) -> MangaProgressSummary {
        let history = self.history.get_manga_history(&manga.path).await;
        MangaProgressSummary::new(manga, history.as_ref())
    }

    /// Opens a manga in the viewer at `index`, or where the user left off.
    pub async fn start_reading(
        &self,
        manga: &MangaEntry,
        index: Option<usize>,
    ) -> Result<ReadingSession> {
        let listing = self.chapters(manga).await?;
        let ChapterListing::Found(chapters) = &listing else {
            return Err(ShelfError::NotFound {
                path: manga.path.clone(),
            });
        };
        let index = match index {
            Some(index) => index,
            None => {
                let history = self.history.get_manga_history(&manga.path).await;
                resume_point(history.as_ref(), &listing).map_or(0, |p| p.index)
            }
        };
        ReadingSession::start(
            Arc::clone(&self.history),
            manga.clone(),
            Arc::clone(chapters),
            self.settings.current().await,
            index,
        )
        .await
    }

    /// Folder picker starting at `start`, or the configured library folder.
    pub async fn folder_picker(
        &self,
        start: Option<&Path>,
    ) -> Result<FolderPicker> {
        let start = self.library_root(start).await;
        let fs = Arc::clone(&self.fs);
        FolderPicker::open(fs, self.storage_root.clone(), start).await
    }

    /// Persists the folder chosen in a picker as the library root.
    pub async fn choose_library_folder(&self, picker: FolderPicker) -> bool {
        let folder = picker.confirm();
        tracing::info!("Library folder set to {}", folder.display());
        self.settings
            .save(&ViewerSettingsPatch {
                default_library_folder: Some(folder),
                ..Default::default()
            })
            .await
    }
}
