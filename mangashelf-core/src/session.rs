//! Glue between an open chapter in the page renderer and the history store.
//!
//! The renderer itself lives outside this crate. It reports page events
//! into a [`ReadingSession`], which turns them into progress updates and
//! answers the questions the viewer chrome asks (page readout, spacing,
//! whether there is a next chapter).

use std::fmt;
use std::sync::Arc;

use mangashelf_model::{FileEntry, MangaEntry, ReadingProgress, ViewerSettings};

use crate::error::{Result, ShelfError};
use crate::history::ReadingHistoryStore;

/// One manga opened in the viewer, positioned on a single chapter.
pub struct ReadingSession {
    history: Arc<ReadingHistoryStore>,
    manga: MangaEntry,
    chapters: Arc<[FileEntry]>,
    settings: ViewerSettings,
    index: usize,
    current_page: u32,
    total_pages: u32,
}

impl fmt::Debug for ReadingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadingSession")
            .field("manga", &self.manga.path)
            .field("index", &self.index)
            .field("current_page", &self.current_page)
            .field("total_pages", &self.total_pages)
            .finish_non_exhaustive()
    }
}

impl ReadingSession {
    /// Opens chapter `index` of `chapters` and records it as being read.
    pub async fn start(
        history: Arc<ReadingHistoryStore>,
        manga: MangaEntry,
        chapters: Arc<[FileEntry]>,
        settings: ViewerSettings,
        index: usize,
    ) -> Result<Self> {
        let mut session = Self {
            history,
            manga,
            chapters,
            settings,
            index: 0,
            current_page: 1,
            total_pages: 0,
        };
        session.open_chapter(index).await?;
        Ok(session)
    }

    /// Switches to chapter `index`.
    ///
    /// The page count is unknown until the renderer reports it, so the
    /// chapter is recorded at page 1 of 1.
    pub async fn open_chapter(
        &mut self,
        index: usize,
    ) -> Result<ReadingProgress> {
        if index >= self.chapters.len() {
            return Err(ShelfError::InvalidArgument(format!(
                "chapter index {index} out of range for {} chapters",
                self.chapters.len()
            )));
        }
        self.index = index;
        self.current_page = 1;
        self.total_pages = 0;

        let chapter = &self.chapters[index];
        let progress = self
            .history
            .update_chapter_progress(
                &self.manga.path,
                &self.manga.title,
                &chapter.path,
                &chapter.name,
                1,
                1,
            )
            .await;
        tracing::info!("Opened {} / {}", self.manga.title, chapter.name);
        Ok(progress)
    }

    /// Page event from the renderer. Events without a known position or
    /// page count are tracked but not recorded.
    pub async fn page_changed(
        &mut self,
        page: u32,
        total: u32,
    ) -> Option<ReadingProgress> {
        self.current_page = page;
        self.total_pages = total;
        if page == 0 || total == 0 {
            return None;
        }

        let chapter = &self.chapters[self.index];
        let progress = self
            .history
            .update_chapter_progress(
                &self.manga.path,
                &self.manga.title,
                &chapter.path,
                &chapter.name,
                page,
                total,
            )
            .await;
        if self.reached_end() {
            tracing::debug!("Chapter completed, next chapter available");
        }
        Some(progress)
    }

    pub async fn next_chapter(&mut self) -> Option<ReadingProgress> {
        if !self.has_next() {
            return None;
        }
        self.open_chapter(self.index + 1).await.ok()
    }

    pub async fn previous_chapter(&mut self) -> Option<ReadingProgress> {
        if !self.has_previous() {
            return None;
        }
        self.open_chapter(self.index - 1).await.ok()
    }

    /// Converts a renderer failure into an error naming the chapter file.
    pub fn render_failed(&self, message: impl Into<String>) -> ShelfError {
        let chapter = self.current_chapter();
        let message = message.into();
        tracing::error!("PDF error in {}: {}", chapter.path.display(), message);
        ShelfError::Render {
            path: chapter.path.clone(),
            message,
        }
    }

    /// `"X / Y"` readout, or `None` when the indicator is turned off.
    pub fn page_indicator(&self) -> Option<String> {
        self.settings
            .show_page_indicator
            .then(|| format!("{} / {}", self.current_page, self.total_pages))
    }

    pub fn page_spacing(&self) -> u32 {
        self.settings.distance_between_pages
    }

    /// On the last page with another chapter waiting.
    pub fn reached_end(&self) -> bool {
        self.total_pages > 0
            && self.current_page >= self.total_pages
            && self.has_next()
    }

    pub fn has_next(&self) -> bool {
        self.index + 1 < self.chapters.len()
    }

    pub fn has_previous(&self) -> bool {
        self.index > 0
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn current_chapter(&self) -> &FileEntry {
        &self.chapters[self.index]
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn total_pages(&self) -> u32 {
        self.total_pages
    }

    pub fn manga(&self) -> &MangaEntry {
        &self.manga
    }
}
