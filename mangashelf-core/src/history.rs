//! Reading history and per-chapter progress tracking
//!
//! Tracks, per manga, which chapters were opened and where reading stopped
//! in the most recent one. This drives the "read" badges in chapter lists,
//! the "continue reading" shortcut and the recently-read overview.
//!
//! ## Persistence
//!
//! The whole history is one JSON document under [`HISTORY_KEY`]. It is
//! hydrated lazily on first access and rewritten in full after every
//! mutation. Writes are best-effort: a failed write is logged and the
//! in-memory mutation is kept, so memory and storage can diverge until the
//! next successful write.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use mangashelf_model::{HistoryLedger, MangaReadingHistory, ReadingProgress};
use tokio::sync::{Mutex, MutexGuard};

use crate::clock::Clock;
use crate::storage::KeyValueStore;

/// Storage key of the reading-history blob.
pub const HISTORY_KEY: &str = "mangaReadingHistory";

#[derive(Debug, Default)]
struct HistoryState {
    hydrated: bool,
    ledger: HistoryLedger,
}

/// Process-wide reading history, shared by explicit `Arc` passing.
pub struct ReadingHistoryStore {
    storage: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    state: Mutex<HistoryState>,
}

impl fmt::Debug for ReadingHistoryStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadingHistoryStore").finish_non_exhaustive()
    }
}

impl ReadingHistoryStore {
    pub fn new(storage: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            storage,
            clock,
            state: Mutex::new(HistoryState::default()),
        }
    }

    /// Locks the state, hydrating it from storage on first use.
    async fn state(&self) -> MutexGuard<'_, HistoryState> {
        let mut state = self.state.lock().await;
        if !state.hydrated {
            state.ledger = self.read_ledger().await;
            state.hydrated = true;
        }
        state
    }

    async fn read_ledger(&self) -> HistoryLedger {
        match self.storage.get(HISTORY_KEY).await {
            Ok(None) => HistoryLedger::new(),
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(ledger) => ledger,
                Err(e) => {
                    tracing::error!("Error parsing reading history: {}", e);
                    HistoryLedger::new()
                }
            },
            Err(e) => {
                tracing::error!("Error loading reading history: {}", e);
                HistoryLedger::new()
            }
        }
    }

    async fn persist(&self, ledger: &HistoryLedger) -> bool {
        let json = match serde_json::to_string(ledger) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Error serializing reading history: {}", e);
                return false;
            }
        };
        match self.storage.set(HISTORY_KEY, &json).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!("Error saving reading history: {}", e);
                false
            }
        }
    }

    /// Records the page position of a chapter and makes it the manga's
    /// last-read chapter.
    ///
    /// Called on every page change while a chapter is open. Creates the
    /// manga's history on first use; an existing title is kept.
    pub async fn update_chapter_progress(
        &self,
        manga_path: &Path,
        manga_title: &str,
        chapter_path: &Path,
        chapter_name: &str,
        current_page: u32,
        total_pages: u32,
    ) -> ReadingProgress {
        let now = self.clock.now_millis();
        let progress = ReadingProgress::new(
            chapter_path,
            chapter_name,
            current_page,
            total_pages,
            now,
        );

        let mut state = self.state().await;
        state
            .ledger
            .get_or_insert(manga_path, manga_title, now)
            .record(progress.clone());
        self.persist(&state.ledger).await;

        tracing::debug!(
            manga = %manga_path.display(),
            chapter = %chapter_path.display(),
            page = progress.current_page,
            total = progress.total_pages,
            "reading progress updated"
        );
        progress
    }

    /// Adds a chapter to an existing manga history's read set.
    ///
    /// No-op (returns false) if the manga has no history yet or the chapter
    /// is already marked; only an actual change is persisted.
    pub async fn mark_chapter_as_read(
        &self,
        manga_path: &Path,
        chapter_path: &Path,
    ) -> bool {
        let now = self.clock.now_millis();
        let mut state = self.state().await;
        let changed = match state.ledger.get_mut(manga_path) {
            Some(history) => history.mark_read(chapter_path, now),
            None => false,
        };
        if changed {
            self.persist(&state.ledger).await;
        }
        changed
    }

    pub async fn get_manga_history(
        &self,
        manga_path: &Path,
    ) -> Option<MangaReadingHistory> {
        self.state().await.ledger.get(manga_path).cloned()
    }

    pub async fn is_chapter_read(
        &self,
        manga_path: &Path,
        chapter_path: &Path,
    ) -> bool {
        self.state()
            .await
            .ledger
            .get(manga_path)
            .is_some_and(|h| h.has_read(chapter_path))
    }

    pub async fn get_last_read_chapter(
        &self,
        manga_path: &Path,
    ) -> Option<ReadingProgress> {
        self.state()
            .await
            .ledger
            .get(manga_path)
            .and_then(|h| h.last_read_chapter.clone())
    }

    /// Drops one manga's history. Returns whether a record existed.
    pub async fn clear_manga_history(&self, manga_path: &Path) -> bool {
        let mut state = self.state().await;
        let removed = state.ledger.remove(manga_path).is_some();
        self.persist(&state.ledger).await;
        removed
    }

    /// Empties the history and deletes its persisted document.
    ///
    /// Memory is cleared even if the delete fails; the return value reports
    /// whether storage was cleared too.
    pub async fn clear_all_history(&self) -> bool {
        let mut state = self.state.lock().await;
        state.ledger.clear();
        state.hydrated = true;
        match self.storage.remove(HISTORY_KEY).await {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("Error clearing reading history: {}", e);
                false
            }
        }
    }

    /// Every manga history, most recently accessed first.
    pub async fn get_recently_read_manga(&self) -> Vec<MangaReadingHistory> {
        self.state()
            .await
            .ledger
            .recent()
            .into_iter()
            .cloned()
            .collect()
    }

    /// Copy of the full in-memory history.
    pub async fn snapshot(&self) -> HistoryLedger {
        self.state().await.ledger.clone()
    }
}
