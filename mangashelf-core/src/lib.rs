//! # Mangashelf Core
//!
//! Library scanning, reading history and viewer settings for a local manga
//! collection stored as folders of PDF chapters.
//!
//! ## Overview
//!
//! - **Library scanning**: find manga folders under a root, parse their
//!   `data.json` sidecar and list their chapters in natural order
//! - **Reading history**: per-manga record of visited chapters and the page
//!   reached in the most recent one
//! - **Viewer settings**: page indicator, page spacing and library folder,
//!   merged over platform defaults
//! - **Folder picker**: restricted directory browser for choosing the
//!   library folder
//!
//! ## Architecture
//!
//! All I/O goes through two ports so every component can run against
//! in-memory doubles:
//!
//! - [`fs::FileSystem`]: directory listing, existence checks, text reads
//! - [`storage::KeyValueStore`]: durable string records under fixed keys
//!
//! [`shelf::Shelf`] wires the stores and the scanner together and is the
//! usual entry point.
//!
//! ## Examples
//!
//! ```no_run
//! use mangashelf_core::{AppPaths, Shelf};
//!
//! async fn list_library() -> Result<(), Box<dyn std::error::Error>> {
//!     let shelf = Shelf::open(&AppPaths::resolve(None)?).await?;
//!     let scan = shelf.refresh_library(None).await?;
//!     for manga in &scan.manga {
//!         let summary = shelf.summary(manga).await;
//!         println!("{} {}", manga.title, summary.label());
//!     }
//!     Ok(())
//! }
//! ```

#![cfg_attr(docsrs, feature(doc_cfg))]
#![allow(missing_docs)]

pub mod clock;
pub mod collation;
pub mod error;
pub mod fs;
pub mod history;
pub mod library;
pub mod paths;
pub mod picker;
pub mod resume;
pub mod session;
pub mod settings;
pub mod shelf;
pub mod storage;

pub use clock::{Clock, ManualClock, SystemClock};
pub use collation::{Collation, natural_cmp};
pub use error::{Result, ShelfError};
pub use fs::{FileSystem, FsError, FsErrorKind, InMemoryFs, RealFs};
pub use history::{HISTORY_KEY, ReadingHistoryStore};
pub use library::{ChapterListing, LibraryIndex, LibraryScan, LibraryScanner};
pub use paths::{AppPaths, DATA_DIR_ENV, default_library_folder, storage_root};
pub use picker::FolderPicker;
pub use resume::{
    ChapterRow, MangaProgressSummary, ResumePoint, chapter_rows, resume_point,
};
pub use session::ReadingSession;
pub use settings::{SETTINGS_KEY, SettingsStore};
pub use shelf::Shelf;
pub use storage::{FileKvStore, KeyValueStore, MemoryKvStore, StorageError};

pub use mangashelf_model as model;
