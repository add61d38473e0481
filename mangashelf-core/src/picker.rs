//! Directory browser used to choose the default library folder.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use mangashelf_model::FileEntry;

use crate::collation::{Collation, sort_entries_by_name};
use crate::error::{Result, ShelfError};
use crate::fs::FileSystem;

/// Read-only folder browser with a back stack.
///
/// Navigation never goes above `root`. A move only takes effect once the
/// target folder has been listed, so a failed move leaves the picker where
/// it was.
pub struct FolderPicker {
    fs: Arc<dyn FileSystem>,
    root: PathBuf,
    current: PathBuf,
    history: Vec<PathBuf>,
    entries: Vec<FileEntry>,
}

impl fmt::Debug for FolderPicker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FolderPicker")
            .field("root", &self.root)
            .field("current", &self.current)
            .field("history", &self.history)
            .field("entries", &self.entries.len())
            .finish_non_exhaustive()
    }
}

impl FolderPicker {
    /// Opens the picker on `start`, creating the folder first if needed.
    pub async fn open(
        fs: Arc<dyn FileSystem>,
        root: impl Into<PathBuf>,
        start: impl Into<PathBuf>,
    ) -> Result<Self> {
        let start = start.into();
        if let Err(e) = fs.create_dir_all(&start).await {
            tracing::debug!("could not create {}: {}", start.display(), e);
        }
        let entries = list_folders(fs.as_ref(), &start).await?;
        Ok(Self {
            fs,
            root: root.into(),
            current: start,
            history: Vec::new(),
            entries,
        })
    }

    pub fn current(&self) -> &Path {
        &self.current
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Subfolders of the current folder in natural order.
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn can_go_back(&self) -> bool {
        !self.history.is_empty() || self.parent().is_some()
    }

    pub fn can_go_up(&self) -> bool {
        self.parent().is_some()
    }

    /// Parent of the current folder, unless that would leave `root`.
    fn parent(&self) -> Option<PathBuf> {
        if self.current == self.root || !self.current.starts_with(&self.root) {
            return None;
        }
        self.current.parent().map(Path::to_path_buf)
    }

    async fn move_to(&mut self, target: PathBuf) -> Result<()> {
        self.entries = list_folders(self.fs.as_ref(), &target).await?;
        self.current = target;
        Ok(())
    }

    /// Descends into `child`, which must be one of [`Self::entries`].
    pub async fn enter(&mut self, child: &Path) -> Result<()> {
        if !self.entries.iter().any(|e| e.path == child) {
            return Err(ShelfError::InvalidArgument(format!(
                "{} is not a subfolder of {}",
                child.display(),
                self.current.display()
            )));
        }
        let previous = self.current.clone();
        self.move_to(child.to_path_buf()).await?;
        self.history.push(previous);
        Ok(())
    }

    /// Moves to the parent folder. Returns false at the root.
    pub async fn up(&mut self) -> Result<bool> {
        let Some(parent) = self.parent() else {
            return Ok(false);
        };
        let previous = self.current.clone();
        self.move_to(parent).await?;
        self.history.push(previous);
        Ok(true)
    }

    /// Returns to the previously visited folder, or to the parent when
    /// there is no history. Returns false when neither is possible.
    pub async fn back(&mut self) -> Result<bool> {
        if let Some(previous) = self.history.last().cloned() {
            self.move_to(previous).await?;
            self.history.pop();
            return Ok(true);
        }
        match self.parent() {
            Some(parent) => {
                self.move_to(parent).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Re-reads the current folder.
    pub async fn refresh(&mut self) -> Result<()> {
        self.entries = list_folders(self.fs.as_ref(), &self.current).await?;
        Ok(())
    }

    /// The folder the user settled on.
    pub fn confirm(self) -> PathBuf {
        self.current
    }
}

async fn list_folders(
    fs: &dyn FileSystem,
    path: &Path,
) -> Result<Vec<FileEntry>> {
    let mut folders: Vec<FileEntry> = fs
        .list_dir(path)
        .await?
        .into_iter()
        .filter(FileEntry::is_dir)
        .collect();
    sort_entries_by_name(&mut folders, Collation::Title);
    tracing::debug!(
        "Scanned {}: found {} folders",
        path.display(),
        folders.len()
    );
    Ok(folders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::InMemoryFs;

    fn tree() -> InMemoryFs {
        let fs = InMemoryFs::new();
        fs.add_dir("/storage/lib/Vol 10");
        fs.add_dir("/storage/lib/Vol 2");
        fs.add_dir("/storage/lib/Vol 2/extras");
        fs.add_file("/storage/lib/readme.txt", "x");
        fs.add_dir("/storage/other");
        fs
    }

    async fn picker(fs: &InMemoryFs, start: &str) -> FolderPicker {
        FolderPicker::open(Arc::new(fs.clone()), "/storage", start)
            .await
            .expect("open picker")
    }

    fn names(picker: &FolderPicker) -> Vec<&str> {
        picker.entries().iter().map(|e| e.name.as_str()).collect()
    }

    #[tokio::test]
    async fn lists_only_directories_in_natural_order() {
        let fs = tree();
        let picker = picker(&fs, "/storage/lib").await;
        assert_eq!(names(&picker), vec!["Vol 2", "Vol 10"]);
    }

    #[tokio::test]
    async fn vietnamese_folder_names_sort_alphabetically() {
        let fs = InMemoryFs::new();
        fs.add_dir("/storage/Truyện");
        fs.add_dir("/storage/Ảnh");
        fs.add_dir("/storage/Tải về");
        fs.add_dir("/storage/Music");
        let picker = picker(&fs, "/storage").await;
        assert_eq!(names(&picker), vec!["Ảnh", "Music", "Tải về", "Truyện"]);
    }

    #[tokio::test]
    async fn open_creates_missing_start_folder() {
        let fs = tree();
        let picker = picker(&fs, "/storage/new/TruyenPDF").await;
        assert!(picker.entries().is_empty());
        assert!(fs.exists(Path::new("/storage/new/TruyenPDF")).await);
    }

    #[tokio::test]
    async fn back_returns_to_where_the_user_came_from() {
        let fs = tree();
        let mut picker = picker(&fs, "/storage/lib").await;

        picker.enter(Path::new("/storage/lib/Vol 2")).await.unwrap();
        picker
            .enter(Path::new("/storage/lib/Vol 2/extras"))
            .await
            .unwrap();
        assert!(picker.up().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage/lib/Vol 2"));

        // Back undoes the "up", not just another step towards the root.
        assert!(picker.back().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage/lib/Vol 2/extras"));
        assert!(picker.back().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage/lib/Vol 2"));
        assert!(picker.back().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage/lib"));
    }

    #[tokio::test]
    async fn back_without_history_goes_to_parent() {
        let fs = tree();
        let mut picker = picker(&fs, "/storage/lib").await;
        assert!(picker.back().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage"));
        assert_eq!(names(&picker), vec!["lib", "other"]);
    }

    #[tokio::test]
    async fn navigation_stops_at_root() {
        let fs = tree();
        let mut picker = picker(&fs, "/storage").await;
        assert!(!picker.can_go_up());
        assert!(!picker.can_go_back());
        assert!(!picker.up().await.unwrap());
        assert!(!picker.back().await.unwrap());
        assert_eq!(picker.current(), Path::new("/storage"));
    }

    #[tokio::test]
    async fn failed_move_keeps_position() {
        let fs = tree();
        fs.deny("/storage/lib/Vol 10");
        let mut picker = picker(&fs, "/storage/lib").await;

        let err = picker
            .enter(Path::new("/storage/lib/Vol 10"))
            .await
            .unwrap_err();
        assert!(err.is_permission());
        assert_eq!(picker.current(), Path::new("/storage/lib"));
        assert_eq!(names(&picker), vec!["Vol 2", "Vol 10"]);
    }

    #[tokio::test]
    async fn enter_rejects_unlisted_paths() {
        let fs = tree();
        let mut picker = picker(&fs, "/storage/lib").await;
        assert!(picker.enter(Path::new("/storage/other")).await.is_err());
    }

    #[tokio::test]
    async fn refresh_and_confirm() {
        let fs = tree();
        let mut picker = picker(&fs, "/storage/lib").await;
        fs.add_dir("/storage/lib/Vol 3");
        picker.refresh().await.unwrap();
        assert_eq!(names(&picker), vec!["Vol 2", "Vol 3", "Vol 10"]);
        assert_eq!(picker.confirm(), PathBuf::from("/storage/lib"));
    }
}
