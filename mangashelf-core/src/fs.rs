use async_trait::async_trait;
use mangashelf_model::{FileEntry, FileKind};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Minimal, async-capable filesystem abstraction used by the scanner and
/// the folder picker.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// List the immediate children of a directory.
    async fn list_dir(&self, path: &Path) -> Result<Vec<FileEntry>, FsError>;

    /// Check whether a path exists. Access errors read as "absent".
    async fn exists(&self, path: &Path) -> bool;

    /// Read a whole file as UTF-8 text.
    async fn read_to_string(&self, path: &Path) -> Result<String, FsError>;

    /// Create a directory and its parents; existing directories are fine.
    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsErrorKind {
    PermissionDenied,
    NotFound,
    NotADirectory,
    Other,
}

/// Filesystem failure tagged with the offending path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsError {
    pub kind: FsErrorKind,
    pub path: PathBuf,
    pub message: String,
}

impl FsError {
    pub fn new(
        kind: FsErrorKind,
        path: impl Into<PathBuf>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            path: path.into(),
            message: message.into(),
        }
    }

    fn from_io(path: &Path, op: &str, err: std::io::Error) -> Self {
        let kind = match err.kind() {
            std::io::ErrorKind::PermissionDenied => {
                FsErrorKind::PermissionDenied
            }
            std::io::ErrorKind::NotFound => FsErrorKind::NotFound,
            std::io::ErrorKind::NotADirectory => FsErrorKind::NotADirectory,
            _ => FsErrorKind::Other,
        };
        Self::new(kind, path, format!("{op} failed: {err}"))
    }
}

impl fmt::Display for FsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.path.display())
    }
}

impl std::error::Error for FsError {}

/// Real filesystem implementation backed by tokio::fs.
#[derive(Debug, Default, Clone, Copy)]
pub struct RealFs;

impl RealFs {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl FileSystem for RealFs {
    async fn list_dir(&self, path: &Path) -> Result<Vec<FileEntry>, FsError> {
        let mut rd = tokio::fs::read_dir(path)
            .await
            .map_err(|e| FsError::from_io(path, "read_dir", e))?;

        let mut entries = Vec::new();
        loop {
            let entry = match rd.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => return Err(FsError::from_io(path, "next_entry", e)),
            };
            let child = entry.path();
            // Follows symlinks; dangling links are dropped from the listing.
            let md = match tokio::fs::metadata(&child).await {
                Ok(md) => md,
                Err(e) => {
                    tracing::debug!(
                        "skipping unreadable entry {}: {}",
                        child.display(),
                        e
                    );
                    continue;
                }
            };
            let kind = if md.is_dir() {
                FileKind::Directory
            } else if md.is_file() {
                FileKind::File
            } else {
                continue;
            };
            let mut record = match kind {
                FileKind::Directory => FileEntry::directory(child),
                FileKind::File => FileEntry::file(child, md.len()),
            };
            record.name = entry.file_name().to_string_lossy().into_owned();
            entries.push(record.with_modified(md.modified().ok()));
        }
        Ok(entries)
    }

    async fn exists(&self, path: &Path) -> bool {
        // try_exists avoids errors for permission issues by returning false
        tokio::fs::try_exists(path).await.unwrap_or(false)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        tokio::fs::read_to_string(path)
            .await
            .map_err(|e| FsError::from_io(path, "read", e))
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        tokio::fs::create_dir_all(path)
            .await
            .map_err(|e| FsError::from_io(path, "create_dir_all", e))
    }
}

/// In-memory filesystem for tests.
///
/// Clones share state, so a test can keep a handle and mutate the tree
/// after handing a clone to the code under test. Paths are treated
/// literally; callers should use consistent absolute paths.
#[derive(Debug, Default, Clone)]
pub struct InMemoryFs {
    inner: Arc<Mutex<InMemoryTree>>,
}

#[derive(Debug, Default)]
struct InMemoryTree {
    nodes: HashMap<PathBuf, Node>,
    denied: HashSet<PathBuf>,
    list_calls: HashMap<PathBuf, usize>,
}

#[derive(Debug, Clone)]
enum Node {
    Dir { children: Vec<PathBuf> },
    File { contents: String },
}

impl InMemoryFs {
    pub fn new() -> Self {
        Self::default()
    }

    fn tree(&self) -> MutexGuard<'_, InMemoryTree> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn add_dir<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        let mut tree = self.tree();
        if tree.nodes.contains_key(&path) {
            return;
        }
        tree.ensure_parent_link(&path);
        tree.nodes.insert(
            path,
            Node::Dir {
                children: Vec::new(),
            },
        );
    }

    pub fn add_file<P: Into<PathBuf>>(
        &self,
        path: P,
        contents: impl Into<String>,
    ) {
        let path = path.into();
        let mut tree = self.tree();
        tree.ensure_parent_link(&path);
        tree.nodes.insert(
            path,
            Node::File {
                contents: contents.into(),
            },
        );
    }

    pub fn remove<P: AsRef<Path>>(&self, path: P) {
        let path = path.as_ref();
        let mut tree = self.tree();
        tree.nodes.remove(path);
        if let Some(parent) = path.parent()
            && let Some(Node::Dir { children }) = tree.nodes.get_mut(parent)
        {
            children.retain(|c| c != path);
        }
    }

    /// Makes every operation on `path` fail with a permission error.
    pub fn deny<P: Into<PathBuf>>(&self, path: P) {
        self.tree().denied.insert(path.into());
    }

    /// Number of `list_dir` calls made against `path` so far.
    pub fn list_calls<P: AsRef<Path>>(&self, path: P) -> usize {
        self.tree()
            .list_calls
            .get(path.as_ref())
            .copied()
            .unwrap_or(0)
    }
}

impl InMemoryTree {
    fn ensure_parent_link(&mut self, path: &Path) {
        if let Some(parent) = path.parent() {
            // Ensure parent directory exists
            if !self.nodes.contains_key(parent) {
                self.nodes.insert(
                    parent.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                // Recurse to ensure its parent exists
                self.ensure_parent_link(parent);
            }
            // Link child into parent
            if let Some(Node::Dir { children }) = self.nodes.get_mut(parent)
                && !children.iter().any(|p| p.as_path() == path)
            {
                children.push(path.to_path_buf());
            }
        }
    }

    fn check_access(&self, path: &Path) -> Result<(), FsError> {
        if self.denied.contains(path) {
            return Err(FsError::new(
                FsErrorKind::PermissionDenied,
                path,
                "access denied",
            ));
        }
        Ok(())
    }

    fn entry_for(&self, path: &Path) -> Option<FileEntry> {
        match self.nodes.get(path)? {
            Node::Dir { .. } => Some(FileEntry::directory(path)),
            Node::File { contents } => {
                Some(FileEntry::file(path, contents.len() as u64))
            }
        }
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn list_dir(&self, path: &Path) -> Result<Vec<FileEntry>, FsError> {
        let mut tree = self.tree();
        *tree.list_calls.entry(path.to_path_buf()).or_insert(0) += 1;
        tree.check_access(path)?;
        match tree.nodes.get(path) {
            Some(Node::Dir { children }) => Ok(children
                .iter()
                .filter_map(|child| tree.entry_for(child))
                .collect()),
            Some(Node::File { .. }) => Err(FsError::new(
                FsErrorKind::NotADirectory,
                path,
                "read_dir on file",
            )),
            None => Err(FsError::new(
                FsErrorKind::NotFound,
                path,
                "read_dir on missing path",
            )),
        }
    }

    async fn exists(&self, path: &Path) -> bool {
        let tree = self.tree();
        tree.check_access(path).is_ok() && tree.nodes.contains_key(path)
    }

    async fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let tree = self.tree();
        tree.check_access(path)?;
        match tree.nodes.get(path) {
            Some(Node::File { contents }) => Ok(contents.clone()),
            Some(Node::Dir { .. }) => Err(FsError::new(
                FsErrorKind::Other,
                path,
                "read on directory",
            )),
            None => Err(FsError::new(
                FsErrorKind::NotFound,
                path,
                "read on missing path",
            )),
        }
    }

    async fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut tree = self.tree();
        tree.check_access(path)?;
        match tree.nodes.get(path) {
            Some(Node::Dir { .. }) => Ok(()),
            Some(Node::File { .. }) => Err(FsError::new(
                FsErrorKind::Other,
                path,
                "file exists at directory path",
            )),
            None => {
                tree.ensure_parent_link(path);
                tree.nodes.insert(
                    path.to_path_buf(),
                    Node::Dir {
                        children: Vec::new(),
                    },
                );
                Ok(())
            }
        }
    }
}
