//! Discovered filesystem entries and output shapes.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use compact_str::CompactString;
use serde::{Deserialize, Serialize};

/// Type of filesystem object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file.
    File,
    /// Directory.
    Directory,
    /// Symbolic link that is not followed.
    Symlink,
    /// Other file types (sockets, devices, etc.).
    Other,
}

impl EntryKind {
    /// Derive the kind from a `std::fs::FileType`.
    pub fn from_file_type(file_type: std::fs::FileType) -> Self {
        if file_type.is_dir() {
            EntryKind::Directory
        } else if file_type.is_file() {
            EntryKind::File
        } else if file_type.is_symlink() {
            EntryKind::Symlink
        } else {
            EntryKind::Other
        }
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        matches!(self, EntryKind::Directory)
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        matches!(self, EntryKind::File)
    }

    /// Check if this is a symlink.
    pub fn is_symlink(&self) -> bool {
        matches!(self, EntryKind::Symlink)
    }
}

/// Filesystem metadata attached to an entry in stats mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStats {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time.
    pub modified: Option<SystemTime>,
    /// Last access time (if available).
    pub accessed: Option<SystemTime>,
    /// Creation time (if available, platform-dependent).
    pub created: Option<SystemTime>,
    /// Whether the entry is read-only.
    pub readonly: bool,
    /// Unix permission bits.
    pub mode: Option<u32>,
    /// Inode number.
    pub inode: Option<u64>,
    /// Device ID.
    pub device: Option<u64>,
    /// Number of hard links.
    pub nlink: Option<u64>,
}

impl EntryStats {
    /// Capture the interesting parts of `std::fs::Metadata`.
    pub fn from_metadata(metadata: &std::fs::Metadata) -> Self {
        Self {
            size: metadata.len(),
            modified: metadata.modified().ok(),
            accessed: metadata.accessed().ok(),
            created: metadata.created().ok(),
            readonly: metadata.permissions().readonly(),
            mode: get_mode(metadata),
            inode: get_ino(metadata),
            device: get_dev(metadata),
            nlink: get_nlink(metadata),
        }
    }
}

// Cross-platform metadata helpers

#[cfg(unix)]
fn get_mode(metadata: &std::fs::Metadata) -> Option<u32> {
    use std::os::unix::fs::PermissionsExt;
    Some(metadata.permissions().mode())
}

#[cfg(not(unix))]
fn get_mode(_metadata: &std::fs::Metadata) -> Option<u32> {
    None
}

#[cfg(unix)]
fn get_ino(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn get_ino(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

#[cfg(unix)]
fn get_dev(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.dev())
}

#[cfg(not(unix))]
fn get_dev(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

#[cfg(unix)]
fn get_nlink(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.nlink())
}

#[cfg(not(unix))]
fn get_nlink(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}

/// A discovered filesystem object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// File/directory name (not full path).
    pub name: CompactString,

    /// Path relative to the working directory, `/`-separated.
    pub path: PathBuf,

    /// Depth below the task base (1 = direct child).
    pub depth: usize,

    /// Entry type, after following links when links are followed.
    pub kind: EntryKind,

    /// Whether the path itself is a symbolic link.
    pub is_symlink: bool,

    /// Metadata, present in stats mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<EntryStats>,
}

impl Entry {
    /// Create an entry without metadata.
    pub fn new(path: impl Into<PathBuf>, depth: usize, kind: EntryKind, is_symlink: bool) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| CompactString::new(n.to_string_lossy()))
            .unwrap_or_else(|| CompactString::new(path.to_string_lossy()));

        Self {
            name,
            path,
            depth,
            kind,
            is_symlink,
            stats: None,
        }
    }

    /// Attach metadata.
    pub fn with_stats(mut self, stats: EntryStats) -> Self {
        self.stats = Some(stats);
        self
    }

    /// Check if this is a directory.
    pub fn is_dir(&self) -> bool {
        self.kind.is_dir()
    }

    /// Check if this is a regular file.
    pub fn is_file(&self) -> bool {
        self.kind.is_file()
    }

    /// Path as a `/`-separated string, the form matchers are tested against.
    pub fn path_str(&self) -> String {
        path_to_slash(&self.path)
    }
}

/// Render a path with `/` separators regardless of platform.
pub fn path_to_slash(path: &Path) -> String {
    let rendered = path.to_string_lossy();
    if std::path::MAIN_SEPARATOR == '/' {
        rendered.into_owned()
    } else {
        rendered.replace(std::path::MAIN_SEPARATOR, "/")
    }
}

/// One result of a resolve call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EntryItem {
    /// Plain path string (default output).
    Path(String),
    /// Detailed entry (object mode and stats mode).
    Entry(Entry),
}

impl EntryItem {
    /// The path of this item as emitted.
    pub fn path(&self) -> String {
        match self {
            EntryItem::Path(path) => path.clone(),
            EntryItem::Entry(entry) => entry.path_str(),
        }
    }

    /// Borrow the detailed entry, if any.
    pub fn as_entry(&self) -> Option<&Entry> {
        match self {
            EntryItem::Entry(entry) => Some(entry),
            EntryItem::Path(_) => None,
        }
    }
}

impl fmt::Display for EntryItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path())
    }
}
