//! Directory walking.
//!
//! The [`Walker`] trait is the seam between the filter pipeline and the code
//! that actually enumerates directories. [`JwalkWalker`] is the production
//! implementation; pruning is applied from jwalk's `process_read_dir` hook
//! so rejected directories are never read.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use jwalk::{DirEntry, Parallelism, WalkDir};

use quickglob_core::{EntryKind, EntryStats, GlobError};

/// A candidate produced by a walk, relative to the walk root.
#[derive(Debug, Clone)]
pub struct WalkEntry {
    /// Path relative to the walk root.
    pub path: PathBuf,
    /// Depth below the walk root (1 = direct child).
    pub depth: usize,
    /// Entry type, after following links when links are followed.
    pub kind: EntryKind,
    /// Whether the path itself is a symbolic link.
    pub is_symlink: bool,
    /// Metadata, when requested.
    pub stats: Option<EntryStats>,
}

/// Limits applied to one walk.
#[derive(Debug, Clone, Copy)]
pub struct WalkOptions {
    /// Entries deeper than this are never yielded.
    pub max_depth: usize,
    /// Descend into symlinked directories.
    pub follow_symbolic_links: bool,
    /// Collect metadata for every yielded entry.
    pub stats: bool,
    /// Report broken links as errors instead of yielding the link itself.
    pub throw_error_on_broken_symbolic_link: bool,
}

/// Decides whether a directory is read. Called before its children are
/// enumerated.
pub type DescendFn = Arc<dyn Fn(&WalkEntry) -> bool + Send + Sync>;

/// Receives every yielded entry or error. Returning `Break` ends the walk.
pub type VisitFn<'a> = dyn FnMut(Result<WalkEntry, GlobError>) -> ControlFlow<()> + 'a;

/// Something that can enumerate a directory tree.
pub trait Walker: Send + Sync {
    /// Walk `root`, skipping the root itself.
    fn walk(
        &self,
        root: &Path,
        options: &WalkOptions,
        should_descend: DescendFn,
        visit: &mut VisitFn<'_>,
    );
}

/// Parallel walker using jwalk.
#[derive(Debug, Clone, Default)]
pub struct JwalkWalker {
    threads: usize,
}

impl JwalkWalker {
    /// Create a walker on the default rayon pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a walker that reads directories on a dedicated pool of `threads`
    /// threads per walk (0 = default pool).
    pub fn with_threads(threads: usize) -> Self {
        Self { threads }
    }

    fn parallelism(&self) -> Parallelism {
        match self.threads {
            0 => Parallelism::RayonDefaultPool {
                busy_timeout: Duration::from_millis(100),
            },
            1 => Parallelism::Serial,
            n => Parallelism::RayonNewPool(n),
        }
    }
}

impl Walker for JwalkWalker {
    fn walk(
        &self,
        root: &Path,
        options: &WalkOptions,
        should_descend: DescendFn,
        visit: &mut VisitFn<'_>,
    ) {
        let prune_root: Arc<Path> = Arc::from(root);

        let walker = WalkDir::new(root)
            .parallelism(self.parallelism())
            .skip_hidden(false)
            .follow_links(options.follow_symbolic_links)
            .min_depth(1)
            .max_depth(options.max_depth)
            .process_read_dir(move |_depth, _path, _state, children| {
                for child in children.iter_mut().flatten() {
                    // The root is always read; only its descendants are pruned.
                    if child.depth() == 0 || child.read_children_path.is_none() {
                        continue;
                    }
                    let candidate = walk_entry(&prune_root, child);
                    if !should_descend(&candidate) {
                        child.read_children_path = None;
                    }
                }
            });

        for entry_result in walker {
            let result = match entry_result {
                Ok(entry) => {
                    let mut candidate = walk_entry(root, &entry);
                    if options.stats {
                        match read_stats(&entry.path(), options.follow_symbolic_links) {
                            Ok(stats) => {
                                candidate.stats = Some(stats);
                                Ok(candidate)
                            }
                            Err(err) => Err(err),
                        }
                    } else {
                        Ok(candidate)
                    }
                }
                Err(err) => broken_link(root, &err, options)
                    .unwrap_or_else(|| Err(convert_error(err))),
            };

            if visit(result).is_break() {
                break;
            }
        }
    }
}

fn walk_entry(root: &Path, entry: &DirEntry<((), ())>) -> WalkEntry {
    let path = entry.path();
    let relative = path
        .strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| PathBuf::from(entry.file_name()));

    WalkEntry {
        path: relative,
        depth: entry.depth(),
        kind: EntryKind::from_file_type(entry.file_type()),
        is_symlink: entry.path_is_symlink(),
        stats: None,
    }
}

/// Read metadata for `path`, through the link when links are followed.
pub(crate) fn read_stats(path: &Path, follow: bool) -> Result<EntryStats, GlobError> {
    let metadata = if follow {
        std::fs::metadata(path)
    } else {
        std::fs::symlink_metadata(path)
    };
    metadata
        .map(|m| EntryStats::from_metadata(&m))
        .map_err(|e| GlobError::io(path, e))
}

/// jwalk reports a link it cannot follow as a not-found error. Unless that
/// is wanted, yield the link itself, as a static lookup would.
fn broken_link(
    root: &Path,
    err: &jwalk::Error,
    options: &WalkOptions,
) -> Option<Result<WalkEntry, GlobError>> {
    if !options.follow_symbolic_links || options.throw_error_on_broken_symbolic_link {
        return None;
    }
    if err.io_error()?.kind() != std::io::ErrorKind::NotFound {
        return None;
    }

    let path = err.path()?;
    let lstat = std::fs::symlink_metadata(path).ok()?;
    if !lstat.file_type().is_symlink() {
        return None;
    }

    let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
    Some(Ok(WalkEntry {
        path: relative,
        depth: err.depth(),
        kind: EntryKind::Symlink,
        is_symlink: true,
        stats: options.stats.then(|| EntryStats::from_metadata(&lstat)),
    }))
}

fn convert_error(err: jwalk::Error) -> GlobError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();

    if err.loop_ancestor().is_some() {
        return GlobError::Loop { path };
    }

    match err.io_error() {
        Some(io) => GlobError::io(path, std::io::Error::new(io.kind(), io.to_string())),
        None => GlobError::io(path, std::io::Error::other(err.to_string())),
    }
}
