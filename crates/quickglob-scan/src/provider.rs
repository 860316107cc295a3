//! Task execution shared by every mode.
//!
//! [`prepare`] compiles the filters of every task up front so invalid
//! patterns are reported before any directory is read. [`run_task`] then
//! resolves one task, pushing accepted entries into a sink.

use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use quickglob_core::{
    Entry, EntryItem, EntryKind, EntryStats, GlobError, Settings, Task, path_to_slash,
};

use crate::filters::{DeepFilter, EntryFilter, ErrorFilter, join_base};
use crate::transform::EntryTransformer;
use crate::unique::UniqueTracker;
use crate::walker::{DescendFn, WalkEntry, WalkOptions, Walker};

/// Receives accepted entries. Returning `Break` stops the task.
pub type Sink<'a> = dyn FnMut(EntryItem) -> ControlFlow<()> + 'a;

/// A task with its filters compiled.
#[derive(Debug, Clone)]
pub struct PreparedTask {
    pub task: Task,
    deep: Arc<DeepFilter>,
    entry: EntryFilter,
}

/// Everything a task needs besides its own filters.
///
/// Shared by every task of one call. Cancelling [`cancellation`] stops
/// running walks at their next entry and prunes what they have not read.
///
/// [`cancellation`]: ProviderContext::cancellation
pub struct ProviderContext {
    settings: Settings,
    walker: Arc<dyn Walker>,
    errors: ErrorFilter,
    transformer: EntryTransformer,
    cancel: CancellationToken,
}

impl ProviderContext {
    pub fn new(settings: Settings, walker: Arc<dyn Walker>) -> Self {
        Self {
            errors: ErrorFilter::new(&settings),
            transformer: EntryTransformer::new(&settings),
            settings,
            walker,
            cancel: CancellationToken::new(),
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Swallow a non-fatal error, hand back a fatal one.
    fn recover(&self, error: GlobError) -> Result<(), GlobError> {
        if self.errors.is_non_fatal(&error) {
            debug!(error = %error, "skipping non-fatal error");
            Ok(())
        } else {
            Err(error)
        }
    }
}

/// Compile the filters of every task. All tasks share `tracker`.
pub fn prepare(
    tasks: Vec<Task>,
    settings: &Settings,
    tracker: &Arc<UniqueTracker>,
) -> Result<Vec<PreparedTask>, GlobError> {
    tasks
        .into_iter()
        .map(|task| {
            let deep = Arc::new(DeepFilter::new(&task, settings)?);
            let entry = EntryFilter::new(&task, settings, Arc::clone(tracker))?;
            Ok(PreparedTask { task, deep, entry })
        })
        .collect()
}

/// Resolve one task.
///
/// Non-fatal errors are logged and skipped; the first fatal error ends the
/// task and is returned.
pub fn run_task(
    prepared: &PreparedTask,
    ctx: &ProviderContext,
    sink: &mut Sink<'_>,
) -> Result<(), GlobError> {
    trace!(
        base = %prepared.task.base,
        dynamic = prepared.task.dynamic,
        patterns = prepared.task.patterns.len(),
        "running task"
    );

    if prepared.task.dynamic {
        read_dynamic(prepared, ctx, sink)
    } else {
        read_static(prepared, ctx, sink)
    }
}

fn task_root(settings: &Settings, base: &str) -> PathBuf {
    if base == "." {
        settings.cwd.clone()
    } else {
        settings.cwd.join(base)
    }
}

fn read_dynamic(
    prepared: &PreparedTask,
    ctx: &ProviderContext,
    sink: &mut Sink<'_>,
) -> Result<(), GlobError> {
    let task = &prepared.task;
    let root = task_root(&ctx.settings, &task.base);

    match std::fs::metadata(&root) {
        Ok(metadata) if metadata.is_dir() => {}
        Ok(_) => return Ok(()),
        Err(err) => return ctx.recover(GlobError::io(&root, err)),
    }

    let options = WalkOptions {
        max_depth: prepared.deep.walk_depth(),
        follow_symbolic_links: ctx.settings.follow_symbolic_links,
        stats: ctx.settings.stats,
        throw_error_on_broken_symbolic_link: ctx.settings.throw_error_on_broken_symbolic_link,
    };
    let deep = Arc::clone(&prepared.deep);
    let cancel = ctx.cancel.clone();
    let should_descend: DescendFn = Arc::new(move |entry: &WalkEntry| {
        !cancel.is_cancelled() && deep.should_descend(entry)
    });

    let mut outcome = Ok(());
    let mut emitted = 0usize;

    ctx.walker
        .walk(&root, &options, should_descend, &mut |result| match result {
            _ if ctx.cancel.is_cancelled() => ControlFlow::Break(()),
            Ok(walked) => {
                let entry = into_entry(&task.base, walked);
                if !prepared.entry.accepts(&entry) {
                    return ControlFlow::Continue(());
                }
                emitted += 1;
                sink(ctx.transformer.transform(entry))
            }
            Err(err) => match ctx.recover(err) {
                Ok(()) => ControlFlow::Continue(()),
                Err(fatal) => {
                    outcome = Err(fatal);
                    ControlFlow::Break(())
                }
            },
        });

    debug!(root = %root.display(), emitted, "walk finished");
    outcome
}

fn into_entry(base: &str, walked: WalkEntry) -> Entry {
    let path = join_base(base, &path_to_slash(&walked.path));
    let entry = Entry::new(path, walked.depth, walked.kind, walked.is_symlink);
    match walked.stats {
        Some(stats) => entry.with_stats(stats),
        None => entry,
    }
}

fn read_static(
    prepared: &PreparedTask,
    ctx: &ProviderContext,
    sink: &mut Sink<'_>,
) -> Result<(), GlobError> {
    let task = &prepared.task;

    for pattern in &task.positive {
        if ctx.cancel.is_cancelled() {
            break;
        }

        let path = ctx.settings.cwd.join(pattern);
        let (metadata, is_symlink) = match stat_static(&path, &ctx.settings) {
            Ok(found) => found,
            Err(err) => {
                ctx.recover(err)?;
                continue;
            }
        };

        let kind = EntryKind::from_file_type(metadata.file_type());
        let depth = static_depth(&task.base, pattern);
        let mut entry = Entry::new(pattern.as_str(), depth, kind, is_symlink);
        if ctx.settings.stats {
            entry = entry.with_stats(EntryStats::from_metadata(&metadata));
        }

        if prepared.entry.accepts(&entry) && sink(ctx.transformer.transform(entry)).is_break() {
            break;
        }
    }

    Ok(())
}

/// lstat first; stat through the link when links are followed. A broken
/// link falls back to the link itself unless that is configured as an
/// error.
fn stat_static(
    path: &Path,
    settings: &Settings,
) -> Result<(std::fs::Metadata, bool), GlobError> {
    let lstat = std::fs::symlink_metadata(path).map_err(|e| GlobError::io(path, e))?;
    let is_symlink = lstat.file_type().is_symlink();

    if !is_symlink || !settings.follow_symbolic_links {
        return Ok((lstat, is_symlink));
    }

    match std::fs::metadata(path) {
        Ok(stat) => Ok((stat, true)),
        Err(err) if settings.throw_error_on_broken_symbolic_link => Err(GlobError::io(path, err)),
        Err(_) => Ok((lstat, true)),
    }
}

fn static_depth(base: &str, pattern: &str) -> usize {
    let segments = |p: &str| {
        p.trim_end_matches('/')
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .count()
    };
    segments(pattern).saturating_sub(segments(base))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walker::JwalkWalker;
    use std::fs;
    use tempfile::TempDir;

    fn fixture() -> TempDir {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("src/nested")).unwrap();
        fs::write(root.join("src/lib.rs"), "").unwrap();
        fs::write(root.join("src/nested/mod.rs"), "").unwrap();
        fs::write(root.join("README.md"), "").unwrap();
        temp
    }

    fn run(settings: Settings, task: Task) -> Result<Vec<String>, GlobError> {
        let tracker = Arc::new(UniqueTracker::new());
        let prepared = prepare(vec![task], &settings, &tracker)?;
        let ctx = ProviderContext::new(settings, Arc::new(JwalkWalker::new()));

        let mut paths = Vec::new();
        run_task(&prepared[0], &ctx, &mut |item| {
            paths.push(item.path());
            ControlFlow::Continue(())
        })?;
        paths.sort();
        Ok(paths)
    }

    #[test]
    fn test_dynamic_task() {
        let temp = fixture();
        let task = Task::builder().base("src").positive("src/**/*.rs").build();

        let paths = run(Settings::new(temp.path()), task).unwrap();
        assert_eq!(paths, vec!["src/lib.rs", "src/nested/mod.rs"]);
    }

    #[test]
    fn test_static_task() {
        let temp = fixture();
        let task = Task::builder()
            .dynamic(false)
            .positive("README.md")
            .positive("missing.md")
            .build();

        let paths = run(Settings::new(temp.path()), task).unwrap();
        assert_eq!(paths, vec!["README.md"]);
    }

    #[test]
    fn test_missing_base_is_empty() {
        let temp = fixture();
        let task = Task::builder().base("nope").positive("nope/*.rs").build();

        let paths = run(Settings::new(temp.path()), task).unwrap();
        assert!(paths.is_empty());
    }

    #[test]
    fn test_sink_break_stops_task() {
        let temp = fixture();
        let settings = Settings::new(temp.path());
        let tracker = Arc::new(UniqueTracker::new());
        let task = Task::builder().positive("**").build();
        let prepared = prepare(vec![task], &settings, &tracker).unwrap();
        let ctx = ProviderContext::new(settings, Arc::new(JwalkWalker::new()));

        let mut seen = 0;
        run_task(&prepared[0], &ctx, &mut |_| {
            seen += 1;
            ControlFlow::Break(())
        })
        .unwrap();
        assert_eq!(seen, 1);
    }

    /// Offers `count` directories and records how many were visited or
    /// would have been read.
    struct CountingWalker {
        count: usize,
        visited: std::sync::atomic::AtomicUsize,
        descended: std::sync::atomic::AtomicUsize,
    }

    impl Walker for CountingWalker {
        fn walk(
            &self,
            _root: &Path,
            _options: &WalkOptions,
            should_descend: DescendFn,
            visit: &mut crate::walker::VisitFn<'_>,
        ) {
            use std::sync::atomic::Ordering;

            for i in 0..self.count {
                let entry = WalkEntry {
                    path: PathBuf::from(format!("dir{i}")),
                    depth: 1,
                    kind: EntryKind::Directory,
                    is_symlink: false,
                    stats: None,
                };
                if should_descend(&entry) {
                    self.descended.fetch_add(1, Ordering::SeqCst);
                }
                self.visited.fetch_add(1, Ordering::SeqCst);
                if visit(Ok(entry)).is_break() {
                    break;
                }
            }
        }
    }

    #[test]
    fn test_cancelled_walk_stops_without_accepted_entries() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let temp = fixture();
        let settings = Settings::new(temp.path());
        let tracker = Arc::new(UniqueTracker::new());
        let task = Task::builder().positive("**/*.rs").build();
        let prepared = prepare(vec![task], &settings, &tracker).unwrap();

        let walker = Arc::new(CountingWalker {
            count: 50,
            visited: AtomicUsize::new(0),
            descended: AtomicUsize::new(0),
        });
        let ctx = ProviderContext::new(settings, Arc::clone(&walker) as Arc<dyn Walker>);
        ctx.cancellation().cancel();

        run_task(&prepared[0], &ctx, &mut |_| ControlFlow::Continue(())).unwrap();
        assert_eq!(walker.visited.load(Ordering::SeqCst), 1);
        assert_eq!(walker.descended.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancelled_static_task_emits_nothing() {
        let temp = fixture();
        let settings = Settings::new(temp.path());
        let tracker = Arc::new(UniqueTracker::new());
        let task = Task::builder().dynamic(false).positive("README.md").build();
        let prepared = prepare(vec![task], &settings, &tracker).unwrap();
        let ctx = ProviderContext::new(settings, Arc::new(JwalkWalker::new()));
        ctx.cancellation().cancel();

        let mut seen = 0;
        run_task(&prepared[0], &ctx, &mut |_| {
            seen += 1;
            ControlFlow::Continue(())
        })
        .unwrap();
        assert_eq!(seen, 0);
    }

    #[test]
    fn test_invalid_pattern_fails_prepare() {
        let settings = Settings::new("/tmp");
        let tracker = Arc::new(UniqueTracker::new());
        let task = Task::builder().positive("a/*[b").build();
        let err = prepare(vec![task], &settings, &tracker).unwrap_err();
        assert!(matches!(err, GlobError::InvalidPattern { .. }));
    }

    #[test]
    fn test_static_depth() {
        assert_eq!(static_depth(".", "file.txt"), 1);
        assert_eq!(static_depth("a/b", "a/b/file.txt"), 1);
        assert_eq!(static_depth(".", "./file.txt"), 1);
    }
}
