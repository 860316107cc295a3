use std::path::{Path, PathBuf};
use std::sync::Arc;

use quickglob_core::matcher::{self, Matcher, MatcherOptions};
use quickglob_core::{Entry, GlobError, Settings, Task};

use super::is_absolute_pattern;
use crate::unique::UniqueTracker;

/// Decides whether a yielded entry is emitted.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    cwd: PathBuf,
    only_files: bool,
    only_directories: bool,
    unique: bool,
    positive: Vec<Matcher>,
    /// Relative exclusions, tested against the cwd-relative path.
    negative: Vec<Matcher>,
    /// Absolute exclusions, tested against the absolute path.
    absolute_negative: Vec<Matcher>,
    tracker: Arc<UniqueTracker>,
}

impl EntryFilter {
    pub fn new(
        task: &Task,
        settings: &Settings,
        tracker: Arc<UniqueTracker>,
    ) -> Result<Self, GlobError> {
        let options = MatcherOptions::from(settings);
        let negative_options = MatcherOptions {
            dot: true,
            ..options
        };

        let (absolute, relative): (Vec<&String>, Vec<&String>) = task
            .negative
            .iter()
            .partition(|p| is_absolute_pattern(p));

        Ok(Self {
            cwd: settings.cwd.clone(),
            only_files: settings.only_files,
            only_directories: settings.only_directories,
            unique: settings.unique,
            positive: matcher::compile_many(&task.positive, &options)?,
            negative: matcher::compile_many(&relative, &negative_options)?,
            absolute_negative: matcher::compile_many(&absolute, &negative_options)?,
            tracker,
        })
    }

    /// Whether `entry`, whose path is relative to the working directory,
    /// should be emitted. Accepting an entry records it for de-duplication.
    pub fn accepts(&self, entry: &Entry) -> bool {
        if self.only_files && !entry.is_file() {
            return false;
        }

        if self.only_directories && !entry.is_dir() {
            return false;
        }

        let path = entry.path_str();
        if !is_match_with_dir(&path, entry.is_dir(), &self.positive) {
            return false;
        }

        if is_match_with_dir(&path, entry.is_dir(), &self.negative) {
            return false;
        }

        let absolute = self.cwd.join(&entry.path);
        if !self.absolute_negative.is_empty() && self.is_skipped_by_absolute(&absolute) {
            return false;
        }

        !self.unique || self.tracker.track(absolute)
    }

    fn is_skipped_by_absolute(&self, absolute: &Path) -> bool {
        let path = quickglob_core::path_to_slash(absolute);
        self.absolute_negative.iter().any(|m| m.is_match(&path))
    }
}

/// Directories are retried with a trailing `/`, so `dir/` and `dir/**`
/// patterns cover the directory itself.
fn is_match_with_dir(path: &str, is_dir: bool, matchers: &[Matcher]) -> bool {
    matcher::match_any(path, matchers)
        || (is_dir && matcher::match_any(&format!("{path}/"), matchers))
}
