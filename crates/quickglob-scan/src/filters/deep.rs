use std::path::PathBuf;

use quickglob_core::matcher::{self, Matcher, MatcherOptions};
use quickglob_core::pattern::{
    get_max_naive_patterns_depth, has_glob_star, is_affect_depth_of_reading_pattern,
};
use quickglob_core::{GlobError, Settings, Task, path_to_slash};

use super::{is_absolute_pattern, join_base};
use crate::walker::WalkEntry;

/// Decides whether the walker reads a directory.
///
/// Rejections only depend on the entry itself, so re-evaluating an entry
/// always gives the same answer.
#[derive(Debug, Clone)]
pub struct DeepFilter {
    cwd: PathBuf,
    base: String,
    deep: usize,
    base_name_match: bool,
    follow_symbolic_links: bool,
    /// `None` when some positive pattern contains `**`.
    max_pattern_depth: Option<usize>,
    /// Exclusions that cover whole subtrees.
    negative: Vec<Matcher>,
    /// Subtree exclusions written as absolute paths.
    absolute_negative: Vec<Matcher>,
}

impl DeepFilter {
    pub fn new(task: &Task, settings: &Settings) -> Result<Self, GlobError> {
        let max_pattern_depth = if task.positive.iter().any(|p| has_glob_star(p)) {
            None
        } else {
            Some(get_max_naive_patterns_depth(&task.positive))
        };

        let (absolute, relative): (Vec<&String>, Vec<&String>) = task
            .negative
            .iter()
            .filter(|p| is_affect_depth_of_reading_pattern(p))
            .partition(|p| is_absolute_pattern(p));
        let options = negative_options(settings);

        Ok(Self {
            cwd: settings.cwd.clone(),
            base: task.base.clone(),
            deep: settings.deep,
            base_name_match: settings.base_name_match,
            follow_symbolic_links: settings.follow_symbolic_links,
            max_pattern_depth,
            negative: matcher::compile_many(&relative, &options)?,
            absolute_negative: matcher::compile_many(&absolute, &options)?,
        })
    }

    /// Deepest level the walker needs to yield for this task.
    pub fn walk_depth(&self) -> usize {
        match self.max_pattern_depth {
            Some(max) if !self.base_name_match => self.deep.min(max.saturating_add(1)),
            _ => self.deep,
        }
    }

    /// Whether the children of `entry` should be read.
    pub fn should_descend(&self, entry: &WalkEntry) -> bool {
        let depth = entry.depth;

        if depth >= self.deep {
            return false;
        }

        if !self.base_name_match && self.max_pattern_depth.is_some_and(|max| depth > max) {
            return false;
        }

        if entry.is_symlink && !self.follow_symbolic_links {
            return false;
        }

        let path = join_base(&self.base, &path_to_slash(&entry.path));
        if is_skipped_by(&path, &self.negative) {
            return false;
        }

        self.absolute_negative.is_empty()
            || !is_skipped_by(&path_to_slash(&self.cwd.join(&path)), &self.absolute_negative)
    }
}

/// `dir/**` covers the directory itself, so the path is also tested with a
/// trailing separator.
fn is_skipped_by(path: &str, negative: &[Matcher]) -> bool {
    matcher::match_any(path, negative) || matcher::match_any(&format!("{path}/"), negative)
}

/// Exclusions see hidden entries regardless of the `dot` option.
fn negative_options(settings: &Settings) -> MatcherOptions {
    MatcherOptions {
        dot: true,
        ..MatcherOptions::from(settings)
    }
}
