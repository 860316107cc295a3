//! Task construction.
//!
//! A [`Task`] is one independent traversal: a base directory plus every
//! positive pattern rooted there and the full exclusion list. Patterns that
//! share a base directory share a task, so the number of directory walks
//! grows with the number of distinct roots rather than the number of
//! patterns. This is sound because a walk from a base yields a superset of
//! the candidates for every pattern rooted at that base, and the entry
//! filter tests each pattern's matcher independently.

use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::pattern::{
    Pattern, PatternOptions, convert_to_negative_pattern, convert_to_positive_pattern,
    get_base_directory, get_negative_patterns, get_positive_patterns, is_dynamic_pattern,
};
use crate::settings::Settings;

/// A unit of independent traversal work.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Directory the traversal starts from, `"."` for the working directory.
    pub base: String,
    /// Whether any positive pattern needs a matcher.
    pub dynamic: bool,
    /// Positive patterns followed by the exclusions in `!` form.
    pub patterns: Vec<Pattern>,
    /// Positive patterns rooted at `base`.
    pub positive: Vec<Pattern>,
    /// Exclusions, in positive form.
    pub negative: Vec<Pattern>,
}

impl Task {
    /// Start building a task by hand.
    pub fn builder() -> TaskBuilder {
        TaskBuilder::default()
    }

    /// Whether the task is resolved by existence checks instead of a walk.
    pub fn is_static(&self) -> bool {
        !self.dynamic
    }
}

/// Incremental construction of a [`Task`], mostly for tests and tooling.
#[derive(Debug, Clone)]
pub struct TaskBuilder {
    base: String,
    dynamic: bool,
    positive: Vec<Pattern>,
    negative: Vec<Pattern>,
}

impl Default for TaskBuilder {
    fn default() -> Self {
        Self {
            base: ".".to_string(),
            dynamic: true,
            positive: Vec::new(),
            negative: Vec::new(),
        }
    }
}

impl TaskBuilder {
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = base.into();
        self
    }

    pub fn dynamic(mut self, dynamic: bool) -> Self {
        self.dynamic = dynamic;
        self
    }

    pub fn positive(mut self, pattern: impl Into<String>) -> Self {
        self.positive.push(pattern.into());
        self
    }

    pub fn negative(mut self, pattern: impl Into<String>) -> Self {
        self.negative.push(pattern.into());
        self
    }

    pub fn build(self) -> Task {
        convert_pattern_group_to_task(self.base, self.positive, &self.negative, self.dynamic)
    }
}

/// Turn a raw pattern list into tasks.
///
/// Exclusions come from `!`-prefixed patterns followed by `settings.ignore`.
/// Groups keep the order in which their base first appears. No positive
/// patterns means no tasks.
pub fn generate_tasks<S: AsRef<str>>(patterns: &[S], settings: &Settings) -> Vec<Task> {
    let options = PatternOptions::from(settings);

    let positive = get_positive_patterns(patterns);
    let negative = get_negative_patterns_as_positive(patterns, &settings.ignore);

    let mut groups: IndexMap<String, (Vec<Pattern>, bool)> = IndexMap::new();
    for pattern in positive {
        let base = get_base_directory(&pattern);
        let dynamic = is_dynamic_pattern(&pattern, &options);

        let group = groups.entry(base).or_default();
        group.0.push(pattern);
        group.1 |= dynamic;
    }

    groups
        .into_iter()
        .map(|(base, (positive, dynamic))| {
            convert_pattern_group_to_task(base, positive, &negative, dynamic)
        })
        .collect()
}

fn get_negative_patterns_as_positive<S: AsRef<str>>(
    patterns: &[S],
    ignore: &[String],
) -> Vec<Pattern> {
    get_negative_patterns(patterns)
        .iter()
        .map(|p| convert_to_positive_pattern(p))
        .chain(ignore.iter().cloned())
        .unique()
        .collect()
}

fn convert_pattern_group_to_task(
    base: String,
    positive: Vec<Pattern>,
    negative: &[Pattern],
    dynamic: bool,
) -> Task {
    let patterns = positive
        .iter()
        .cloned()
        .chain(negative.iter().map(|p| convert_to_negative_pattern(p)))
        .collect();

    Task {
        base,
        dynamic,
        patterns,
        positive,
        negative: negative.to_vec(),
    }
}
