//! Pattern input and the resolver shared by every mode.

use std::sync::Arc;

use tracing::debug;

use quickglob_core::{GlobError, Settings, Task, generate_tasks};

use crate::provider::{PreparedTask, ProviderContext, prepare};
use crate::unique::UniqueTracker;
use crate::walker::{JwalkWalker, Walker};

/// Pattern input: a single pattern or a list.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Patterns(Vec<String>);

impl Patterns {
    /// Reject empty input and empty patterns.
    pub fn validate(self) -> Result<Vec<String>, GlobError> {
        if self.0.is_empty() || self.0.iter().any(String::is_empty) {
            return Err(GlobError::InvalidPatterns);
        }
        Ok(self.0)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl From<&str> for Patterns {
    fn from(pattern: &str) -> Self {
        Self(vec![pattern.to_string()])
    }
}

impl From<String> for Patterns {
    fn from(pattern: String) -> Self {
        Self(vec![pattern])
    }
}

impl From<&String> for Patterns {
    fn from(pattern: &String) -> Self {
        Self(vec![pattern.clone()])
    }
}

impl From<Vec<String>> for Patterns {
    fn from(patterns: Vec<String>) -> Self {
        Self(patterns)
    }
}

impl From<Vec<&str>> for Patterns {
    fn from(patterns: Vec<&str>) -> Self {
        Self(patterns.into_iter().map(str::to_string).collect())
    }
}

impl From<&[&str]> for Patterns {
    fn from(patterns: &[&str]) -> Self {
        Self(patterns.iter().map(|p| p.to_string()).collect())
    }
}

impl From<&[String]> for Patterns {
    fn from(patterns: &[String]) -> Self {
        Self(patterns.to_vec())
    }
}

impl<const N: usize> From<[&str; N]> for Patterns {
    fn from(patterns: [&str; N]) -> Self {
        Self(patterns.iter().map(|p| p.to_string()).collect())
    }
}

/// Resolves patterns against the filesystem.
///
/// The walker defaults to [`JwalkWalker`]; any [`Walker`] can be plugged
/// in with [`GlobResolver::with_walker`].
#[derive(Clone)]
pub struct GlobResolver {
    settings: Settings,
    walker: Arc<dyn Walker>,
}

/// Validated, compiled work for one call.
pub(crate) struct Plan {
    pub tasks: Vec<PreparedTask>,
    pub ctx: Arc<ProviderContext>,
}

impl GlobResolver {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: settings.normalized(),
            walker: Arc::new(JwalkWalker::new()),
        }
    }

    /// Replace the directory walker.
    pub fn with_walker(mut self, walker: impl Walker + 'static) -> Self {
        self.walker = Arc::new(walker);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Validate the input and build its tasks without touching the disk.
    pub fn tasks(&self, patterns: impl Into<Patterns>) -> Result<Vec<Task>, GlobError> {
        let patterns = patterns.into().validate()?;
        Ok(generate_tasks(&patterns, &self.settings))
    }

    /// Everything that can fail before a task runs fails here.
    pub(crate) fn plan(&self, patterns: impl Into<Patterns>) -> Result<Plan, GlobError> {
        let tasks = self.tasks(patterns)?;
        debug!(tasks = tasks.len(), cwd = %self.settings.cwd.display(), "tasks built");

        let tracker = Arc::new(UniqueTracker::new());
        let tasks = prepare(tasks, &self.settings, &tracker)?;
        let ctx = Arc::new(ProviderContext::new(
            self.settings.clone(),
            Arc::clone(&self.walker),
        ));

        Ok(Plan { tasks, ctx })
    }

    /// Upper bound on tasks running at once.
    pub(crate) fn concurrency(&self) -> usize {
        self.settings.concurrency.max(1)
    }
}

impl std::fmt::Debug for GlobResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobResolver")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
