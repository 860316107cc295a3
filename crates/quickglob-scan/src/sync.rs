//! Blocking mode.

use std::ops::ControlFlow;

use quickglob_core::{EntryItem, GlobError, Settings};

use crate::provider::run_task;
use crate::resolver::{GlobResolver, Patterns};

impl GlobResolver {
    /// Resolve on the calling thread, one task after another.
    pub fn resolve_sync(&self, patterns: impl Into<Patterns>) -> Result<Vec<EntryItem>, GlobError> {
        let plan = self.plan(patterns)?;
        let mut items = Vec::new();

        for task in &plan.tasks {
            run_task(task, &plan.ctx, &mut |item| {
                items.push(item);
                ControlFlow::Continue(())
            })?;
        }

        Ok(items)
    }
}

/// Resolve `patterns` synchronously with the default walker.
pub fn glob_sync(
    patterns: impl Into<Patterns>,
    settings: &Settings,
) -> Result<Vec<EntryItem>, GlobError> {
    GlobResolver::new(settings.clone()).resolve_sync(patterns)
}
