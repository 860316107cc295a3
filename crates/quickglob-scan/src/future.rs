//! Async mode returning the full result set.

use std::ops::ControlFlow;
use std::sync::Arc;

use futures::StreamExt;
use tracing::debug;

use quickglob_core::{EntryItem, GlobError, Settings};

use crate::provider::run_task;
use crate::resolver::{GlobResolver, Patterns};

impl GlobResolver {
    /// Resolve with up to `concurrency` tasks running on the blocking pool.
    ///
    /// The first fatal error rejects the call; tasks still running stop at
    /// their next walked entry.
    pub async fn resolve(&self, patterns: impl Into<Patterns>) -> Result<Vec<EntryItem>, GlobError> {
        let plan = self.plan(patterns)?;
        let _guard = plan.ctx.cancellation().clone().drop_guard();

        let runs = plan.tasks.into_iter().map(|task| {
            let ctx = Arc::clone(&plan.ctx);
            tokio::task::spawn_blocking(move || {
                let mut items = Vec::new();
                run_task(&task, &ctx, &mut |item| {
                    items.push(item);
                    ControlFlow::Continue(())
                })?;
                Ok::<_, GlobError>(items)
            })
        });

        let mut results = futures::stream::iter(runs).buffer_unordered(self.concurrency());
        let mut items = Vec::new();

        while let Some(joined) = results.next().await {
            let task_items = joined.map_err(|e| GlobError::Join {
                message: e.to_string(),
            })??;
            items.extend(task_items);
        }

        debug!(entries = items.len(), "resolve finished");
        Ok(items)
    }
}

/// Resolve `patterns` asynchronously with the default walker.
///
/// Must be awaited inside a Tokio runtime.
pub async fn glob(
    patterns: impl Into<Patterns>,
    settings: &Settings,
) -> Result<Vec<EntryItem>, GlobError> {
    GlobResolver::new(settings.clone()).resolve(patterns).await
}
