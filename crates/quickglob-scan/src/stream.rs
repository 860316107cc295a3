//! Streaming mode.
//!
//! A scheduler admits at most `concurrency` tasks at once through a
//! semaphore; each task runs on the blocking pool and pushes accepted
//! entries into a bounded channel. A forwarder relays them to the consumer
//! and ends the stream after the first fatal error.

use std::ops::ControlFlow;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::sync::{Semaphore, mpsc};
use tokio::task::JoinSet;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use quickglob_core::{EntryItem, GlobError, Settings};

use crate::provider::{PreparedTask, ProviderContext, run_task};
use crate::resolver::{GlobResolver, Patterns};

/// Capacity of the entry channels.
const STREAM_BUFFER: usize = 256;

type StreamItem = Result<EntryItem, GlobError>;

/// Entries as they are discovered.
///
/// Yields `Ok` items in discovery order; a fatal error arrives as one final
/// `Err` item. Dropping the stream cancels outstanding work.
pub struct GlobStream {
    inner: ReceiverStream<StreamItem>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl GlobStream {
    /// Receive the next item, `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamItem> {
        futures::StreamExt::next(&mut self.inner).await
    }

    /// Stop scheduling tasks and stop running walks at their next entry.
    /// Items already delivered stay delivered.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Stream for GlobStream {
    type Item = StreamItem;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl std::fmt::Debug for GlobStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobStream")
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl GlobResolver {
    /// Start resolving in the background and stream entries as they pass
    /// the filters.
    ///
    /// Invalid input is reported here, before anything is spawned. Must be
    /// called inside a Tokio runtime.
    pub fn stream(&self, patterns: impl Into<Patterns>) -> Result<GlobStream, GlobError> {
        let plan = self.plan(patterns)?;
        let cancel = plan.ctx.cancellation().clone();
        let (out_tx, out_rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(forward(
            plan.tasks,
            plan.ctx,
            self.concurrency(),
            out_tx,
            cancel.clone(),
        ));

        Ok(GlobStream {
            inner: ReceiverStream::new(out_rx),
            _guard: cancel.clone().drop_guard(),
            cancel,
        })
    }
}

/// Relay worker output to the consumer, stopping after the first error.
async fn forward(
    tasks: Vec<PreparedTask>,
    ctx: Arc<ProviderContext>,
    concurrency: usize,
    out: mpsc::Sender<StreamItem>,
    cancel: CancellationToken,
) {
    let (tx, mut rx) = mpsc::channel(STREAM_BUFFER);
    let scheduler = tokio::spawn(schedule(tasks, ctx, concurrency, tx, cancel.clone()));

    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => {
                debug!("stream cancelled");
                break;
            }
            item = rx.recv() => match item {
                Some(item) => item,
                None => break,
            },
        };

        let failed = item.is_err();
        if out.send(item).await.is_err() || failed {
            cancel.cancel();
            break;
        }
    }

    // Unblock workers waiting on a full channel.
    drop(rx);
    if let Err(err) = scheduler.await {
        warn!(error = %err, "stream scheduler failed");
    }
}

/// Admit tasks through the semaphore and wait for all of them.
async fn schedule(
    tasks: Vec<PreparedTask>,
    ctx: Arc<ProviderContext>,
    concurrency: usize,
    tx: mpsc::Sender<StreamItem>,
    cancel: CancellationToken,
) {
    let semaphore = Arc::new(Semaphore::new(concurrency));
    let mut workers = JoinSet::new();

    for task in tasks {
        let permit = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            permit = Arc::clone(&semaphore).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let ctx = Arc::clone(&ctx);
        let tx = tx.clone();

        workers.spawn_blocking(move || {
            let _permit = permit;
            let result = run_task(&task, &ctx, &mut |item| {
                if tx.blocking_send(Ok(item)).is_err() {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            });

            if let Err(err) = result {
                let _ = tx.blocking_send(Err(err));
            }
        });
    }

    while let Some(joined) = workers.join_next().await {
        if let Err(err) = joined {
            let _ = tx
                .send(Err(GlobError::Join {
                    message: err.to_string(),
                }))
                .await;
        }
    }
}

/// Stream `patterns` with the default walker.
///
/// Must be called inside a Tokio runtime.
pub fn glob_stream(
    patterns: impl Into<Patterns>,
    settings: &Settings,
) -> Result<GlobStream, GlobError> {
    GlobResolver::new(settings.clone()).stream(patterns)
}
