use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::error::PipelineError;
use super::options::Options;
use super::unit::{Chunk, Unit};
use crate::domain::{Cursor, Query};
use crate::store::{Datastore, KeyIterator};

/// One page of keys-only enumeration
struct Page<T> {
    stubs: Chunk<T>,
    keys: usize,
    next: Option<Cursor>,
}

/// Paginate `query` into stub chunks and send them downstream in order
///
/// Stops after the last page, after the first error unit, once `cancel`
/// fires, or when the receiver goes away.
pub(crate) async fn run_query_stage<S, T>(
    store: Arc<S>,
    query: Query,
    options: Options<T>,
    cancel: CancellationToken,
    tx: mpsc::Sender<Unit<T>>,
) where
    S: Datastore,
    T: Send + 'static,
{
    let mut cursor: Option<Cursor> = None;
    let mut emitted = 0usize;

    loop {
        let (unit, last) = match fetch_page(store.as_ref(), &query, &options, cursor.take()).await {
            Ok(page) => {
                // The previous page ended exactly on the last key.
                if page.keys == 0 && page.next.is_none() && emitted > 0 {
                    break;
                }
                debug!(page = emitted, keys = page.keys, stubs = page.stubs.len(), "Enumerated page");
                let last = page.next.is_none();
                cursor = page.next;
                (Ok(page.stubs), last)
            }
            Err(err) => (Err(err), true),
        };

        if cancel.is_cancelled() {
            debug!(page = emitted, "Query cancelled");
            break;
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(page = emitted, "Query cancelled");
                break;
            }
            sent = tx.send(unit) => {
                if sent.is_err() {
                    break;
                }
            }
        }

        emitted += 1;
        if last {
            break;
        }
    }
}

/// Wait for a spawned query stage and report its failure downstream
///
/// A panicking stage drops its sender, which looks like a normal end of input
/// to the next stage; `tx` keeps the channel open until the outcome is known.
pub(crate) async fn watch_query_stage<T>(
    stage: JoinHandle<()>,
    cancel: CancellationToken,
    tx: mpsc::Sender<Unit<T>>,
) where
    T: Send + 'static,
{
    let Err(err) = stage.await else {
        return;
    };
    if cancel.is_cancelled() {
        warn!(error = %err, "Query stage failed after cancellation");
        return;
    }
    warn!(error = %err, "Query stage failed");
    let _ = tx.send(Err(PipelineError::TaskFailed(err.to_string()))).await;
}

async fn fetch_page<S, T>(
    store: &S,
    query: &Query,
    options: &Options<T>,
    start: Option<Cursor>,
) -> Result<Page<T>, PipelineError>
where
    S: Datastore,
{
    let mut page_query = query.clone().keys_only();
    if let Some(cursor) = start {
        page_query = page_query.start(cursor);
    }

    let mut iter = store.run(&page_query).await.map_err(PipelineError::Iteration)?;

    let chunk_size = options.chunk_size();
    let mut stubs = Vec::new();
    let mut keys = 0;
    let mut exhausted = false;
    for index in 0..chunk_size {
        match iter.next().await.map_err(PipelineError::Iteration)? {
            Some(key) => {
                stubs.extend(options.shape(index, key));
                keys += 1;
            }
            None => {
                exhausted = true;
                break;
            }
        }
    }

    let next = if exhausted {
        None
    } else {
        Some(iter.cursor().await.map_err(PipelineError::Cursor)?)
    };

    Ok(Page { stubs, keys, next })
}
