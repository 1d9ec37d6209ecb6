use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::PipelineError;
use super::hydrate::run_hydration_stage;
use super::options::Options;
use super::query::{run_query_stage, watch_query_stage};
use super::unit::Unit;
use crate::domain::{Entity, Query};
use crate::store::Datastore;

// Rendezvous-sized queues: a stage runs at most one unit ahead of its reader.
const CHANNEL_CAPACITY: usize = 1;

/// Streams every record matching a query as hydrated chunks
///
/// # Example
/// ```rust,ignore
/// let cancel = CancellationToken::new();
/// let mut units = Pipeline::new(store, Options::new(shaper).with_chunk_size(10))
///     .with_cancellation(cancel.clone())
///     .stream(Query::new("Item").ancestor(parent));
///
/// while let Some(unit) = units.next().await {
///     let records = unit?;
///     // ...
/// }
/// ```
pub struct Pipeline<S, T> {
    store: Arc<S>,
    options: Options<T>,
    cancel: CancellationToken,
}

impl<S, T> Pipeline<S, T>
where
    S: Datastore,
    T: Entity,
{
    /// Create a pipeline reading from a shared store handle
    pub fn new(store: Arc<S>, options: Options<T>) -> Self {
        Self {
            store,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Stop enumeration when `cancel` fires (defaults to a token nobody cancels)
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Start both stages on the current tokio runtime and return their output
    ///
    /// After cancelling, keep polling the stream until it ends so the
    /// background tasks can wind down.
    pub fn stream(self, query: Query) -> UnitStream<T> {
        let Pipeline {
            store,
            options,
            cancel,
        } = self;
        let options = options.normalized();
        let tolerate = options.tolerates_field_mismatch();

        let (stub_tx, stub_rx) = mpsc::channel(CHANNEL_CAPACITY);
        let (unit_tx, unit_rx) = mpsc::channel(CHANNEL_CAPACITY);

        let query_stage = tokio::spawn(run_query_stage(
            Arc::clone(&store),
            query,
            options,
            cancel.clone(),
            stub_tx.clone(),
        ));
        tokio::spawn(watch_query_stage(query_stage, cancel, stub_tx));
        tokio::spawn(run_hydration_stage(store, stub_rx, tolerate, unit_tx));

        UnitStream { rx: unit_rx }
    }
}

/// Shorthand for `Pipeline::new(store, options).with_cancellation(cancel).stream(query)`
pub fn generate<S, T>(
    store: Arc<S>,
    query: Query,
    options: Options<T>,
    cancel: CancellationToken,
) -> UnitStream<T>
where
    S: Datastore,
    T: Entity,
{
    Pipeline::new(store, options)
        .with_cancellation(cancel)
        .stream(query)
}

/// Read side of a running pipeline
pub struct UnitStream<T> {
    rx: mpsc::Receiver<Unit<T>>,
}

impl<T> UnitStream<T> {
    /// Drain the stream into one vector, stopping at the first error
    pub async fn collect_records(mut self) -> Result<Vec<T>, PipelineError> {
        let mut records = Vec::new();
        while let Some(unit) = self.next().await {
            records.extend(unit?);
        }
        Ok(records)
    }

    /// Drain the stream, counting hydrated records
    pub async fn count_records(mut self) -> Result<usize, PipelineError> {
        let mut count = 0;
        while let Some(unit) = self.next().await {
            count += unit?.len();
        }
        Ok(count)
    }
}

impl<T> Stream for UnitStream<T> {
    type Item = Unit<T>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}
