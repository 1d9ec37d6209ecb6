use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use super::classify::{Classification, classify};
use super::error::PipelineError;
use super::unit::{Chunk, Unit};
use crate::domain::Entity;
use crate::store::Datastore;

/// Hydrate each incoming stub chunk with one concurrent batch fetch
///
/// Output order follows fetch completion, not input order. The first error
/// unit, from upstream or from a fetch, is forwarded and ends the output;
/// fetches still running at that point are detached and their results
/// discarded.
pub(crate) async fn run_hydration_stage<S, T>(
    store: Arc<S>,
    mut input: mpsc::Receiver<Unit<T>>,
    tolerate_field_mismatch: bool,
    output: mpsc::Sender<Unit<T>>,
) where
    S: Datastore,
    T: Entity,
{
    let mut tasks = JoinSet::new();
    let mut input_open = true;

    loop {
        let unit = tokio::select! {
            incoming = input.recv(), if input_open => match incoming {
                None => {
                    input_open = false;
                    continue;
                }
                Some(Err(err)) => Err(err),
                Some(Ok(chunk)) if chunk.is_empty() => Ok(chunk),
                Some(Ok(chunk)) => {
                    tasks.spawn(hydrate_chunk(Arc::clone(&store), chunk, tolerate_field_mismatch));
                    continue;
                }
            },
            Some(joined) = tasks.join_next(), if !tasks.is_empty() => match joined {
                Ok(unit) => unit,
                Err(err) => Err(PipelineError::TaskFailed(err.to_string())),
            },
            else => break,
        };

        let fatal = match &unit {
            Ok(_) => false,
            Err(err) => {
                warn!(error = %err, in_flight = tasks.len(), "Pipeline failed");
                true
            }
        };
        if output.send(unit).await.is_err() || fatal {
            break;
        }
    }

    tasks.detach_all();
}

async fn hydrate_chunk<S, T>(store: Arc<S>, mut chunk: Chunk<T>, tolerate_field_mismatch: bool) -> Unit<T>
where
    S: Datastore,
    T: Entity,
{
    let requested = chunk.len();
    let fetched = store.get_multi(&mut chunk).await;

    let Classification { records, error } = classify(chunk, fetched.err(), tolerate_field_mismatch);
    match error {
        Some(err) => Err(PipelineError::Fetch(err)),
        None => {
            debug!(requested, hydrated = records.len(), "Hydrated chunk");
            Ok(records)
        }
    }
}
