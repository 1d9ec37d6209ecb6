use async_trait::async_trait;

use super::error::{FetchError, StoreError};
use crate::domain::{Cursor, Entity, Key, Query};

/// Keys-only iteration over a running query
#[async_trait]
pub trait KeyIterator: Send {
    /// Next key in query order, or `None` once the result set is exhausted
    async fn next(&mut self) -> Result<Option<Key>, StoreError>;

    /// Cursor positioned just after the last key returned by `next`
    async fn cursor(&self) -> Result<Cursor, StoreError>;
}

/// The remote record store the pipeline reads from
///
/// A single handle is shared by every in-flight batch fetch, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait Datastore: Send + Sync + 'static {
    type Keys: KeyIterator + 'static;

    /// Start a query; honours the query's start cursor
    async fn run(&self, query: &Query) -> Result<Self::Keys, StoreError>;

    /// Hydrate every entity in place from the record stored under its key
    async fn get_multi<E: Entity>(&self, entities: &mut [E]) -> Result<(), FetchError>;
}
