use thiserror::Error;

use crate::store::{FetchError, StoreError};

/// Fatal pipeline errors, tagged with the stage that raised them
///
/// A unit carrying one of these is always the last unit of its stream.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    #[error("query stage: iteration failed: {0}")]
    Iteration(#[source] StoreError),

    #[error("query stage: cursor unavailable: {0}")]
    Cursor(#[source] StoreError),

    #[error("hydration stage: batch fetch failed: {0}")]
    Fetch(#[source] FetchError),

    #[error("hydration stage: fetch task failed: {0}")]
    TaskFailed(String),
}

impl PipelineError {
    /// The underlying batch-fetch error, if the hydration stage failed
    pub fn fetch_error(&self) -> Option<&FetchError> {
        match self {
            Self::Fetch(err) => Some(err),
            _ => None,
        }
    }
}
