use thiserror::Error;

use crate::domain::{FieldMismatch, Key};

/// Store-level errors that cannot be attributed to a single record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    #[error("Batch of {len} records exceeds the limit of {max}")]
    BatchTooLarge { len: usize, max: usize },

    #[error("Query failed: {0}")]
    Query(String),
}

/// Failure of a single record within a batch fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ItemError {
    #[error("{0}")]
    FieldMismatch(FieldMismatch),

    #[error("No record stored under {0}")]
    NotFound(Key),

    #[error("{0}")]
    Other(String),
}

/// Result of a failed batch fetch
///
/// `Multi` carries one slot per requested record, aligned by index; `None`
/// marks a record that hydrated fine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("{0}")]
    Opaque(#[from] StoreError),

    #[error("{0}")]
    FieldMismatch(FieldMismatch),

    #[error("{}", summarize(.0))]
    Multi(Vec<Option<ItemError>>),
}

fn summarize(errors: &[Option<ItemError>]) -> String {
    let mut failed = errors.iter().flatten();
    match failed.next() {
        Some(first) => format!(
            "{} of {} records failed to load (first: {})",
            1 + failed.count(),
            errors.len(),
            first
        ),
        None => format!("0 of {} records failed to load", errors.len()),
    }
}
