use tracing::warn;

use crate::domain::Entity;
use crate::store::{FetchError, ItemError};

/// Outcome of reconciling a batch fetch with its chunk
#[derive(Debug, PartialEq)]
pub struct Classification<T> {
    /// Records that survive; the original chunk when `error` is set
    pub records: Vec<T>,
    /// Error that must propagate, if any
    pub error: Option<FetchError>,
}

impl<T> Classification<T> {
    fn keep(records: Vec<T>) -> Self {
        Self {
            records,
            error: None,
        }
    }

    fn fail(records: Vec<T>, error: FetchError) -> Self {
        Self {
            records,
            error: Some(error),
        }
    }
}

/// Decide which records of a fetched chunk survive `error`
///
/// Only a per-item `Multi` error can be filtered. Items that failed with a
/// field mismatch are dropped when `tolerate_field_mismatch` is set; any
/// other item failure leaves the chunk and error untouched. A `Multi` error
/// whose length disagrees with the chunk can't be aligned to records, so the
/// whole chunk is dropped without an error.
pub fn classify<T: Entity>(
    records: Vec<T>,
    error: Option<FetchError>,
    tolerate_field_mismatch: bool,
) -> Classification<T> {
    let error = match error {
        Some(error) if !records.is_empty() => error,
        error => return Classification { records, error },
    };

    let errors = match error {
        FetchError::Multi(errors) => errors,
        // Opaque errors and bare (non-batch) mismatches are never filterable.
        other => return Classification::fail(records, other),
    };

    if errors.len() != records.len() {
        warn!(
            records = records.len(),
            errors = errors.len(),
            "Batch error length differs from chunk length, dropping chunk"
        );
        return Classification::keep(Vec::new());
    }

    let filterable = errors
        .iter()
        .flatten()
        .all(|err| tolerate_field_mismatch && matches!(err, ItemError::FieldMismatch(_)));
    if !filterable {
        return Classification::fail(records, FetchError::Multi(errors));
    }

    let mut kept = Vec::with_capacity(records.len());
    for (record, err) in records.into_iter().zip(errors) {
        match err {
            None => kept.push(record),
            Some(err) => warn!(key = %record.key(), error = %err, "Ignoring field mismatch"),
        }
    }
    Classification::keep(kept)
}
