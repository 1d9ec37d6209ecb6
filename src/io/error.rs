use std::io;
use thiserror::Error;

use crate::domain::DomainError;

/// IO-level errors for CSV loading and record output
#[derive(Error, Debug)]
pub enum IoError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV async parsing error: {0}")]
    CsvAsync(#[from] csv_async::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid record on line {line}: {reason}")]
    InvalidRecord { line: u64, reason: String },

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}
