use thiserror::Error;

/// Domain-level errors for keys and filters
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
}
