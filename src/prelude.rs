//! Prelude module for convenient imports
//!
//! Import everything you need with: `use keychunk::prelude::*;`

// Domain types
pub use crate::domain::{
    Cursor, DomainError, DynamicRecord, Entity, FieldMismatch, Filter, FilterOp, Key, KeyId,
    PropertyMap, Query, Value,
};

// Store types
pub use crate::store::{Datastore, FetchError, ItemError, KeyIterator, MemoryStore, StoreError};

// Pipeline types
pub use crate::pipeline::{
    Chunk, Classification, DEFAULT_CHUNK_SIZE, Options, Pipeline, PipelineError, Shaper, Unit,
    UnitStream, classify, generate,
};

// IO types
pub use crate::io::{IoError, RecordWriter, load_file, load_records, write_records};

// App types
pub use crate::app::{AppError, Args, CliApp};
