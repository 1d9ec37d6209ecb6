pub mod classify;
pub mod error;
mod hydrate;
pub mod options;
mod query;
pub mod stream;
pub mod unit;

// Re-export commonly used types
pub use classify::{Classification, classify};
pub use error::PipelineError;
pub use options::{DEFAULT_CHUNK_SIZE, Options, Shaper};
pub use stream::{Pipeline, UnitStream, generate};
pub use unit::{Chunk, Unit};
