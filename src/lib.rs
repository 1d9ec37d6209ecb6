//! Stream every record matching a keyed query as bounded, hydrated chunks.
//!
//! Keys are enumerated page by page with a store cursor, turned into record
//! stubs by a caller-supplied shaper, and hydrated by one concurrent batch
//! fetch per chunk. Records whose stored fields no longer match their shape
//! can be dropped instead of failing the whole stream.

pub mod app;
pub mod domain;
pub mod io;
pub mod pipeline;
pub mod prelude;
pub mod store;
