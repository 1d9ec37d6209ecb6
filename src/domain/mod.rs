pub mod cursor;
pub mod entity;
pub mod error;
pub mod key;
pub mod query;
pub mod value;

// Re-export commonly used types
pub use cursor::Cursor;
pub use entity::{DynamicRecord, Entity, FieldMismatch};
pub use error::DomainError;
pub use key::{Key, KeyId};
pub use query::{Filter, FilterOp, Query};
pub use value::{PropertyMap, Value};
