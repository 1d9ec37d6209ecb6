pub mod error;
pub mod memory;
pub mod traits;

// Re-export commonly used types
pub use error::{FetchError, ItemError, StoreError};
pub use memory::{MAX_BATCH, MemoryKeys, MemoryStore};
pub use traits::{Datastore, KeyIterator};
