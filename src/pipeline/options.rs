use std::fmt;
use std::sync::Arc;

use crate::domain::Key;

/// Chunk size used when none (or zero) is configured
pub const DEFAULT_CHUNK_SIZE: usize = 100;

/// Turns a raw key into zero or more record stubs
///
/// Arguments are the key's index within its chunk, the key itself and the
/// configured ancestor key.
pub type Shaper<T> = Arc<dyn Fn(usize, Key, Option<&Key>) -> Vec<T> + Send + Sync>;

/// Pipeline configuration
pub struct Options<T> {
    shaper: Shaper<T>,
    chunk_size: usize,
    tolerate_field_mismatch: bool,
    ancestor: Option<Key>,
}

impl<T> Options<T> {
    /// Options with the default chunk size and strict field handling
    pub fn new<F>(shaper: F) -> Self
    where
        F: Fn(usize, Key, Option<&Key>) -> Vec<T> + Send + Sync + 'static,
    {
        Self {
            shaper: Arc::new(shaper),
            chunk_size: DEFAULT_CHUNK_SIZE,
            tolerate_field_mismatch: false,
            ancestor: None,
        }
    }

    /// Set the maximum number of keys enumerated per chunk (zero means default)
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Drop records whose stored fields don't match their shape instead of failing
    pub fn tolerate_field_mismatch(mut self, enabled: bool) -> Self {
        self.tolerate_field_mismatch = enabled;
        self
    }

    /// Ancestor key handed to the shaper with every key
    pub fn with_ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn tolerates_field_mismatch(&self) -> bool {
        self.tolerate_field_mismatch
    }

    pub fn ancestor(&self) -> Option<&Key> {
        self.ancestor.as_ref()
    }

    pub(crate) fn normalized(mut self) -> Self {
        if self.chunk_size == 0 {
            self.chunk_size = DEFAULT_CHUNK_SIZE;
        }
        self
    }

    pub(crate) fn shape(&self, index: usize, key: Key) -> Vec<T> {
        (self.shaper)(index, key, self.ancestor.as_ref())
    }
}

impl<T> Clone for Options<T> {
    fn clone(&self) -> Self {
        Self {
            shaper: Arc::clone(&self.shaper),
            chunk_size: self.chunk_size,
            tolerate_field_mismatch: self.tolerate_field_mismatch,
            ancestor: self.ancestor.clone(),
        }
    }
}

impl<T> fmt::Debug for Options<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("chunk_size", &self.chunk_size)
            .field("tolerate_field_mismatch", &self.tolerate_field_mismatch)
            .field("ancestor", &self.ancestor)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_ids() -> Options<i64> {
        Options::new(|_, key, _| key.int_id().into_iter().collect())
    }

    #[test]
    fn defaults() {
        let options = key_ids();
        assert_eq!(options.chunk_size(), DEFAULT_CHUNK_SIZE);
        assert!(!options.tolerates_field_mismatch());
        assert!(options.ancestor().is_none());
    }

    #[test]
    fn zero_chunk_size_normalizes_to_default() {
        let options = key_ids().with_chunk_size(0).normalized();
        assert_eq!(options.chunk_size(), DEFAULT_CHUNK_SIZE);

        let options = key_ids().with_chunk_size(7).normalized();
        assert_eq!(options.chunk_size(), 7);
    }

    #[test]
    fn shape_passes_index_key_and_ancestor() {
        let parent = Key::new("Parent", 1);
        let options = Options::new(|i, key: Key, ancestor: Option<&Key>| {
            vec![format!("{i}:{key}:{}", ancestor.map(ToString::to_string).unwrap_or_default())]
        })
        .with_ancestor(parent);

        assert_eq!(
            options.shape(3, Key::new("Item", 9)),
            vec!["3:Item:9:Parent:1".to_string()]
        );
    }

    #[test]
    fn clone_shares_shaper() {
        let options = key_ids().tolerate_field_mismatch(true);
        let cloned = options.clone();
        assert!(cloned.tolerates_field_mismatch());
        assert_eq!(cloned.shape(0, Key::new("Item", 4)), vec![4]);
    }
}
