use async_trait::async_trait;
use dashmap::DashMap;
use tracing::debug;

use super::error::{FetchError, ItemError, StoreError};
use super::traits::{Datastore, KeyIterator};
use crate::domain::{Cursor, Entity, Key, PropertyMap, Query};

/// Largest batch `get_multi` accepts in one call
pub const MAX_BATCH: usize = 1000;

/// Concurrent in-memory store using DashMap
///
/// Query results are enumerated in key order; cursors encode the offset
/// into that ordering.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<Key, PropertyMap>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
        }
    }

    /// Insert or replace the record stored under `key`
    pub fn put(&self, key: Key, properties: PropertyMap) {
        self.records.insert(key, properties);
    }

    /// Insert every record, replacing existing ones with the same key
    pub fn put_multi(&self, records: impl IntoIterator<Item = (Key, PropertyMap)>) {
        for (key, properties) in records {
            self.put(key, properties);
        }
    }

    /// Clone of the record stored under `key`
    pub fn get(&self, key: &Key) -> Option<PropertyMap> {
        self.records.get(key).map(|r| r.value().clone())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn decode_offset(cursor: &Cursor) -> Result<usize, StoreError> {
        let bytes: [u8; 8] = cursor.as_bytes().try_into().map_err(|_| {
            StoreError::InvalidCursor(format!("expected 8 bytes, got {}", cursor.as_bytes().len()))
        })?;
        let offset = u64::from_be_bytes(bytes);
        usize::try_from(offset).map_err(|_| StoreError::InvalidCursor(format!("offset {offset} out of range")))
    }
}

/// Snapshot of matching keys taken when the query started
#[derive(Debug)]
pub struct MemoryKeys {
    keys: Vec<Key>,
    offset: usize,
    position: usize,
}

#[async_trait]
impl KeyIterator for MemoryKeys {
    async fn next(&mut self) -> Result<Option<Key>, StoreError> {
        let key = self.keys.get(self.position).cloned();
        if key.is_some() {
            self.position += 1;
        }
        Ok(key)
    }

    async fn cursor(&self) -> Result<Cursor, StoreError> {
        let absolute = (self.offset + self.position) as u64;
        Ok(Cursor::from_bytes(absolute.to_be_bytes().to_vec()))
    }
}

#[async_trait]
impl Datastore for MemoryStore {
    type Keys = MemoryKeys;

    async fn run(&self, query: &Query) -> Result<Self::Keys, StoreError> {
        let offset = match query.start_cursor() {
            Some(cursor) => Self::decode_offset(cursor)?,
            None => 0,
        };

        // DashMap holds brief per-shard locks during iteration
        let mut keys: Vec<Key> = self
            .records
            .iter()
            .filter(|entry| query.matches(entry.key(), entry.value()))
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();

        let total = keys.len();
        let keys = keys.into_iter().skip(offset).collect::<Vec<_>>();
        debug!(kind = query.kind(), total, offset, "Running query");

        Ok(MemoryKeys {
            keys,
            offset,
            position: 0,
        })
    }

    async fn get_multi<E: Entity>(&self, entities: &mut [E]) -> Result<(), FetchError> {
        if entities.len() > MAX_BATCH {
            return Err(StoreError::BatchTooLarge {
                len: entities.len(),
                max: MAX_BATCH,
            }
            .into());
        }

        let mut errors = Vec::with_capacity(entities.len());
        for entity in entities.iter_mut() {
            let error = match self.get(entity.key()) {
                Some(properties) => entity.load(&properties).err().map(ItemError::FieldMismatch),
                None => Some(ItemError::NotFound(entity.key().clone())),
            };
            errors.push(error);
        }

        if errors.iter().any(Option::is_some) {
            return Err(FetchError::Multi(errors));
        }
        Ok(())
    }
}
