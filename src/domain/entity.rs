use std::fmt;

use super::key::Key;
use super::value::{PropertyMap, Value};

/// A stored property has no counterpart in the shape a record expects
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMismatch {
    pub kind: String,
    pub field: String,
    pub reason: String,
}

impl FieldMismatch {
    pub fn new(kind: impl Into<String>, field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            field: field.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "cannot load field {:?} into a {:?}: {}",
            self.field, self.kind, self.reason
        )
    }
}

impl std::error::Error for FieldMismatch {}

/// Caller-defined record type the store can hydrate in place
///
/// `load` should populate every field it recognises and report the first
/// property it could not place; the store treats that as a per-item
/// field-shape error, not as a failed fetch.
pub trait Entity: Send + 'static {
    fn key(&self) -> &Key;

    fn load(&mut self, properties: &PropertyMap) -> Result<(), FieldMismatch>;
}

/// Record whose shape is a fixed list of expected field names
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicRecord {
    key: Key,
    expected: Vec<String>,
    values: Vec<Option<Value>>,
}

impl DynamicRecord {
    /// Stub for `key` expecting exactly `fields`; an empty list accepts any property
    pub fn stub(key: Key, fields: &[String]) -> Self {
        Self {
            key,
            expected: fields.to_vec(),
            values: vec![None; fields.len()],
        }
    }

    pub fn fields(&self) -> &[String] {
        &self.expected
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.expected
            .iter()
            .position(|name| name == field)
            .and_then(|idx| self.values[idx].as_ref())
    }
}

impl Entity for DynamicRecord {
    fn key(&self) -> &Key {
        &self.key
    }

    fn load(&mut self, properties: &PropertyMap) -> Result<(), FieldMismatch> {
        if self.expected.is_empty() {
            self.expected = properties.keys().cloned().collect();
            self.values = properties.values().cloned().map(Some).collect();
            return Ok(());
        }

        let mut mismatch = None;
        for (field, value) in properties {
            match self.expected.iter().position(|name| name == field) {
                Some(idx) => self.values[idx] = Some(value.clone()),
                None => {
                    mismatch.get_or_insert_with(|| {
                        FieldMismatch::new(self.key.kind(), field, "no such field")
                    });
                }
            }
        }

        match mismatch {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
