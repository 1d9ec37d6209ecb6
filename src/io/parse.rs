use csv_async::StringRecord;

use super::error::IoError;
use crate::domain::{Key, KeyId, PropertyMap, Value};

/// Column positions of a record CSV: `kind,id[,parent],<properties...>`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLayout {
    kind: usize,
    id: usize,
    parent: Option<usize>,
    properties: Vec<(usize, String)>,
}

impl RecordLayout {
    /// Locate the key columns; every other column is a property
    pub fn from_headers(headers: &StringRecord) -> Result<Self, IoError> {
        let find = |name: &str| headers.iter().position(|h| h == name);

        let kind = find("kind").ok_or_else(|| IoError::MissingColumn("kind".to_string()))?;
        let id = find("id").ok_or_else(|| IoError::MissingColumn("id".to_string()))?;
        let parent = find("parent");

        let properties = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != kind && *idx != id && Some(*idx) != parent)
            .map(|(idx, name)| (idx, name.to_string()))
            .collect();

        Ok(Self {
            kind,
            id,
            parent,
            properties,
        })
    }

    /// Parse one row into its key and stored properties
    ///
    /// Empty property cells are left out of the record entirely.
    pub fn parse(&self, row: &StringRecord) -> Result<(Key, PropertyMap), IoError> {
        let line = row.position().map(|p| p.line()).unwrap_or_default();
        let cell = |idx: usize| row.get(idx).unwrap_or("");

        let kind = cell(self.kind);
        let id = cell(self.id);
        if kind.is_empty() || id.is_empty() {
            return Err(IoError::InvalidRecord {
                line,
                reason: "kind and id are required".to_string(),
            });
        }

        let id = match id.parse::<i64>() {
            Ok(id) => KeyId::Int(id),
            Err(_) => KeyId::Name(id.to_string()),
        };
        let mut key = Key::new(kind, id);
        if let Some(parent) = self.parent.map(cell).filter(|p| !p.is_empty()) {
            key = key.with_parent(Key::parse(parent)?);
        }

        let properties = self
            .properties
            .iter()
            .filter_map(|(idx, name)| {
                let raw = cell(*idx);
                (!raw.is_empty()).then(|| (name.clone(), Value::infer(raw)))
            })
            .collect();

        Ok((key, properties))
    }
}
