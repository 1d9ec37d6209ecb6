use std::fmt;

use super::error::DomainError;

/// Identifier part of a key: numeric or named
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyId {
    Int(i64),
    Name(String),
}

impl fmt::Display for KeyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

impl From<i64> for KeyId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<i32> for KeyId {
    fn from(id: i32) -> Self {
        Self::Int(i64::from(id))
    }
}

impl From<&str> for KeyId {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

/// Key of a stored record, optionally scoped under a parent key
///
/// Keys order by parent path first, then kind, then id, which is the
/// order the store enumerates query results in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Key {
    parent: Option<Box<Key>>,
    kind: String,
    id: KeyId,
}

impl Key {
    /// Create a root key
    pub fn new(kind: impl Into<String>, id: impl Into<KeyId>) -> Self {
        Self {
            parent: None,
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Place this key under `parent`
    pub fn with_parent(mut self, parent: Key) -> Self {
        self.parent = Some(Box::new(parent));
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &KeyId {
        &self.id
    }

    /// Numeric id, if this key has one
    pub fn int_id(&self) -> Option<i64> {
        match self.id {
            KeyId::Int(id) => Some(id),
            KeyId::Name(_) => None,
        }
    }

    /// Named id, if this key has one
    pub fn name(&self) -> Option<&str> {
        match &self.id {
            KeyId::Int(_) => None,
            KeyId::Name(name) => Some(name),
        }
    }

    pub fn parent(&self) -> Option<&Key> {
        self.parent.as_deref()
    }

    /// True if `ancestor` appears anywhere on this key's parent chain
    pub fn has_ancestor(&self, ancestor: &Key) -> bool {
        let mut current = self.parent();
        while let Some(key) = current {
            if key == ancestor {
                return true;
            }
            current = key.parent();
        }
        false
    }

    /// Parse the `Kind:id/Kind:id` path form produced by `Display`
    ///
    /// Ids that parse as `i64` become numeric ids; anything else is a name.
    pub fn parse(path: &str) -> Result<Self, DomainError> {
        let path = path.trim();
        if path.is_empty() {
            return Err(DomainError::InvalidKey(path.to_string()));
        }

        let mut key: Option<Key> = None;
        for segment in path.split('/') {
            let (kind, id) = segment
                .split_once(':')
                .ok_or_else(|| DomainError::InvalidKey(path.to_string()))?;
            if kind.is_empty() || id.is_empty() {
                return Err(DomainError::InvalidKey(path.to_string()));
            }

            let id = match id.parse::<i64>() {
                Ok(id) => KeyId::Int(id),
                Err(_) => KeyId::Name(id.to_string()),
            };
            let next = Key::new(kind, id);
            key = Some(match key {
                Some(parent) => next.with_parent(parent),
                None => next,
            });
        }

        key.ok_or_else(|| DomainError::InvalidKey(path.to_string()))
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(parent) = self.parent() {
            write!(f, "{parent}/")?;
        }
        write!(f, "{}:{}", self.kind, self.id)
    }
}
