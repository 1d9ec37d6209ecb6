use std::cmp::Ordering;
use std::fmt;

use super::cursor::Cursor;
use super::error::DomainError;
use super::key::Key;
use super::value::{PropertyMap, Value};

/// Comparison operator of a property filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
}

impl FilterOp {
    fn accepts(self, ordering: Ordering) -> bool {
        match self {
            Self::Eq => ordering == Ordering::Equal,
            Self::Lt => ordering == Ordering::Less,
            Self::Le => ordering != Ordering::Greater,
            Self::Gt => ordering == Ordering::Greater,
            Self::Ge => ordering != Ordering::Less,
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        })
    }
}

/// Single property filter, e.g. `name = "B"`
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

impl Filter {
    /// Parse `field<op>value` where op is one of `>=`, `<=`, `=`, `<`, `>`
    pub fn parse(expr: &str) -> Result<Self, DomainError> {
        // Two-character operators first so `<=` is not read as `<`.
        const OPS: [(&str, FilterOp); 5] = [
            (">=", FilterOp::Ge),
            ("<=", FilterOp::Le),
            ("=", FilterOp::Eq),
            ("<", FilterOp::Lt),
            (">", FilterOp::Gt),
        ];

        for (token, op) in OPS {
            if let Some((field, value)) = expr.split_once(token) {
                let field = field.trim();
                if field.is_empty() {
                    break;
                }
                return Ok(Self {
                    field: field.to_string(),
                    op,
                    value: Value::infer(value.trim()),
                });
            }
        }

        Err(DomainError::InvalidFilter(expr.to_string()))
    }

    /// Whether a stored record satisfies this filter; a missing field never matches
    pub fn matches(&self, properties: &PropertyMap) -> bool {
        properties
            .get(&self.field)
            .and_then(|stored| stored.compare(&self.value))
            .is_some_and(|ordering| self.op.accepts(ordering))
    }
}

/// Query over one kind of record, optionally scoped to an ancestor
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    kind: String,
    ancestor: Option<Key>,
    filters: Vec<Filter>,
    keys_only: bool,
    start: Option<Cursor>,
}

impl Query {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            ancestor: None,
            filters: Vec::new(),
            keys_only: false,
            start: None,
        }
    }

    pub fn ancestor(mut self, ancestor: Key) -> Self {
        self.ancestor = Some(ancestor);
        self
    }

    /// Add an equality filter
    pub fn filter(self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter_op(field, FilterOp::Eq, value)
    }

    pub fn filter_op(
        mut self,
        field: impl Into<String>,
        op: FilterOp,
        value: impl Into<Value>,
    ) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            op,
            value: value.into(),
        });
        self
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }

    /// Resume enumeration at `cursor`
    pub fn start(mut self, cursor: Cursor) -> Self {
        self.start = Some(cursor);
        self
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn ancestor_key(&self) -> Option<&Key> {
        self.ancestor.as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    pub fn is_keys_only(&self) -> bool {
        self.keys_only
    }

    pub fn start_cursor(&self) -> Option<&Cursor> {
        self.start.as_ref()
    }

    /// Whether the record stored under `key` falls inside this query
    pub fn matches(&self, key: &Key, properties: &PropertyMap) -> bool {
        key.kind() == self.kind
            && self
                .ancestor
                .as_ref()
                .is_none_or(|ancestor| key.has_ancestor(ancestor))
            && self.filters.iter().all(|filter| filter.matches(properties))
    }
}
