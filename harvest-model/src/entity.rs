use crate::{ModelError, ModelResult};
use harvest_types::EntityId;
use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::hash::Hash;

/// A typed value held by a mutable entity field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Count(u64),
    Text(String),
}

impl FieldValue {
    /// Name of the value kind, for error messages.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Count(_) => "count",
            Self::Text(_) => "text",
        }
    }

    /// JSON representation used in remote mutation payloads.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Bool(b) => serde_json::Value::Bool(*b),
            Self::Count(n) => serde_json::Value::from(*n),
            Self::Text(s) => serde_json::Value::String(s.clone()),
        }
    }

    pub(crate) fn into_bool(self, field: &'static str) -> ModelResult<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            other => Err(mismatch(field, "bool", &other)),
        }
    }

    pub(crate) fn into_count(self, field: &'static str) -> ModelResult<u64> {
        match self {
            Self::Count(n) => Ok(n),
            other => Err(mismatch(field, "count", &other)),
        }
    }

    pub(crate) fn into_text(self, field: &'static str) -> ModelResult<String> {
        match self {
            Self::Text(s) => Ok(s),
            other => Err(mismatch(field, "text", &other)),
        }
    }
}

fn mismatch(field: &'static str, expected: &'static str, found: &FieldValue) -> ModelError {
    ModelError::FieldTypeMismatch {
        field,
        expected,
        found: found.kind(),
    }
}

/// One field assignment within a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange<F> {
    pub field: F,
    pub value: FieldValue,
}

impl<F> FieldChange<F> {
    pub fn new(field: F, value: FieldValue) -> Self {
        Self { field, value }
    }
}

/// A mutable field of a [`Reconcilable`] entity.
pub trait EntityField: Copy + Eq + Hash + Debug + Send + Sync + 'static {
    /// Wire name of the field, used as the key in mutation payloads.
    fn as_str(&self) -> &'static str;
}

/// An entity that can take part in optimistic mutation.
///
/// The controller snapshots fields with [`field`](Self::field), applies new
/// values with [`set_field`](Self::set_field) and restores snapshots the same
/// way. Implementations must make `set_field` all-or-nothing: on error the
/// entity is left unchanged.
pub trait Reconcilable: Clone + Send + Sync + 'static {
    type Field: EntityField;

    /// Stable identity of this entity.
    fn id(&self) -> &EntityId;

    /// Reads the current value of a field.
    fn field(&self, field: Self::Field) -> FieldValue;

    /// Writes a field.
    fn set_field(&mut self, field: Self::Field, value: FieldValue) -> ModelResult<()>;
}
