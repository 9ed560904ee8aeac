use crate::{EntityField, FieldChange, Reconcilable};
use harvest_types::EntityId;
use serde_json::{Map, Value};

/// A local state change the user asked for.
///
/// Carries the field assignments to apply optimistically and the remote
/// operation (name + payload) that confirms them.
#[derive(Debug, Clone)]
pub struct MutationIntent<E: Reconcilable> {
    pub entity_id: EntityId,
    pub operation: String,
    pub changes: Vec<FieldChange<E::Field>>,
    pub payload: Value,
}

impl<E: Reconcilable> MutationIntent<E> {
    /// Creates an intent whose payload is an object of `{field: value}` pairs.
    ///
    /// If a field is listed more than once the last assignment wins.
    pub fn new(
        entity_id: EntityId,
        operation: impl Into<String>,
        changes: Vec<FieldChange<E::Field>>,
    ) -> Self {
        let mut deduped: Vec<FieldChange<E::Field>> = Vec::with_capacity(changes.len());
        for change in changes {
            match deduped.iter_mut().find(|c| c.field == change.field) {
                Some(existing) => existing.value = change.value,
                None => deduped.push(change),
            }
        }

        let mut payload = Map::new();
        for change in &deduped {
            payload.insert(change.field.as_str().to_string(), change.value.to_json());
        }

        Self {
            entity_id,
            operation: operation.into(),
            changes: deduped,
            payload: Value::Object(payload),
        }
    }

    /// Replaces the remote payload.
    #[must_use]
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// The fields this intent touches, in order.
    pub fn fields(&self) -> impl Iterator<Item = E::Field> + '_ {
        self.changes.iter().map(|c| c.field)
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}
