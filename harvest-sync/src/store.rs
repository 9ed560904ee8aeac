//! Client-side entity store.
//!
//! Holds one ordered collection of entities plus the generation bookkeeping
//! for optimistic mutations. Outside this crate the store can only be changed
//! through page merges, full replacement and explicit removal; field writes go
//! through the [`MutationController`](crate::MutationController).

use crate::merge::{dedup_by_id, fresh_entities, MergePolicy};
use harvest_model::{FieldChange, ModelResult, MutationIntent, Reconcilable};
use harvest_types::{EntityId, Generation};
use std::collections::HashMap;
use tracing::debug;

/// Reconciliation state of one (entity, field) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldState {
    Idle,
    Pending(Generation),
}

#[derive(Debug, Clone, Copy, Default)]
struct FieldSlot {
    latest: Generation,
    pending: bool,
}

/// What the store did with a settled mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SettleEffect {
    /// The entity no longer exists.
    EntityGone,
    /// Every field was superseded by a newer generation.
    Superseded,
    /// This many fields were still owned by the settling generation.
    Settled(usize),
}

/// Snapshot taken when a mutation is applied.
pub(crate) struct Applied<F> {
    pub pre_state: Vec<FieldChange<F>>,
    pub generations: Vec<(F, Generation)>,
}

/// Ordered, id-unique collection of entities.
#[derive(Debug, Clone)]
pub struct EntityStore<E: Reconcilable> {
    items: Vec<E>,
    index: HashMap<EntityId, usize>,
    // Kept across remove/clear/replace_all but retired there, so a late
    // settlement for an entity that left the store never matches again.
    slots: HashMap<(EntityId, E::Field), FieldSlot>,
}

impl<E: Reconcilable> Default for EntityStore<E> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
            slots: HashMap::new(),
        }
    }
}

impl<E: Reconcilable> EntityStore<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store from a collection, dropping duplicate ids.
    pub fn from_items(items: Vec<E>) -> Self {
        let mut store = Self::new();
        store.replace_all(items);
        store
    }

    // ── Reads ────────────────────────────────────────────────────

    pub fn get(&self, id: &EntityId) -> Option<&E> {
        self.index.get(id).map(|&i| &self.items[i])
    }

    pub fn contains(&self, id: &EntityId) -> bool {
        self.index.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.items.iter()
    }

    /// The collection in display order.
    pub fn items(&self) -> &[E] {
        &self.items
    }

    pub fn ids(&self) -> impl Iterator<Item = &EntityId> {
        self.items.iter().map(|e| e.id())
    }

    /// Whether a mutation is awaiting settlement for this field.
    pub fn field_state(&self, id: &EntityId, field: E::Field) -> FieldState {
        match self.slots.get(&(id.clone(), field)) {
            Some(slot) if slot.pending => FieldState::Pending(slot.latest),
            _ => FieldState::Idle,
        }
    }

    /// The most recent generation issued for this field.
    pub fn last_generation(&self, id: &EntityId, field: E::Field) -> Generation {
        self.slots
            .get(&(id.clone(), field))
            .map(|slot| slot.latest)
            .unwrap_or(Generation::ZERO)
    }

    // ── Collection writes ────────────────────────────────────────

    /// Merges a fetched page, returning how many entities were added.
    pub fn merge_page(&mut self, incoming: Vec<E>, policy: MergePolicy) -> usize {
        let fresh = fresh_entities(&self.items, incoming);
        let added = fresh.len();
        if added == 0 {
            return 0;
        }
        match policy {
            MergePolicy::PrependNew => {
                let tail = std::mem::replace(&mut self.items, fresh);
                self.items.extend(tail);
            }
            MergePolicy::AppendNew => self.items.extend(fresh),
        }
        self.reindex();
        debug!("Merged {} new entities ({:?}), {} held", added, policy, self.items.len());
        added
    }

    /// Replaces the whole collection, as on a full reload.
    ///
    /// Every previous entity counts as removed, even if the new collection
    /// holds a fresh copy with the same id.
    pub fn replace_all(&mut self, items: Vec<E>) {
        self.retire_slots(|_| true);
        self.items = dedup_by_id(items);
        self.reindex();
    }

    /// Removes one entity. Pending settlements for it become no-ops.
    pub fn remove(&mut self, id: &EntityId) -> Option<E> {
        let position = self.index.get(id).copied()?;
        let removed = self.items.remove(position);
        self.retire_slots(|slot_id| slot_id == id);
        self.reindex();
        Some(removed)
    }

    /// Drops every entity, e.g. when the owning screen is torn down.
    pub fn clear(&mut self) {
        self.retire_slots(|_| true);
        self.items.clear();
        self.index.clear();
    }

    /// Moves matching slots past every generation issued so far.
    fn retire_slots(&mut self, mut affected: impl FnMut(&EntityId) -> bool) {
        let mut retired = 0;
        for ((id, _), slot) in self.slots.iter_mut() {
            if affected(id) {
                if slot.pending {
                    retired += 1;
                }
                slot.latest = slot.latest.next();
                slot.pending = false;
            }
        }
        if retired > 0 {
            debug!("Retired {} pending field generations", retired);
        }
    }

    fn reindex(&mut self) {
        self.index = self
            .items
            .iter()
            .enumerate()
            .map(|(i, e)| (e.id().clone(), i))
            .collect();
    }

    fn get_mut(&mut self, id: &EntityId) -> Option<&mut E> {
        let position = self.index.get(id).copied()?;
        self.items.get_mut(position)
    }

    // ── Mutation bookkeeping (controller only) ───────────────────

    /// Snapshots, issues generations and applies `intent` in one step.
    ///
    /// Returns `Ok(None)` when the target is gone. A type mismatch leaves the
    /// entity and its generations untouched.
    pub(crate) fn apply(&mut self, intent: &MutationIntent<E>) -> ModelResult<Option<Applied<E::Field>>> {
        let Some(current) = self.get(&intent.entity_id) else {
            return Ok(None);
        };

        let mut updated = current.clone();
        let mut pre_state = Vec::with_capacity(intent.changes.len());
        for change in &intent.changes {
            pre_state.push(FieldChange::new(change.field, current.field(change.field)));
            updated.set_field(change.field, change.value.clone())?;
        }

        let generations = intent
            .changes
            .iter()
            .map(|change| {
                let slot = self
                    .slots
                    .entry((intent.entity_id.clone(), change.field))
                    .or_default();
                slot.latest = slot.latest.next();
                slot.pending = true;
                (change.field, slot.latest)
            })
            .collect();

        if let Some(entity) = self.get_mut(&intent.entity_id) {
            *entity = updated;
        }
        Ok(Some(Applied {
            pre_state,
            generations,
        }))
    }

    /// Marks the fields still owned by `generations` as settled.
    pub(crate) fn confirm(&mut self, id: &EntityId, generations: &[(E::Field, Generation)]) -> SettleEffect {
        let owned = self.release_owned(id, generations);
        if !self.contains(id) {
            return SettleEffect::EntityGone;
        }
        if owned.is_empty() {
            SettleEffect::Superseded
        } else {
            SettleEffect::Settled(owned.len())
        }
    }

    /// Restores `pre_state` for the fields still owned by `generations`.
    ///
    /// Fields taken over by a newer generation keep whatever that generation
    /// applied.
    pub(crate) fn rollback(
        &mut self,
        id: &EntityId,
        pre_state: &[FieldChange<E::Field>],
        generations: &[(E::Field, Generation)],
    ) -> SettleEffect {
        let owned = self.release_owned(id, generations);
        let Some(entity) = self.get_mut(id) else {
            return SettleEffect::EntityGone;
        };
        if owned.is_empty() {
            return SettleEffect::Superseded;
        }

        let mut restored = 0;
        for snapshot in pre_state.iter().filter(|s| owned.contains(&s.field)) {
            // The snapshot was read from this very field, so the kinds match.
            if entity.set_field(snapshot.field, snapshot.value.clone()).is_ok() {
                restored += 1;
            }
        }
        SettleEffect::Settled(restored)
    }

    /// Returns the fields whose latest generation is the given one, moving
    /// them back to idle.
    fn release_owned(&mut self, id: &EntityId, generations: &[(E::Field, Generation)]) -> Vec<E::Field> {
        generations
            .iter()
            .filter_map(|&(field, generation)| {
                let slot = self.slots.get_mut(&(id.clone(), field))?;
                if slot.latest == generation {
                    slot.pending = false;
                    Some(field)
                } else {
                    None
                }
            })
            .collect()
    }
}
