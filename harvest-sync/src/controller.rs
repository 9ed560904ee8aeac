//! Optimistic mutation controller.
//!
//! A user action is applied to the store immediately, then confirmed or rolled
//! back once the remote call settles. Each touched (entity, field) pair gets a
//! fresh [`Generation`]; a settlement only acts on fields whose latest
//! generation is still its own, so responses may arrive in any order:
//!
//! - success, still latest: nothing to do, local state is already right
//! - success, superseded: nothing to do, the newer intent governs
//! - failure, still latest: restore the snapshot and report once
//! - failure, superseded: discarded
//!
//! There is no network cancellation. A superseded call simply settles into a
//! no-op, even after its screen has cleared the store.

use crate::config::SyncConfig;
use crate::error::{SyncResult, TransportError, TransportResult};
use crate::store::{EntityStore, SettleEffect};
use crate::transport::RemoteTransport;
use futures::future::BoxFuture;
use futures::FutureExt;
use harvest_model::{FieldChange, MutationIntent, Reconcilable};
use harvest_types::{EntityId, Generation};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// A rolled-back mutation, to be surfaced to the user once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileFailure {
    pub entity_id: EntityId,
    pub operation: String,
    pub error: TransportError,
}

/// How a settled mutation was reconciled with the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciliation {
    /// The server accepted the change; local state stands.
    Confirmed,
    /// The server refused or never answered; local state was restored.
    RolledBack(ReconcileFailure),
    /// A newer intent owns every touched field; the outcome was ignored.
    Superseded,
    /// The entity left the store before settlement; the outcome was ignored.
    EntityGone,
}

/// A mutation applied locally and awaiting its remote outcome.
///
/// The remote call is issued when [`settle`](Self::settle) is first polled.
/// Spawn it to keep the caller unblocked.
#[must_use = "a pending mutation does nothing until settled"]
pub struct PendingMutation<E: Reconcilable> {
    entity_id: EntityId,
    operation: String,
    pre_state: Vec<FieldChange<E::Field>>,
    generations: Vec<(E::Field, Generation)>,
    remote: BoxFuture<'static, TransportResult<()>>,
    timeout: Duration,
}

impl<E: Reconcilable> PendingMutation<E> {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Field values as they were before this mutation.
    pub fn pre_state(&self) -> &[FieldChange<E::Field>] {
        &self.pre_state
    }

    /// The generation this mutation holds for `field`, if it touches it.
    pub fn generation(&self, field: E::Field) -> Option<Generation> {
        self.generations
            .iter()
            .find(|(f, _)| *f == field)
            .map(|(_, g)| *g)
    }

    /// Runs the remote call, bounded by the configured timeout.
    pub async fn settle(self) -> Settlement<E> {
        let outcome = match tokio::time::timeout(self.timeout, self.remote).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };
        Settlement {
            entity_id: self.entity_id,
            operation: self.operation,
            pre_state: self.pre_state,
            generations: self.generations,
            outcome,
        }
    }
}

impl<E: Reconcilable> std::fmt::Debug for PendingMutation<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PendingMutation")
            .field("entity_id", &self.entity_id)
            .field("operation", &self.operation)
            .field("generations", &self.generations)
            .finish_non_exhaustive()
    }
}

/// The remote outcome of a [`PendingMutation`], ready to reconcile.
#[derive(Debug)]
pub struct Settlement<E: Reconcilable> {
    entity_id: EntityId,
    operation: String,
    pre_state: Vec<FieldChange<E::Field>>,
    generations: Vec<(E::Field, Generation)>,
    outcome: TransportResult<()>,
}

impl<E: Reconcilable> Settlement<E> {
    pub fn entity_id(&self) -> &EntityId {
        &self.entity_id
    }

    pub fn outcome(&self) -> &TransportResult<()> {
        &self.outcome
    }

    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Applies intents optimistically and reconciles their remote outcomes.
pub struct MutationController {
    transport: Arc<dyn RemoteTransport>,
    timeout: Duration,
}

impl MutationController {
    pub fn new(transport: Arc<dyn RemoteTransport>, config: &SyncConfig) -> Self {
        Self {
            transport,
            timeout: config.remote_timeout(),
        }
    }

    /// Applies `intent` to `store` and prepares its remote call.
    ///
    /// Returns `Ok(None)` without touching anything when the target entity is
    /// not in the store or the intent changes no fields. Fails only when the
    /// intent assigns a value of the wrong kind.
    pub fn begin_mutation<E: Reconcilable>(
        &self,
        intent: MutationIntent<E>,
        store: &mut EntityStore<E>,
    ) -> SyncResult<Option<PendingMutation<E>>> {
        if intent.is_empty() {
            debug!("Ignoring empty {} intent for {}", intent.operation, intent.entity_id);
            return Ok(None);
        }

        let Some(applied) = store.apply(&intent)? else {
            debug!("Entity {} gone, {} is a no-op", intent.entity_id, intent.operation);
            return Ok(None);
        };
        debug!(
            "Applied {} to {} at {:?}",
            intent.operation, intent.entity_id, applied.generations
        );

        let transport = Arc::clone(&self.transport);
        let MutationIntent {
            entity_id,
            operation,
            payload,
            ..
        } = intent;
        let remote = {
            let entity_id = entity_id.clone();
            let operation = operation.clone();
            async move { transport.mutate(&operation, &entity_id, payload).await }.boxed()
        };

        Ok(Some(PendingMutation {
            entity_id,
            operation,
            pre_state: applied.pre_state,
            generations: applied.generations,
            remote,
            timeout: self.timeout,
        }))
    }

    /// Confirms or rolls back a settled mutation against `store`.
    pub fn reconcile<E: Reconcilable>(
        &self,
        settlement: Settlement<E>,
        store: &mut EntityStore<E>,
    ) -> Reconciliation {
        let Settlement {
            entity_id,
            operation,
            pre_state,
            generations,
            outcome,
        } = settlement;

        match outcome {
            Ok(()) => match store.confirm(&entity_id, &generations) {
                SettleEffect::EntityGone => {
                    debug!("Confirmed {} for {} after it left the store", operation, entity_id);
                    Reconciliation::EntityGone
                }
                SettleEffect::Superseded => {
                    debug!("Stale success for {} on {}, ignored", operation, entity_id);
                    Reconciliation::Superseded
                }
                SettleEffect::Settled(_) => {
                    debug!("Confirmed {} for {}", operation, entity_id);
                    Reconciliation::Confirmed
                }
            },
            Err(error) => match store.rollback(&entity_id, &pre_state, &generations) {
                SettleEffect::EntityGone => {
                    debug!("Dropped failed {} for departed {}: {}", operation, entity_id, error);
                    Reconciliation::EntityGone
                }
                SettleEffect::Superseded => {
                    debug!("Stale failure for {} on {} discarded: {}", operation, entity_id, error);
                    Reconciliation::Superseded
                }
                SettleEffect::Settled(restored) => {
                    warn!(
                        "Rolled back {} on {} ({} fields): {}",
                        operation, entity_id, restored, error
                    );
                    Reconciliation::RolledBack(ReconcileFailure {
                        entity_id,
                        operation,
                        error,
                    })
                }
            },
        }
    }
}
