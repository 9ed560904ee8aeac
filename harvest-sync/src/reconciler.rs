//! Background reconciliation driver.
//!
//! Wraps a shared store and a [`MutationController`] so the UI can fire an
//! intent and move on: the local change lands before `dispatch` returns, the
//! remote call settles on a spawned task, and a rollback is published once on
//! the failure channel.

use crate::controller::{MutationController, ReconcileFailure, Reconciliation};
use crate::error::SyncResult;
use crate::store::EntityStore;
use harvest_model::{MutationIntent, Reconcilable};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

pub struct Reconciler<E: Reconcilable> {
    store: Arc<Mutex<EntityStore<E>>>,
    controller: Arc<MutationController>,
    failures: mpsc::UnboundedSender<ReconcileFailure>,
}

impl<E: Reconcilable> Reconciler<E> {
    /// Creates a reconciler and the receiving end of its failure channel.
    pub fn new(
        store: Arc<Mutex<EntityStore<E>>>,
        controller: Arc<MutationController>,
    ) -> (Self, mpsc::UnboundedReceiver<ReconcileFailure>) {
        let (failures, rx) = mpsc::unbounded_channel();
        (
            Self {
                store,
                controller,
                failures,
            },
            rx,
        )
    }

    pub fn store(&self) -> &Arc<Mutex<EntityStore<E>>> {
        &self.store
    }

    /// Applies `intent` now and settles it in the background.
    ///
    /// Returns `Ok(None)` if the intent was a no-op. The handle resolves to the
    /// reconciliation once the remote call settles; dropping it is fine.
    pub async fn dispatch(
        &self,
        intent: MutationIntent<E>,
    ) -> SyncResult<Option<JoinHandle<Reconciliation>>> {
        let pending = {
            let mut store = self.store.lock().await;
            self.controller.begin_mutation(intent, &mut store)?
        };
        let Some(pending) = pending else {
            return Ok(None);
        };

        let store = Arc::clone(&self.store);
        let controller = Arc::clone(&self.controller);
        let failures = self.failures.clone();
        let handle = tokio::spawn(async move {
            let settlement = pending.settle().await;
            let outcome = {
                let mut store = store.lock().await;
                controller.reconcile(settlement, &mut store)
            };
            if let Reconciliation::RolledBack(failure) = &outcome {
                if failures.send(failure.clone()).is_err() {
                    debug!("No listener for failure of {} on {}", failure.operation, failure.entity_id);
                }
            }
            outcome
        });
        Ok(Some(handle))
    }
}
