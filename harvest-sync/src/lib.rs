//! Optimistic mutation and data reconciliation for the Harvest client.
//!
//! Sits between the remote service and the UI, keeping local collections
//! consistent while the backend is slow, unreliable or inconsistent.
//!
//! # Architecture
//!
//! ## Components
//!
//! - **Merge**: folds a fetched page into a collection without duplicating ids
//!   or overwriting entities already held
//! - **Pagination**: tracks page index, exhaustion and in-flight fetches
//! - **Store**: the single shared collection plus per-field generation tokens
//! - **Controller**: applies intents optimistically and reconciles outcomes
//! - **Loader** / **Reconciler**: async drivers wiring the above to a
//!   [`RemoteTransport`]
//!
//! ## Flows
//!
//! 1. **Fetch**: transport → normalize each record → merge → advance cursor
//! 2. **Mutate**: intent → snapshot + new generation → local apply → remote
//!    call → confirm, or roll back if still the latest generation
//!
//! # Example
//!
//! ```
//! use harvest_model::FeedPost;
//! use harvest_sync::{EntityStore, MergePolicy, PaginationCursor};
//! use serde_json::json;
//!
//! let page: Vec<FeedPost> = harvest_model::normalize_batch(
//!     &[json!({"id": "1", "author": "Amina"}), json!(null)],
//!     &Default::default(),
//! );
//! let mut store = EntityStore::new();
//! store.merge_page(page, MergePolicy::AppendNew);
//! assert_eq!(store.len(), 1);
//!
//! let cursor = PaginationCursor::new(10).advance(1);
//! assert!(!cursor.has_more);
//! ```

mod config;
mod controller;
mod error;
mod loader;
pub mod merge;
pub mod pagination;
mod reconciler;
pub mod store;
pub mod transport;

pub use config::SyncConfig;
pub use controller::{
    MutationController, PendingMutation, ReconcileFailure, Reconciliation, Settlement,
};
pub use error::{SyncError, SyncResult, TransportError, TransportResult};
pub use loader::{LoadOutcome, PageLoader};
pub use merge::{merge_page, MergePolicy};
pub use pagination::{PageRequest, PaginationCursor};
pub use reconciler::Reconciler;
pub use store::{EntityStore, FieldState};
pub use transport::{Filters, RemoteTransport};
