//! Fetch flow: remote page → normalize → merge → advance cursor.

use crate::config::SyncConfig;
use crate::error::{SyncResult, TransportError, TransportResult};
use crate::merge::MergePolicy;
use crate::pagination::{PageRequest, PaginationCursor};
use crate::store::EntityStore;
use crate::transport::{Filters, RemoteTransport};
use harvest_model::{normalize_batch, records_from_response, Normalize, NormalizeContext, Reconcilable};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Result of a load request that did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and merged.
    Loaded {
        /// Records the server sent, before normalization.
        returned: usize,
        /// Entities that were new to the store.
        added: usize,
        has_more: bool,
    },
    /// Another fetch on this loader has not settled yet.
    InFlight,
    /// The last page was short; nothing more to fetch.
    Exhausted,
}

/// Pages a remote collection into a shared [`EntityStore`].
///
/// A failed fetch leaves the store exactly as it was and always clears the
/// in-flight flag.
///
/// Lock order is cursor, then store. Never take the cursor while holding the
/// store.
pub struct PageLoader<E: Reconcilable + Normalize> {
    store: Arc<Mutex<EntityStore<E>>>,
    transport: Arc<dyn RemoteTransport>,
    cursor: Mutex<PaginationCursor>,
    resource: String,
    filters: Filters,
    context: NormalizeContext,
    timeout: Duration,
}

impl<E: Reconcilable + Normalize> PageLoader<E> {
    pub fn new(
        store: Arc<Mutex<EntityStore<E>>>,
        transport: Arc<dyn RemoteTransport>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            store,
            transport,
            cursor: Mutex::new(PaginationCursor::new(config.page_size)),
            resource: config.resource.clone(),
            filters: Filters::new(),
            context: NormalizeContext::default(),
            timeout: config.remote_timeout(),
        }
    }

    #[must_use]
    pub fn with_filters(mut self, filters: Filters) -> Self {
        self.filters = filters;
        self
    }

    #[must_use]
    pub fn with_context(mut self, context: NormalizeContext) -> Self {
        self.context = context;
        self
    }

    pub fn store(&self) -> &Arc<Mutex<EntityStore<E>>> {
        &self.store
    }

    /// Current cursor state.
    pub async fn cursor(&self) -> PaginationCursor {
        *self.cursor.lock().await
    }

    /// Fetches the next page and appends what is new.
    pub async fn load_next(&self) -> SyncResult<LoadOutcome> {
        let request = {
            let mut cursor = self.cursor.lock().await;
            if cursor.fetch_in_flight {
                return Ok(LoadOutcome::InFlight);
            }
            let Some(request) = cursor.request_next() else {
                return Ok(LoadOutcome::Exhausted);
            };
            cursor.fetch_in_flight = true;
            request
        };

        let fetched = self.fetch(request).await;

        let mut cursor = self.cursor.lock().await;
        cursor.fetch_in_flight = false;
        let (returned, entities) = fetched?;
        let added = self
            .store
            .lock()
            .await
            .merge_page(entities, MergePolicy::AppendNew);
        *cursor = cursor.advance(returned);

        Ok(LoadOutcome::Loaded {
            returned,
            added,
            has_more: cursor.has_more,
        })
    }

    /// Fetches the first page and puts anything new at the front.
    ///
    /// The cursor is left alone; already-loaded pages stay loaded.
    pub async fn refresh(&self) -> SyncResult<LoadOutcome> {
        let Some(request) = self.begin_first_page().await else {
            return Ok(LoadOutcome::InFlight);
        };

        let fetched = self.fetch(request).await;

        let mut cursor = self.cursor.lock().await;
        cursor.fetch_in_flight = false;
        let (returned, entities) = fetched?;
        let added = self
            .store
            .lock()
            .await
            .merge_page(entities, MergePolicy::PrependNew);

        Ok(LoadOutcome::Loaded {
            returned,
            added,
            has_more: cursor.has_more,
        })
    }

    /// Fetches the first page and replaces the whole collection with it,
    /// restarting pagination.
    pub async fn reload(&self) -> SyncResult<LoadOutcome> {
        let Some(request) = self.begin_first_page().await else {
            return Ok(LoadOutcome::InFlight);
        };

        let fetched = self.fetch(request).await;

        let mut cursor = self.cursor.lock().await;
        cursor.fetch_in_flight = false;
        let (returned, entities) = fetched?;
        let mut store = self.store.lock().await;
        store.replace_all(entities);
        *cursor = PaginationCursor::new(cursor.page_size).advance(returned);

        Ok(LoadOutcome::Loaded {
            returned,
            added: store.len(),
            has_more: cursor.has_more,
        })
    }

    async fn begin_first_page(&self) -> Option<PageRequest> {
        let mut cursor = self.cursor.lock().await;
        if cursor.fetch_in_flight {
            return None;
        }
        cursor.fetch_in_flight = true;
        Some(cursor.first_page())
    }

    /// Runs one bounded fetch, returning the raw record count and the
    /// normalized entities.
    async fn fetch(&self, request: PageRequest) -> TransportResult<(usize, Vec<E>)> {
        debug!("Fetching {} page {}", self.resource, request.page_index);
        let call = self
            .transport
            .fetch_page(&self.resource, request, &self.filters);
        let response = match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(TransportError::Timeout),
        };

        match response {
            Ok(raw) => {
                let records = records_from_response(raw);
                let entities = normalize_batch(&records, &self.context);
                Ok((records.len(), entities))
            }
            Err(e) => {
                warn!("Fetch of {} page {} failed: {}", self.resource, request.page_index, e);
                Err(e)
            }
        }
    }
}
