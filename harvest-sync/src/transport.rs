//! Remote transport abstraction.
//!
//! The HTTP client lives outside this crate. Anything that can fetch a page
//! of raw records and run a named mutation can back the loaders and the
//! mutation controller.

use crate::error::TransportResult;
use crate::pagination::PageRequest;
use async_trait::async_trait;
use harvest_types::{EntityId, RawRecord};
use std::collections::BTreeMap;

/// Query filters passed through to the service verbatim.
pub type Filters = BTreeMap<String, String>;

/// The remote service as seen by the data layer.
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Fetches one page of `resource`.
    ///
    /// The response may be a single record, a sequence, or an envelope around
    /// a sequence; see [`records_from_response`](harvest_model::records_from_response).
    async fn fetch_page(
        &self,
        resource: &str,
        page: PageRequest,
        filters: &Filters,
    ) -> TransportResult<RawRecord>;

    /// Runs a mutation against one entity.
    async fn mutate(
        &self,
        operation: &str,
        entity_id: &EntityId,
        payload: serde_json::Value,
    ) -> TransportResult<()>;
}

/// A scripted transport for testing.
pub mod mock {
    use super::*;
    use crate::error::TransportError;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Mutex, MutexGuard, PoisonError};
    use std::time::Duration;

    /// A recorded `fetch_page` call.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct FetchCall {
        pub resource: String,
        pub page: PageRequest,
        pub filters: Filters,
    }

    /// A recorded `mutate` call.
    #[derive(Debug, Clone, PartialEq)]
    pub struct MutationCall {
        pub operation: String,
        pub entity_id: EntityId,
        pub payload: serde_json::Value,
    }

    struct Scripted<T> {
        result: TransportResult<T>,
        delay: Option<Duration>,
    }

    /// Answers fetches and mutations from queued scripts.
    ///
    /// Unscripted fetches return an empty page; unscripted mutations succeed.
    /// Mutation scripts queued for a specific operation take precedence over
    /// the generic queue.
    #[derive(Default)]
    pub struct MockTransport {
        pages: Mutex<VecDeque<Scripted<RawRecord>>>,
        mutations: Mutex<VecDeque<Scripted<()>>>,
        by_operation: Mutex<HashMap<String, VecDeque<Scripted<()>>>>,
        fetch_log: Mutex<Vec<FetchCall>>,
        mutation_log: Mutex<Vec<MutationCall>>,
        latency: Option<Duration>,
    }

    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self::default()
        }

        /// Delays every unscripted-delay call by `latency`.
        #[must_use]
        pub fn with_latency(mut self, latency: Duration) -> Self {
            self.latency = Some(latency);
            self
        }

        /// Queues the response to the next fetch.
        pub fn queue_page(&self, response: RawRecord) {
            lock(&self.pages).push_back(Scripted {
                result: Ok(response),
                delay: None,
            });
        }

        /// Queues a failure for the next fetch.
        pub fn queue_fetch_error(&self, error: TransportError) {
            lock(&self.pages).push_back(Scripted {
                result: Err(error),
                delay: None,
            });
        }

        /// Queues the outcome of the next mutation of any operation.
        pub fn queue_mutation(&self, result: TransportResult<()>) {
            lock(&self.mutations).push_back(Scripted { result, delay: None });
        }

        /// Queues the outcome of the next `operation` call, settling after `delay`.
        pub fn queue_operation(&self, operation: &str, result: TransportResult<()>, delay: Duration) {
            lock(&self.by_operation)
                .entry(operation.to_string())
                .or_default()
                .push_back(Scripted {
                    result,
                    delay: Some(delay),
                });
        }

        pub fn fetch_calls(&self) -> Vec<FetchCall> {
            lock(&self.fetch_log).clone()
        }

        pub fn mutation_calls(&self) -> Vec<MutationCall> {
            lock(&self.mutation_log).clone()
        }

        async fn wait(&self, delay: Option<Duration>) {
            if let Some(delay) = delay.or(self.latency) {
                tokio::time::sleep(delay).await;
            }
        }
    }

    #[async_trait]
    impl RemoteTransport for MockTransport {
        async fn fetch_page(
            &self,
            resource: &str,
            page: PageRequest,
            filters: &Filters,
        ) -> TransportResult<RawRecord> {
            lock(&self.fetch_log).push(FetchCall {
                resource: resource.to_string(),
                page,
                filters: filters.clone(),
            });
            let script = lock(&self.pages).pop_front();
            let (result, delay) = match script {
                Some(s) => (s.result, s.delay),
                None => (Ok(RawRecord::Array(Vec::new())), None),
            };
            self.wait(delay).await;
            result
        }

        async fn mutate(
            &self,
            operation: &str,
            entity_id: &EntityId,
            payload: serde_json::Value,
        ) -> TransportResult<()> {
            lock(&self.mutation_log).push(MutationCall {
                operation: operation.to_string(),
                entity_id: entity_id.clone(),
                payload,
            });
            let script = lock(&self.by_operation)
                .get_mut(operation)
                .and_then(VecDeque::pop_front)
                .or_else(|| lock(&self.mutations).pop_front());
            let (result, delay) = match script {
                Some(s) => (s.result, s.delay),
                None => (Ok(()), None),
            };
            self.wait(delay).await;
            result
        }
    }
}
