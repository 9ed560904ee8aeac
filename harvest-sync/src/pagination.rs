//! Pagination cursor tracking.
//!
//! A cursor is exhausted once a page comes back short. From then on
//! [`PaginationCursor::request_next`] yields nothing and the page index stays
//! where it was.

use serde::{Deserialize, Serialize};
use tracing::info;

/// Which page to ask the server for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    pub page_index: u32,
    pub page_size: usize,
}

/// Paging state for one remote collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginationCursor {
    pub page_index: u32,
    pub page_size: usize,
    pub has_more: bool,
    pub fetch_in_flight: bool,
}

impl PaginationCursor {
    /// A cursor positioned on the first page. A zero page size is raised to one,
    /// otherwise every page would look full.
    pub fn new(page_size: usize) -> Self {
        Self {
            page_index: 0,
            page_size: page_size.max(1),
            has_more: true,
            fetch_in_flight: false,
        }
    }

    /// Records that a page came back with `returned` records.
    ///
    /// `has_more` becomes whether the page was full. A page with more records
    /// than `page_size` also counts as full. The page index moves on only if
    /// more pages were expected before this call.
    #[must_use]
    pub fn advance(&self, returned: usize) -> Self {
        let has_more = returned >= self.page_size;
        let page_index = if self.has_more {
            self.page_index.saturating_add(1)
        } else {
            self.page_index
        };

        if self.has_more && !has_more {
            info!(
                "Pagination exhausted at page {} ({} of {} records)",
                self.page_index, returned, self.page_size
            );
        }

        Self {
            page_index,
            has_more,
            ..*self
        }
    }

    /// The next page to fetch, or `None` if the collection is exhausted or a
    /// fetch is already running.
    ///
    /// Callers set `fetch_in_flight` before issuing the request and clear it
    /// when the request settles, successfully or not.
    pub fn request_next(&self) -> Option<PageRequest> {
        if !self.has_more || self.fetch_in_flight {
            return None;
        }
        Some(PageRequest {
            page_index: self.page_index,
            page_size: self.page_size,
        })
    }

    /// Request for the first page, used by refresh and reload.
    pub fn first_page(&self) -> PageRequest {
        PageRequest {
            page_index: 0,
            page_size: self.page_size,
        }
    }
}
