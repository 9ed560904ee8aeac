use harvest_sync::{PageRequest, PaginationCursor};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_cursor_expects_more() {
    let cursor = PaginationCursor::new(10);
    assert_eq!(cursor.page_index, 0);
    assert_eq!(cursor.page_size, 10);
    assert!(cursor.has_more);
    assert!(!cursor.fetch_in_flight);
}

#[test]
fn zero_page_size_is_raised() {
    assert_eq!(PaginationCursor::new(0).page_size, 1);
}

// ── advance ──────────────────────────────────────────────────────

#[test]
fn short_page_exhausts() {
    let cursor = PaginationCursor::new(10).advance(7);
    assert!(!cursor.has_more);
    assert_eq!(cursor.page_index, 1);
}

#[test]
fn full_page_keeps_going() {
    let cursor = PaginationCursor::new(10).advance(10);
    assert!(cursor.has_more);
    assert_eq!(cursor.page_index, 1);
}

#[test]
fn empty_page_exhausts() {
    assert!(!PaginationCursor::new(10).advance(0).has_more);
}

#[test]
fn oversized_page_counts_as_full() {
    assert!(PaginationCursor::new(10).advance(12).has_more);
}

#[test]
fn exhausted_cursor_keeps_page_index() {
    let exhausted = PaginationCursor::new(10).advance(10).advance(3);
    assert_eq!(exhausted.page_index, 2);

    let again = exhausted.advance(10);
    assert_eq!(again.page_index, 2);
    assert!(again.has_more);
}

#[test]
fn advance_preserves_in_flight_flag() {
    let mut cursor = PaginationCursor::new(5);
    cursor.fetch_in_flight = true;
    assert!(cursor.advance(5).fetch_in_flight);
}

// ── request_next ─────────────────────────────────────────────────

#[test]
fn request_next_uses_page_index() {
    let cursor = PaginationCursor::new(10).advance(10);
    assert_eq!(
        cursor.request_next(),
        Some(PageRequest {
            page_index: 1,
            page_size: 10
        })
    );
}

#[test]
fn request_next_none_when_exhausted() {
    assert_eq!(PaginationCursor::new(10).advance(2).request_next(), None);
}

#[test]
fn request_next_none_while_in_flight() {
    let mut cursor = PaginationCursor::new(10);
    cursor.fetch_in_flight = true;
    assert_eq!(cursor.request_next(), None);
    cursor.fetch_in_flight = false;
    assert!(cursor.request_next().is_some());
}

#[test]
fn first_page_ignores_position() {
    let cursor = PaginationCursor::new(10).advance(10).advance(10);
    assert_eq!(cursor.first_page().page_index, 0);
}

#[test]
fn cursor_serializes_camel_case() {
    let json = serde_json::to_value(PaginationCursor::new(10)).unwrap();
    assert_eq!(json["pageSize"], 10);
    assert_eq!(json["hasMore"], true);
    assert_eq!(json["fetchInFlight"], false);
}

proptest! {
    /// `has_more` is false exactly when the last page was short.
    #[test]
    fn has_more_iff_full_page(size in 1usize..50, returned in 0usize..100) {
        let cursor = PaginationCursor::new(size).advance(returned);
        prop_assert_eq!(cursor.has_more, returned >= size);
    }

    /// Once exhausted, no sequence of short pages moves the index.
    #[test]
    fn exhausted_index_is_stable(size in 1usize..50, pages in prop::collection::vec(0usize..49, 1..10)) {
        let mut cursor = PaginationCursor::new(size);
        cursor = cursor.advance(0);
        let index = cursor.page_index;
        for returned in pages {
            if returned < size {
                cursor = cursor.advance(returned);
                prop_assert_eq!(cursor.page_index, index);
                prop_assert!(cursor.request_next().is_none());
            }
        }
    }
}
