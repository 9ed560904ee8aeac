use harvest_model::{FeedPost, NormalizeContext, UserProfile};
use harvest_sync::transport::mock::MockTransport;
use harvest_sync::{
    EntityStore, Filters, LoadOutcome, PageLoader, PageRequest, SyncConfig, SyncError,
    TransportError,
};
use harvest_types::EntityId;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

type Store = Arc<Mutex<EntityStore<FeedPost>>>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn setup(config: &SyncConfig) -> (Arc<MockTransport>, Store, PageLoader<FeedPost>) {
    init_tracing();
    let transport = Arc::new(MockTransport::new());
    let store: Store = Arc::new(Mutex::new(EntityStore::new()));
    let loader = PageLoader::new(store.clone(), transport.clone(), config);
    (transport, store, loader)
}

fn raw_posts(range: std::ops::Range<u32>) -> Value {
    Value::Array(
        range
            .map(|i| json!({"id": format!("p{i}"), "authorName": "Amina", "content": format!("post {i}")}))
            .collect(),
    )
}

async fn ids(store: &Store) -> Vec<String> {
    store.lock().await.ids().map(|id| id.to_string()).collect()
}

// ── First page ───────────────────────────────────────────────────

#[tokio::test]
async fn first_page_of_mixed_shapes() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(json!([
        {"id": "p1", "authorName": "Amina", "content": "Rain at last", "createdAt": "2024-03-01T12:00:00Z"},
        {"_id": "p2", "author": {"name": "Kofi", "id": "u2"}, "text": "Selling cassava", "likes": ["u1"]},
        {"postId": 3, "user": {"username": "wanjiru"}, "body": "Goat vaccines?", "timestamp": 1709294400},
        {"id": "p4", "author": "Baraka", "caption": "Drip lines in"},
        {"_id": {"$oid": "65f0c0ffee"}, "description": "Sorghum yields"},
        {"id": "p6", "authorName": "Amina", "content": "Soil test", "likeCount": 5, "commentCount": 2},
        {"id": "p7", "author_name": "Juma", "content": "Tractor share", "created_at": {"seconds": 1709294400, "nanoseconds": 0}},
        {"uid": "p8", "user": {"displayName": "Neema"}, "content": "Irrigation schedule"},
        {"id": "p9", "authorName": "Kofi", "content": "Market prices up", "isLiked": true},
        {"id": "p10", "content": "Anonymous tip"}
    ]));

    let outcome = loader.load_next().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 10,
            added: 10,
            has_more: true
        }
    );

    let ids = ids(&store).await;
    assert_eq!(
        ids,
        vec!["p1", "p2", "3", "p4", "65f0c0ffee", "p6", "p7", "p8", "p9", "p10"]
    );
    assert_eq!(ids.iter().collect::<HashSet<_>>().len(), 10);

    let store = store.lock().await;
    let names: Vec<&str> = store.iter().map(|p| p.author_name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Amina",
            "Kofi",
            "wanjiru",
            "Baraka",
            "Unknown User",
            "Amina",
            "Juma",
            "Neema",
            "Kofi",
            "Unknown User"
        ]
    );

    let cursor = loader.cursor().await;
    assert_eq!(cursor.page_index, 1);
    assert!(cursor.has_more);
    assert!(!cursor.fetch_in_flight);
}

#[tokio::test]
async fn short_page_exhausts_loader() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..7));

    let outcome = loader.load_next().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 7,
            added: 7,
            has_more: false
        }
    );
    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::Exhausted);
    assert_eq!(transport.fetch_calls().len(), 1);
    assert_eq!(store.lock().await.len(), 7);
}

#[tokio::test]
async fn pages_append_in_order() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..10));
    transport.queue_page(raw_posts(8..15));

    loader.load_next().await.unwrap();
    let outcome = loader.load_next().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 7,
            added: 5,
            has_more: false
        }
    );

    let expected: Vec<String> = (0..15).map(|i| format!("p{i}")).collect();
    assert_eq!(ids(&store).await, expected);

    let pages: Vec<u32> = transport.fetch_calls().iter().map(|c| c.page.page_index).collect();
    assert_eq!(pages, vec![0, 1]);
}

#[tokio::test]
async fn unusable_records_count_toward_page_size() {
    let (transport, store, loader) = setup(&SyncConfig {
        page_size: 3,
        ..SyncConfig::default()
    });
    transport.queue_page(json!([{"id": "a"}, null, "junk"]));

    let outcome = loader.load_next().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 3,
            added: 1,
            has_more: true
        }
    );
    assert_eq!(store.lock().await.len(), 1);
}

#[tokio::test]
async fn envelope_responses_are_unwrapped() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(json!({"data": [{"id": "a"}, {"id": "b"}], "total": 2}));

    loader.load_next().await.unwrap();
    assert_eq!(ids(&store).await, vec!["a", "b"]);
}

#[tokio::test]
async fn request_carries_resource_and_filters() {
    let config = SyncConfig {
        resource: "community/posts".into(),
        page_size: 20,
        ..SyncConfig::default()
    };
    let (transport, _store, loader) = setup(&config);
    let filters = Filters::from([("crop".to_string(), "maize".to_string())]);
    let loader = loader.with_filters(filters.clone());

    loader.load_next().await.unwrap();

    let calls = transport.fetch_calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].resource, "community/posts");
    assert_eq!(
        calls[0].page,
        PageRequest {
            page_index: 0,
            page_size: 20
        }
    );
    assert_eq!(calls[0].filters, filters);
}

#[tokio::test]
async fn context_sets_liked_flag() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    let loader = loader.with_context(NormalizeContext::for_user("me"));
    transport.queue_page(json!([{"id": "a", "likes": ["me", "you"]}]));

    loader.load_next().await.unwrap();
    let store = store.lock().await;
    assert!(store.get(&EntityId::new("a").unwrap()).unwrap().is_liked_by_current_user);
}

// ── Failures ─────────────────────────────────────────────────────

#[tokio::test]
async fn failed_fetch_leaves_store_untouched() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..10));
    transport.queue_fetch_error(TransportError::Network("offline".into()));

    loader.load_next().await.unwrap();
    let before = store.lock().await.items().to_vec();

    let err = loader.load_next().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(TransportError::Network(_))));
    assert_eq!(store.lock().await.items(), before.as_slice());

    let cursor = loader.cursor().await;
    assert!(!cursor.fetch_in_flight);
    assert_eq!(cursor.page_index, 1);
    assert!(cursor.has_more);
}

#[tokio::test]
async fn failed_fetch_can_be_retried() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_fetch_error(TransportError::Malformed("not json".into()));
    transport.queue_page(raw_posts(0..4));

    assert!(loader.load_next().await.is_err());
    loader.load_next().await.unwrap();

    assert_eq!(store.lock().await.len(), 4);
    let pages: Vec<u32> = transport.fetch_calls().iter().map(|c| c.page.page_index).collect();
    assert_eq!(pages, vec![0, 0]);
}

#[tokio::test(start_paused = true)]
async fn slow_fetch_times_out() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_secs(60)));
    let store: Store = Arc::new(Mutex::new(EntityStore::new()));
    let config = SyncConfig {
        remote_timeout_ms: 1_000,
        ..SyncConfig::default()
    };
    let loader = PageLoader::new(store.clone(), transport.clone(), &config);
    transport.queue_page(raw_posts(0..10));

    let err = loader.load_next().await.unwrap_err();
    assert!(matches!(err, SyncError::Transport(TransportError::Timeout)));
    assert!(store.lock().await.is_empty());
    assert!(!loader.cursor().await.fetch_in_flight);
}

#[tokio::test(start_paused = true)]
async fn concurrent_load_reports_in_flight() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(200)));
    let store: Store = Arc::new(Mutex::new(EntityStore::new()));
    let loader = Arc::new(PageLoader::new(store.clone(), transport.clone(), &SyncConfig::default()));
    transport.queue_page(raw_posts(0..10));

    let background = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load_next().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(loader.cursor().await.fetch_in_flight);
    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::InFlight);
    assert_eq!(loader.refresh().await.unwrap(), LoadOutcome::InFlight);

    let outcome = background.await.unwrap().unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { added: 10, .. }));
    assert_eq!(transport.fetch_calls().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn store_stays_usable_during_fetch() {
    let transport = Arc::new(MockTransport::new().with_latency(Duration::from_millis(200)));
    let store: Store = Arc::new(Mutex::new(EntityStore::new()));
    let loader = Arc::new(PageLoader::new(store.clone(), transport.clone(), &SyncConfig::default()));
    transport.queue_page(raw_posts(0..10));

    let background = {
        let loader = Arc::clone(&loader);
        tokio::spawn(async move { loader.load_next().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(loader.cursor().await.fetch_in_flight);

    // Outlive the fetch while holding the store; the loader waits, then merges.
    {
        let mut held = store.lock().await;
        held.replace_all(Vec::new());
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert!(held.is_empty());
    }

    let outcome = background.await.unwrap().unwrap();
    assert!(matches!(outcome, LoadOutcome::Loaded { added: 10, .. }));
    assert_eq!(store.lock().await.len(), 10);
}

// ── Refresh and reload ───────────────────────────────────────────

#[tokio::test]
async fn refresh_prepends_new_posts() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..10));
    transport.queue_page(json!([
        {"id": "new1", "content": "fresh"},
        {"id": "new2", "content": "fresher"},
        {"id": "p0", "content": "edited elsewhere"}
    ]));

    loader.load_next().await.unwrap();
    let outcome = loader.refresh().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 3,
            added: 2,
            has_more: true
        }
    );

    let ids = ids(&store).await;
    assert_eq!(&ids[..3], &["new1", "new2", "p0"]);
    assert_eq!(ids.len(), 12);
    assert_eq!(
        store.lock().await.get(&EntityId::new("p0").unwrap()).unwrap().content,
        "post 0"
    );

    let cursor = loader.cursor().await;
    assert_eq!(cursor.page_index, 1);
    assert_eq!(transport.fetch_calls()[1].page.page_index, 0);
}

#[tokio::test]
async fn reload_replaces_and_restarts() {
    let (transport, store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..10));
    transport.queue_page(raw_posts(10..20));
    transport.queue_page(raw_posts(100..103));

    loader.load_next().await.unwrap();
    loader.load_next().await.unwrap();
    assert_eq!(loader.cursor().await.page_index, 2);

    let outcome = loader.reload().await.unwrap();
    assert_eq!(
        outcome,
        LoadOutcome::Loaded {
            returned: 3,
            added: 3,
            has_more: false
        }
    );
    assert_eq!(ids(&store).await, vec!["p100", "p101", "p102"]);
    assert_eq!(loader.cursor().await.page_index, 1);
    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::Exhausted);
}

#[tokio::test]
async fn reload_reopens_exhausted_feed() {
    let (transport, _store, loader) = setup(&SyncConfig::default());
    transport.queue_page(raw_posts(0..2));
    transport.queue_page(raw_posts(0..10));

    loader.load_next().await.unwrap();
    assert_eq!(loader.load_next().await.unwrap(), LoadOutcome::Exhausted);

    loader.reload().await.unwrap();
    assert!(loader.cursor().await.has_more);
}

// ── Other entities ───────────────────────────────────────────────

#[tokio::test]
async fn single_profile_record() {
    let transport = Arc::new(MockTransport::new());
    let store = Arc::new(Mutex::new(EntityStore::<UserProfile>::new()));
    let config = SyncConfig {
        resource: "profile".into(),
        page_size: 1,
        ..SyncConfig::default()
    };
    let loader = PageLoader::new(store.clone(), transport.clone(), &config);
    transport.queue_page(json!({"user": {"id": "u1", "firstName": "Kofi", "lastName": "Mensah"}}));

    loader.reload().await.unwrap();
    let store = store.lock().await;
    assert_eq!(store.len(), 1);
    assert_eq!(store.items()[0].display_name, "Kofi Mensah");
}
