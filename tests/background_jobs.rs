//! Background jobs, polling and the session store.

mod common;

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::{json, Value as JsonValue};

use mirror_sync::application::{SessionHandle, SessionStore};
use mirror_sync::config::SessionConfig;
use mirror_sync::domain::foundation::{ErrorCode, FacadeError, Timestamp};
use mirror_sync::domain::sync::{InboundRequest, OutboundMessage};
use mirror_sync::ports::ModelJob;

use common::{event, property_changes, SharedDocument, SharedModels};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Job that resolves after a delay with a fixed outcome.
struct RemoteLoad {
    delay: Duration,
    outcome: Result<JsonValue, FacadeError>,
}

impl RemoteLoad {
    fn ok(text: &str) -> Box<Self> {
        Box::new(Self {
            delay: Duration::from_millis(20),
            outcome: Ok(json!({ "text": text })),
        })
    }

    fn failing(message: &str) -> Box<Self> {
        Box::new(Self {
            delay: Duration::from_millis(5),
            outcome: Err(FacadeError::new(message)),
        })
    }
}

#[async_trait]
impl ModelJob for RemoteLoad {
    fn name(&self) -> &str {
        "loaded"
    }

    async fn run(&self) -> Result<JsonValue, FacadeError> {
        tokio::time::sleep(self.delay).await;
        self.outcome.clone()
    }
}

fn shared_handle() -> (SessionHandle, SharedModels) {
    let (session, models) = SharedDocument::start().into_session();
    (SessionHandle::new(session), models)
}

// =============================================================================
// Jobs and polling
// =============================================================================

#[tokio::test]
async fn job_result_is_delivered_on_poll() {
    let (handle, models) = shared_handle();
    let doc = handle.with_session(|s| s.registry().id_for_model(models.document).unwrap());

    handle.schedule_job(doc, RemoteLoad::ok("remote"));
    let started = Instant::now();
    let response = handle.poll(Duration::from_secs(5)).await;

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(
        property_changes(&response.messages),
        vec![(doc, "text".to_string(), json!("remote"))]
    );
}

#[tokio::test]
async fn failed_job_surfaces_as_event_error() {
    let (handle, models) = shared_handle();
    let doc = handle.with_session(|s| s.registry().id_for_model(models.document).unwrap());

    handle
        .schedule_job(doc, RemoteLoad::failing("backend down"))
        .await
        .unwrap();
    let response = handle.poll(Duration::from_secs(1)).await;

    match response.messages.as_slice() {
        [OutboundMessage::Error(error)] => {
            assert_eq!(error.id, doc);
            assert_eq!(error.event, "loaded");
            assert_eq!(error.message, "backend down");
        }
        other => panic!("expected one error entry, got {:?}", other),
    }
    assert!(!handle.is_disposed());
}

#[tokio::test]
async fn job_for_disposed_adapter_is_dropped() {
    let (handle, models) = shared_handle();
    let (doc, x, y) = handle.with_session(|s| {
        let registry = s.registry();
        (
            registry.id_for_model(models.document).unwrap(),
            registry.id_for_model(models.panel_x).unwrap(),
            registry.id_for_model(models.panel_y).unwrap(),
        )
    });

    let job = handle.schedule_job(doc, RemoteLoad::ok("late"));
    handle.process_request(InboundRequest::new(vec![
        event(x, "close", JsonValue::Null),
        event(y, "close", JsonValue::Null),
    ]));
    job.await.unwrap();

    let response = handle.poll(Duration::from_millis(10)).await;
    assert!(response.messages.is_empty());
    assert!(!response.session_terminated);
}

#[tokio::test]
async fn sessions_are_processed_independently() {
    let store = Arc::new(SessionStore::from_config(&SessionConfig::default()));
    let mut ids = Vec::new();
    let mut documents = Vec::new();
    for _ in 0..4 {
        let (handle, models) = shared_handle();
        let doc = handle.with_session(|s| s.registry().id_for_model(models.document).unwrap());
        ids.push(store.register(handle).await);
        documents.push(doc);
    }

    let tasks: Vec<_> = ids
        .iter()
        .zip(&documents)
        .map(|(id, doc)| {
            let store = Arc::clone(&store);
            let (id, doc) = (*id, *doc);
            tokio::spawn(async move {
                let handle = store.get(&id).await.unwrap();
                for _ in 0..10 {
                    handle.process_request(InboundRequest::new(vec![event(
                        doc,
                        "append",
                        json!({ "text": "." }),
                    )]));
                }
                handle.process_request(InboundRequest::new(Vec::new()))
            })
        })
        .collect();

    for last in join_all(tasks).await {
        let last = last.unwrap();
        assert!(!last.session_terminated);
        // startup + ten batches + the final empty batch
        assert_eq!(last.sequence_no, 12);
    }
    assert_eq!(store.len().await, 4);
}

#[tokio::test]
async fn store_applies_configured_session_settings() {
    let config = SessionConfig {
        max_events_per_batch: 2,
        poll_wait_secs: 1,
        ..SessionConfig::default()
    };
    let store = SessionStore::from_config(&config);
    let (session, models) = SharedDocument::start().into_session();
    let handle = store.open(session).await;
    let doc = handle.with_session(|s| s.registry().id_for_model(models.document).unwrap());

    let oversized = handle.process_request(InboundRequest::new(vec![
        event(doc, "append", json!({ "text": "a" })),
        event(doc, "append", json!({ "text": "b" })),
        event(doc, "append", json!({ "text": "c" })),
    ]));
    assert_eq!(
        oversized.error.map(|e| e.code),
        Some(ErrorCode::BatchTooLarge)
    );

    handle.schedule_job(doc, RemoteLoad::ok("remote"));
    let response = store.poll(&handle.id()).await.unwrap();
    assert_eq!(
        property_changes(&response.messages),
        vec![(doc, "text".to_string(), json!("remote"))]
    );
}

// =============================================================================
// Store lifecycle
// =============================================================================

#[tokio::test]
async fn idle_sessions_are_evicted_and_disposed() {
    let store = SessionStore::new(Duration::from_secs(1800));
    let (idle, _) = shared_handle();
    let (active, _) = shared_handle();
    let idle_id = store.register(idle.clone()).await;
    let active_id = store.register(active.clone()).await;

    tokio::time::sleep(Duration::from_millis(5)).await;
    let cutoff = Timestamp::now();
    tokio::time::sleep(Duration::from_millis(5)).await;
    active.process_request(InboundRequest::new(Vec::new()));

    let evicted = store.evict_idle_before(cutoff).await;

    assert_eq!(evicted, vec![idle_id]);
    assert!(idle.is_disposed());
    assert!(store.get(&active_id).await.is_some());

    let response = idle.process_request(InboundRequest::new(Vec::new()));
    assert!(response.session_terminated);
}

#[tokio::test]
async fn dispose_all_terminates_every_session() {
    let store = SessionStore::new(Duration::from_secs(60));
    let (a, _) = shared_handle();
    let (b, _) = shared_handle();
    store.register(a.clone()).await;
    store.register(b.clone()).await;

    store.dispose_all().await;

    assert!(store.is_empty().await);
    assert!(a.is_disposed());
    assert!(b.with_session(|s| s.registry().is_empty()));
}
