use super::*;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use serde_json::json;
use shared::domain::Interface;

use crate::transport::{Method, TransportResponse};

struct FakeBackend {
    seen: StdMutex<Vec<RequestParams>>,
}

#[async_trait]
impl Transport for FakeBackend {
    async fn send(&self, params: RequestParams) -> Result<TransportResponse, TransportError> {
        self.seen.lock().expect("seen lock").push(params.clone());
        match (params.method, params.path.as_str()) {
            (Method::Get, "api/samples") => Ok(TransportResponse {
                status: 200,
                body: json!({
                    "documents": [
                        {"id": "s2", "name": "Sample 2", "created_at": "2024-02-01"},
                        {"id": "s1", "name": "Sample 1", "created_at": "2024-01-01"},
                    ],
                    "page": 1,
                    "page_count": 1,
                    "found_count": 2,
                    "total_count": 2,
                }),
            }),
            (Method::Delete, "api/samples/s1") => Ok(TransportResponse {
                status: 204,
                body: serde_json::Value::Null,
            }),
            _ => Err(TransportError::Status {
                status: 401,
                body: None,
            }),
        }
    }
}

fn session() -> Arc<ClientSession> {
    let settings = Settings {
        per_page: 2,
        ..Settings::default()
    };
    ClientSession::with_transport(
        settings,
        Arc::new(FakeBackend {
            seen: StdMutex::new(Vec::new()),
        }),
    )
}

async fn run(session: &ClientSession, intent: Intent) {
    match session.dispatch(intent) {
        Dispatch::Spawned(task) => task.await.expect("join").expect("request"),
        Dispatch::Buffered => panic!("unexpected throttle"),
    }
}

#[tokio::test]
async fn find_then_remove_updates_session_store() {
    let session = session();

    run(
        &session,
        Intent::Find {
            interface: Interface::Samples,
            term: None,
            page: 1,
        },
    )
    .await;
    assert_eq!(
        session
            .dispatcher()
            .read(|store| store.collection(Interface::Samples).len()),
        2
    );

    run(
        &session,
        Intent::Remove {
            interface: Interface::Samples,
            id: "s1".into(),
        },
    )
    .await;

    let store = session.dispatcher().snapshot();
    let samples = store.collection(Interface::Samples);
    assert_eq!(samples.ids(), vec![shared::domain::DocumentId::from("s2")]);
    assert_eq!(samples.total_count, Some(2));
    assert!(!store.is_pending());
}

#[tokio::test]
async fn session_expiry_logs_out_and_end_resets() {
    let session = session();
    let mut rx = session.subscribe();

    run(
        &session,
        Intent::Get {
            interface: Interface::Users,
            id: "me".into(),
        },
    )
    .await;

    let mut saw_logout = false;
    while let Ok(event) = rx.try_recv() {
        saw_logout |= matches!(event, Event::LoggedOut);
        assert!(!matches!(event, Event::Failed { .. }));
    }
    assert!(saw_logout);
    assert!(session.dispatcher().read(|store| store.is_logged_out()));

    session.end().await;
    assert!(!session.dispatcher().read(|store| store.is_logged_out()));
}

#[tokio::test]
async fn explicit_every_policy_runs_back_to_back_finds_under_throttle() {
    let settings = Settings {
        per_page: 2,
        find_throttle_ms: Some(60_000),
        ..Settings::default()
    };
    let backend = Arc::new(FakeBackend {
        seen: StdMutex::new(Vec::new()),
    });
    let session = ClientSession::with_transport(settings, backend.clone());
    let find = |page| Intent::Find {
        interface: Interface::Samples,
        term: None,
        page,
    };

    assert!(matches!(session.dispatch(find(1)), Dispatch::Spawned(_)));
    assert!(matches!(session.dispatch(find(2)), Dispatch::Buffered));

    match session.dispatch_with(find(2), DispatchPolicy::Every) {
        Dispatch::Spawned(task) => task.await.expect("join").expect("request"),
        Dispatch::Buffered => panic!("explicit policy must run immediately"),
    }
    assert!(backend
        .seen
        .lock()
        .expect("seen lock")
        .iter()
        .any(|params| params.query.iter().any(|(k, v)| k == "page" && v == "2")));
    session.end().await;
}
