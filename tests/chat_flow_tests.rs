// End-to-end chat flow: real HTTP transport, file session storage and the
// bus-connected store, canvas and pipeline, against a local axum server.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chatcanvas::render::RenderResult;
use chatcanvas::{
    AppBuilder, BannerKind, CanvasMode, ChatApp, ChatConfig, EventKind, PipelineState, Role,
    SendOutcome, Topic,
};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

#[derive(Clone, Default)]
struct Backend {
    message_calls: Arc<AtomicUsize>,
    /// Number of leading message calls answered with garbage
    garbage_replies: usize,
}

async fn chat_message(State(backend): State<Backend>, Json(body): Json<Value>) -> (StatusCode, String) {
    let call = backend.message_calls.fetch_add(1, Ordering::SeqCst);
    if call < backend.garbage_replies {
        return (StatusCode::OK, "<html>gateway</html>".to_string());
    }

    let query = body.get("query").and_then(Value::as_str).unwrap_or_default();
    let reply = json!({
        "message": format!("Results for: {}", query),
        "conversation_id": 21,
        "insights": ["Finance is the largest unit"],
        "artifacts": [
            {
                "id": "trend",
                "artifact_type": "CHART",
                "title": "Revenue trend",
                "content": {"type": "line", "categories": ["Q1", "Q2"],
                            "series": [{"name": "2025", "data": [4, 6]}]}
            },
            {
                "id": "units",
                "artifact_type": "TABLE",
                "title": "Headcount",
                "content": {"columns": ["Unit", "Staff"], "rows": [["HR", 12], ["Finance", null]]}
            }
        ]
    });
    (StatusCode::OK, reply.to_string())
}

async fn messages(Path(conversation_id): Path<i64>) -> Json<Value> {
    Json(json!({
        "messages": [
            {"id": 1, "role": "user", "content": format!("Opening {}", conversation_id),
             "created_at": "2025-03-01T09:00:00Z"},
            {"id": 2, "role": "assistant", "content": "Welcome back",
             "metadata": {"insights": ["Nothing changed"], "artifacts": [{"title": "Revenue trend"}]}}
        ]
    }))
}

async fn spawn_backend(backend: Backend) -> (String, oneshot::Sender<()>) {
    let app = Router::new()
        .route("/api/chat/message", post(chat_message))
        .route("/api/chat/conversations/{conversation_id}/messages", get(messages))
        .with_state(backend);

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock server listener");
    let address: SocketAddr = listener.local_addr().expect("mock listener local addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(async move {
        let server = axum::serve(listener, app).with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });
        server.await.expect("run mock server");
    });
    (format!("http://{address}/api"), shutdown_tx)
}

fn build_app(api_url: String, data_dir: &std::path::Path) -> ChatApp {
    let config = ChatConfig {
        api_url,
        fallback_url: None,
        max_retries: 0,
        timeout: Duration::from_secs(2),
        data_dir: data_dir.to_path_buf(),
        ..ChatConfig::default()
    };
    AppBuilder::new()
        .with_config(config)
        .with_production_deps()
        .expect("production deps")
        .build()
        .expect("build app")
}

#[tokio::test]
async fn test_reply_populates_store_canvas_and_session() {
    let (base, _shutdown) = spawn_backend(Backend::default()).await;
    let data_dir = tempfile::tempdir().unwrap();
    let app = build_app(base, data_dir.path());

    let canvas_events = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&canvas_events);
    let _sub = app.bus.subscribe(Topic::CanvasStateChanged, move |event| {
        if let EventKind::CanvasStateChanged { is_open } = &event.kind {
            seen.lock().unwrap().push(*is_open);
        }
    });

    assert_eq!(app.pipeline.send("Headcount by unit").await, SendOutcome::Delivered);

    let messages = app.pipeline.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role(), Role::User);
    assert_eq!(messages[1].role(), Role::Agent);
    assert!(messages[1].content().starts_with("Results for: Headcount by unit"));
    assert!(messages[1].content().contains("**Key Insights:**\n1. Finance is the largest unit"));
    assert_eq!(messages[1].artifact_refs(), ["Revenue trend", "Headcount"]);
    assert_eq!(app.pipeline.conversation_id(), Some(21));
    assert_eq!(app.pipeline.state(), PipelineState::Idle);

    // Store and canvas reacted to the same artifacts-received event
    let ids: Vec<String> = app.store.list().into_iter().map(|a| a.id).collect();
    assert_eq!(ids, vec!["trend", "units"]);
    assert_eq!(app.canvas.mode(), CanvasMode::Collapsed);
    assert_eq!(*canvas_events.lock().unwrap(), vec![true]);

    let session = std::fs::read_to_string(data_dir.path().join("session.json")).unwrap();
    let session: Value = serde_json::from_str(&session).unwrap();
    assert_eq!(session["conversation_id"], json!(21));

    app.canvas.open_artifact("units").unwrap();
    assert_eq!(app.canvas.mode(), CanvasMode::Expanded);
    match app.render_active() {
        Some(RenderResult::Table(table)) => {
            assert_eq!(table.columns, vec!["Unit", "Staff"]);
            assert_eq!(table.rows[1], vec!["Finance", ""]);
        }
        other => panic!("Expected table, got {:?}", other),
    }

    app.canvas.open_artifact("trend").unwrap();
    assert!(matches!(app.render_active(), Some(RenderResult::Chart(_))));

    app.new_conversation();
    assert!(app.store.is_empty());
    assert_eq!(app.canvas.mode(), CanvasMode::Hidden);
    assert_eq!(app.canvas.active_artifact_id(), None);
    assert!(app.pipeline.messages().is_empty());
    assert_eq!(app.pipeline.conversation_id(), None);
    assert_eq!(*canvas_events.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn test_second_session_restores_conversation() {
    let (base, _shutdown) = spawn_backend(Backend::default()).await;
    let data_dir = tempfile::tempdir().unwrap();

    let first = build_app(base.clone(), data_dir.path());
    assert_eq!(first.pipeline.send("Revenue").await, SendOutcome::Delivered);
    first.shutdown();

    let second = build_app(base, data_dir.path());
    assert_eq!(second.pipeline.restore_session().await.unwrap(), Some(21));

    let messages = second.pipeline.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content(), "Opening 21");
    assert_eq!(
        messages[1].content(),
        "Welcome back\n\n**Key Insights:**\n1. Nothing changed"
    );
    assert_eq!(messages[1].artifact_refs(), ["Revenue trend"]);
    assert_eq!(second.pipeline.conversation_id(), Some(21));
    // History never feeds the artifact store
    assert!(second.store.is_empty());
}

#[tokio::test]
async fn test_fresh_data_dir_has_no_session() {
    let (base, _shutdown) = spawn_backend(Backend::default()).await;
    let data_dir = tempfile::tempdir().unwrap();
    let app = build_app(base, &data_dir.path().join("nested"));

    assert_eq!(app.pipeline.restore_session().await.unwrap(), None);
    assert!(app.pipeline.messages().is_empty());
}

#[tokio::test]
async fn test_malformed_reply_then_retry() {
    let backend = Backend {
        garbage_replies: 1,
        ..Backend::default()
    };
    let calls = Arc::clone(&backend.message_calls);
    let (base, _shutdown) = spawn_backend(backend).await;
    let data_dir = tempfile::tempdir().unwrap();
    let app = build_app(base, data_dir.path());

    assert_eq!(
        app.pipeline.send("Revenue").await,
        SendOutcome::Failed(BannerKind::Malformed)
    );
    let banner = app.pipeline.banner().unwrap();
    assert_eq!(banner.kind, BannerKind::Malformed);
    assert_eq!(app.pipeline.messages().len(), 1);
    assert!(app.store.is_empty());
    assert_eq!(app.canvas.mode(), CanvasMode::Hidden);

    assert_eq!(app.pipeline.retry().await, SendOutcome::Delivered);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(app.pipeline.banner().is_none());

    let messages = app.pipeline.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].content(), "Revenue");
    assert_eq!(app.store.len(), 2);
    assert!(app.canvas.is_open());
}

#[tokio::test]
async fn test_unreachable_backend_shows_network_banner() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let data_dir = tempfile::tempdir().unwrap();
    let app = build_app(format!("http://{address}/api"), data_dir.path());

    assert_eq!(
        app.pipeline.send("Revenue").await,
        SendOutcome::Failed(BannerKind::Network)
    );
    assert_eq!(
        app.pipeline.banner().unwrap().text,
        "Connection failed. Please try again."
    );
    assert_eq!(app.pipeline.state(), PipelineState::Idle);
}
