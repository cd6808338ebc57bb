//! End-to-end tests: chat client -> gateway -> local Gemini stand-in

use std::collections::VecDeque;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use kurobot::api::{create_router, AppState, ChatRequest, Turn, PROVIDER_FAILURE_MESSAGE};
use kurobot::client::{ClientError, CompletionClient, HttpCompletionClient};
use kurobot::gateway::CompletionGateway;
use kurobot::llm::{GeminiService, LlmErrorKind, LlmMessage, LlmRequest, LlmService};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;

const API_KEY: &str = "test-gemini-key";
const MODEL: &str = "gemini-test";

#[derive(Debug, Clone)]
struct MockReply {
    status: StatusCode,
    body: Value,
}

#[derive(Debug, Clone)]
struct ProviderState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    seen_bodies: Arc<Mutex<Vec<Value>>>,
    seen_keys: Arc<Mutex<Vec<String>>>,
    seen_paths: Arc<Mutex<Vec<String>>>,
}

impl ProviderState {
    fn with_replies(replies: Vec<MockReply>) -> Self {
        Self {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            seen_bodies: Arc::new(Mutex::new(Vec::new())),
            seen_keys: Arc::new(Mutex::new(Vec::new())),
            seen_paths: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

struct Server {
    url: String,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl Server {
    async fn stop(self) {
        self.shutdown.send(()).expect("shutdown signal should send");
        self.task.await.expect("server task should join");
    }
}

async fn serve(router: Router) -> Server {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr");
    let (shutdown, shutdown_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .expect("server should run");
    });
    Server {
        url: format!("http://{addr}"),
        shutdown,
        task,
    }
}

async fn generate_content(
    State(state): State<ProviderState>,
    Path(path): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let key = headers
        .get("x-goog-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    state.seen_keys.lock().await.push(key);
    state.seen_paths.lock().await.push(path);
    state.seen_bodies.lock().await.push(body);

    let reply = state
        .replies
        .lock()
        .await
        .pop_front()
        .unwrap_or_else(|| error_reply(StatusCode::INTERNAL_SERVER_ERROR, "no reply queued"));
    (reply.status, Json(reply.body))
}

async fn spawn_provider(state: ProviderState) -> Server {
    let router = Router::new()
        .route("/v1beta/models/*path", post(generate_content))
        .with_state(state);
    serve(router).await
}

async fn spawn_gateway(provider_url: &str) -> Server {
    let gemini = GeminiService::new(API_KEY.to_string(), MODEL, provider_url)
        .expect("gemini service should build");
    let state = AppState::new(CompletionGateway::new(Arc::new(gemini)));
    serve(create_router(state)).await
}

fn text_reply(text: &str) -> MockReply {
    MockReply {
        status: StatusCode::OK,
        body: json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": text }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": { "promptTokenCount": 7, "candidatesTokenCount": 1 }
        }),
    }
}

fn error_reply(status: StatusCode, message: &str) -> MockReply {
    MockReply {
        status,
        body: json!({
            "error": { "code": status.as_u16(), "message": message, "status": "ERROR" }
        }),
    }
}

fn contents(body: &Value) -> Vec<(String, String)> {
    body["contents"]
        .as_array()
        .expect("contents array")
        .iter()
        .map(|c| {
            (
                c["role"].as_str().unwrap_or_default().to_string(),
                c["parts"][0]["text"].as_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

#[tokio::test]
async fn chat_round_trip_replays_history_to_provider() {
    let state = ProviderState::with_replies(vec![text_reply("d")]);
    let provider = spawn_provider(state.clone()).await;
    let gateway = spawn_gateway(&provider.url).await;

    let client = HttpCompletionClient::new(format!("{}/chat", gateway.url))
        .expect("client should build");
    let reply = client
        .complete(&ChatRequest {
            message: "c".into(),
            history: vec![Turn::user("a"), Turn::model("b")],
        })
        .await
        .expect("chat should succeed");

    gateway.stop().await;
    provider.stop().await;

    assert_eq!(reply, "d");
    assert_eq!(state.seen_keys.lock().await.clone(), vec![API_KEY.to_string()]);
    assert_eq!(
        state.seen_paths.lock().await.clone(),
        vec![format!("{MODEL}:generateContent")]
    );

    let bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        contents(&bodies[0]),
        vec![
            ("user".to_string(), "a".to_string()),
            ("model".to_string(), "b".to_string()),
            ("user".to_string(), "c".to_string()),
        ]
    );
}

#[tokio::test]
async fn sequential_requests_do_not_share_history() {
    let state = ProviderState::with_replies(vec![text_reply("one"), text_reply("two")]);
    let provider = spawn_provider(state.clone()).await;
    let gateway = spawn_gateway(&provider.url).await;
    let client = HttpCompletionClient::new(format!("{}/chat", gateway.url))
        .expect("client should build");

    client
        .complete(&ChatRequest {
            message: "x".into(),
            history: vec![Turn::user("p"), Turn::model("q")],
        })
        .await
        .expect("first chat should succeed");
    client
        .complete(&ChatRequest {
            message: "y".into(),
            history: vec![],
        })
        .await
        .expect("second chat should succeed");

    gateway.stop().await;
    provider.stop().await;

    let bodies = state.seen_bodies.lock().await.clone();
    assert_eq!(
        contents(&bodies[1]),
        vec![("user".to_string(), "y".to_string())]
    );
}

#[tokio::test]
async fn provider_failure_reaches_client_as_generic_500() {
    let state = ProviderState::with_replies(vec![error_reply(
        StatusCode::SERVICE_UNAVAILABLE,
        "model overloaded",
    )]);
    let provider = spawn_provider(state).await;
    let gateway = spawn_gateway(&provider.url).await;
    let client = HttpCompletionClient::new(format!("{}/chat", gateway.url))
        .expect("client should build");

    let err = client
        .complete(&ChatRequest {
            message: "hi".into(),
            history: vec![],
        })
        .await
        .expect_err("chat should fail");

    gateway.stop().await;
    provider.stop().await;

    match err {
        ClientError::Status { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, PROVIDER_FAILURE_MESSAGE);
        }
        other => panic!("expected status error, got {other:?}"),
    }
}

#[tokio::test]
async fn provider_status_codes_map_to_error_kinds() {
    let cases = [
        (StatusCode::BAD_REQUEST, LlmErrorKind::InvalidRequest),
        (StatusCode::FORBIDDEN, LlmErrorKind::Auth),
        (StatusCode::TOO_MANY_REQUESTS, LlmErrorKind::RateLimit),
        (StatusCode::INTERNAL_SERVER_ERROR, LlmErrorKind::ServerError),
    ];
    let state = ProviderState::with_replies(
        cases
            .iter()
            .map(|(status, _)| error_reply(*status, "nope"))
            .collect(),
    );
    let provider = spawn_provider(state).await;
    let gemini = GeminiService::new(API_KEY.to_string(), MODEL, &provider.url)
        .expect("gemini service should build");
    let request = LlmRequest::new(vec![LlmMessage::user("hi")]);

    for (status, kind) in cases {
        let err = gemini
            .complete(&request)
            .await
            .expect_err("provider error should surface");
        assert_eq!(err.kind, kind, "status {status}");
        assert!(err.message.contains("nope"));
    }

    provider.stop().await;
}

#[tokio::test]
async fn unreachable_gateway_is_a_transport_error() {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let client =
        HttpCompletionClient::new(format!("http://{addr}/chat")).expect("client should build");
    let err = client
        .complete(&ChatRequest {
            message: "hi".into(),
            history: vec![],
        })
        .await
        .expect_err("nothing is listening");

    assert!(matches!(err, ClientError::Transport(_)));
}
