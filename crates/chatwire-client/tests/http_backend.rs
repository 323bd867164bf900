//! HTTP tests for `BackendClient` against a mock backend.

use chatwire_client::{
    BackendClient, ChatSession, ClientConfig, ClientError, HistoryApi, StreamError,
    StreamOutcome, TransportError,
};
use chatwire_core::{Phase, Sender, SessionId, FAILURE_TEXT};
use serde_json::json;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn backend(server: &MockServer) -> BackendClient {
    let config = ClientConfig {
        base_url: format!("{}/", server.uri()),
        ..ClientConfig::default()
    };
    BackendClient::new(config).unwrap()
}

fn sid(s: &str) -> SessionId {
    SessionId::new(s).unwrap()
}

const HELLO_STREAM: &str = concat!(
    "data: {\"status\":\"loading\",\"message\":\"Thinking...\"}\n\n",
    "data: {\"token\":\"Hel\",\"done\":false}\n\n",
    "data: {\"token\":\"lo\",\"done\":false}\n\n",
    "data: {\"token\":\"\",\"done\":true,\"full_response\":\"Hello\",\"session_id\":\"abc\"}\n\n",
);

// =============================================================================
// REST
// =============================================================================

#[tokio::test]
async fn list_models() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"models": ["mistral", "llama3"]})),
        )
        .mount(&server)
        .await;

    let models = backend(&server).list_models().await.unwrap();
    assert_eq!(models, vec!["mistral", "llama3"]);
}

#[tokio::test]
async fn list_sessions() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/sessions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sessions": [{
                "session_id": "abc",
                "agent_name": "Weather",
                "model": "mistral",
                "created_at": "2024-05-01T09:30:00.000001",
                "updated_at": "2024-05-01T09:31:00.000001",
                "message_count": 2,
                "first_message": "Rain in Oslo?"
            }]
        })))
        .mount(&server)
        .await;

    let sessions = backend(&server).list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 1);
    assert_eq!(sessions[0].session_id, sid("abc"));
    assert_eq!(sessions[0].agent_name.as_deref(), Some("Weather"));
    assert_eq!(sessions[0].message_count, 2);
    assert!(sessions[0].updated_at.is_some());
}

#[tokio::test]
async fn get_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/session/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"sender": "user", "message": "hi", "timestamp": "2024-05-01T09:30:00"},
                {"sender": "bot", "message": "hello", "timestamp": "2024-05-01T09:30:01"}
            ],
            "agent_name": "Basic",
            "model": "mistral"
        })))
        .mount(&server)
        .await;

    let history = backend(&server).get_session(&sid("abc")).await.unwrap();
    assert_eq!(history.messages.len(), 2);
    assert_eq!(history.messages[1].sender, Sender::Assistant);
    assert_eq!(history.model.as_deref(), Some("mistral"));
}

#[tokio::test]
async fn get_missing_session_is_api_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/chat/session/nope"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Session not found"})))
        .mount(&server)
        .await;

    match backend(&server).get_session(&sid("nope")).await {
        Err(ClientError::Api { status, message }) => {
            assert_eq!(status, 404);
            assert_eq!(message, "Session not found");
        }
        other => panic!("Expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn delete_session_is_idempotent() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/session/abc"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "deleted"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/session/gone"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Session not found"})))
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/chat/session/broken"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = backend(&server);
    assert!(client.delete_session(&sid("abc")).await.is_ok());
    assert!(client.delete_session(&sid("gone")).await.is_ok());
    assert!(matches!(
        client.delete_session(&sid("broken")).await,
        Err(ClientError::Api { status: 500, .. })
    ));
}

#[tokio::test]
async fn invalid_json_is_parse_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/models"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
        .mount(&server)
        .await;

    assert!(matches!(
        backend(&server).list_models().await,
        Err(ClientError::Parse(_))
    ));
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn send_streams_reply_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agent"))
        .and(body_json(json!({
            "agent": "Basic",
            "message": "hi",
            "model": "mistral",
            "session_id": null
        })))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_STREAM, "text/event-stream"))
        .expect(1)
        .mount(&server)
        .await;

    let mut session = ChatSession::with_backend(backend(&server));
    let handle = session.send("hi").unwrap();
    let id = handle.message_id();

    assert_eq!(handle.wait().await.unwrap(), StreamOutcome::Completed);
    let conversation = session.conversation().snapshot();
    let message = conversation.message(id).unwrap();
    assert_eq!(message.text, "Hello");
    assert_eq!(message.phase, Phase::Settled);
    assert_eq!(conversation.session_id(), Some(&sid("abc")));
}

#[tokio::test]
async fn error_status_settles_with_failure_text() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/agent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
        .mount(&server)
        .await;

    let mut session = ChatSession::with_backend(backend(&server));
    let handle = session.send("hi").unwrap();
    let id = handle.message_id();

    match handle.wait().await {
        Err(StreamError::Transport(TransportError::Status { status, message })) => {
            assert_eq!(status, 500);
            assert_eq!(message, "internal error");
        }
        other => panic!("Expected status error, got {other:?}"),
    }
    let text = session
        .conversation()
        .read(|c| c.message(id).map(|m| m.text.clone()));
    assert_eq!(text.as_deref(), Some(FAILURE_TEXT));
}

#[tokio::test]
async fn unreachable_backend_is_connect_error() {
    let config = ClientConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        connect_timeout_seconds: 1,
        ..ClientConfig::default()
    };
    let mut session = ChatSession::with_backend(BackendClient::new(config).unwrap());

    let outcome = session.send("hi").unwrap().wait().await;
    assert!(matches!(
        outcome,
        Err(StreamError::Transport(TransportError::Connect(_)))
    ));
}
