//! Document workflow through the façade with a scripted HTTP client.

use async_trait::async_trait;
use bridge_traits::error::{BridgeError, Result as BridgeResult};
use bridge_traits::http::{HttpClient, HttpMethod, HttpRequest, HttpResponse};
use bridge_traits::{Clock, ManualClock};
use chrono::{TimeZone, Utc};
use core_service::{
    AuthEvent, CoreConfig, CoreError, CoreEvent, CoreService, Credentials, EventBus,
    LocalDocument, UserId,
};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

struct ScriptedHttp {
    responses: Mutex<VecDeque<BridgeResult<HttpResponse>>>,
    requests: Mutex<Vec<HttpRequest>>,
}

impl ScriptedHttp {
    fn with(responses: Vec<BridgeResult<HttpResponse>>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpClient for ScriptedHttp {
    async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BridgeError::OperationFailed("no scripted response".into())))
    }
}

fn config(http: Arc<ScriptedHttp>) -> CoreConfig {
    CoreConfig::builder()
        .client_id("client-id")
        .client_secret("client-secret")
        .redirect_uri("http://localhost:3000/auth/callback")
        .max_upload_bytes(16)
        .http_client(http)
        .build()
        .unwrap()
}

fn ok(body: &'static str) -> BridgeResult<HttpResponse> {
    Ok(HttpResponse::new(200, body))
}

fn conversion_script() -> Vec<BridgeResult<HttpResponse>> {
    vec![
        ok(r#"{"id":"f1","name":"notes.txt","mimeType":"text/plain","webViewLink":"https://drive.google.com/file/d/f1/view"}"#),
        ok(r#"{"name":"notes.txt","mimeType":"text/plain"}"#),
        ok(r#"{"id":"f2","name":"notes.txt (Editable)","mimeType":"application/vnd.google-apps.document","webViewLink":"https://docs.google.com/document/d/f2/view"}"#),
        ok(r#"{"id":"anyoneWithLink"}"#),
    ]
}

#[tokio::test]
async fn test_convert_document_end_to_end() {
    let http = ScriptedHttp::with(conversion_script());
    let bus = EventBus::new(16);
    let mut events = bus.subscribe();
    let service = CoreService::with_event_bus(config(http.clone()), bus).unwrap();
    let user = UserId::from("user@example.com");

    let staged = tempfile::tempdir().unwrap();
    let path = staged.path().join("notes-1700000000000-0a1b2c3d.txt");
    tokio::fs::write(&path, b"hello").await.unwrap();
    let document = LocalDocument::new(&path, "notes.txt");

    let outcome = service
        .convert_document(&user, "ya29.token", &document)
        .await
        .unwrap();

    assert_eq!(outcome.uploaded.id, "f1");
    assert_eq!(outcome.converted.id, "f2");
    assert_eq!(outcome.edit_url, "https://docs.google.com/document/d/f2/edit");

    let requests = http.requests();
    assert_eq!(requests.len(), 4);
    assert!(requests
        .iter()
        .all(|r| r.header_value("authorization") == Some("Bearer ya29.token")));
    let upload_body = String::from_utf8_lossy(requests[0].body.as_ref().unwrap()).to_string();
    assert!(upload_body.contains("Content-Type: text/plain"));
    assert!(upload_body.contains(r#"{"name":"notes.txt"}"#));

    assert!(matches!(
        events.try_recv(),
        Ok(CoreEvent::Auth(AuthEvent::SessionInitialized { .. }))
    ));
}

#[tokio::test]
async fn test_convert_keeps_refresh_token_from_earlier_sign_in() {
    let http = ScriptedHttp::with(conversion_script());
    let service = CoreService::new(config(http.clone())).unwrap();
    let user = UserId::from("u1");

    service
        .registry()
        .init_session(&user, Credentials::new("old").with_refresh_token("ref1"))
        .await
        .unwrap();

    let staged = tempfile::NamedTempFile::new().unwrap();
    tokio::fs::write(staged.path(), b"hello").await.unwrap();
    let document = LocalDocument::new(staged.path(), "notes.txt");

    service
        .convert_document(&user, "new", &document)
        .await
        .unwrap();

    let session = service.registry().get_session(&user).await.unwrap();
    assert_eq!(session.access_token, "new");
    assert_eq!(session.refresh_token.as_deref(), Some("ref1"));
}

#[tokio::test]
async fn test_convert_missing_staged_file_is_404_without_network() {
    let http = ScriptedHttp::with(vec![]);
    let service = CoreService::new(config(http.clone())).unwrap();
    let staged = tempfile::tempdir().unwrap();
    let document = LocalDocument::new(staged.path().join("gone.pdf"), "gone.pdf");

    let err = service
        .convert_document(&UserId::from("u1"), "tok", &document)
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 404);
    assert!(http.requests().is_empty());
}

#[tokio::test]
async fn test_convert_with_empty_bearer_token_is_401() {
    let service = CoreService::new(config(ScriptedHttp::with(vec![]))).unwrap();
    let document = LocalDocument::new("uploads/a.pdf", "a.pdf");

    let err = service
        .convert_document(&UserId::from("u1"), "", &document)
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), 401);
}

#[tokio::test]
async fn test_discard_document_tolerates_remote_failure() {
    let http = ScriptedHttp::with(vec![Ok(HttpResponse::new(
        500,
        r#"{"error":{"code":500,"message":"Backend Error"}}"#,
    ))]);
    let service = CoreService::new(config(http.clone())).unwrap();
    let staged = tempfile::tempdir().unwrap();
    let path = staged.path().join("a.pdf");
    tokio::fs::write(&path, b"%PDF").await.unwrap();

    let outcome = service
        .discard_document(
            &UserId::from("u1"),
            Some("tok"),
            &LocalDocument::new(&path, "a.pdf"),
            Some("f2"),
        )
        .await;

    assert!(outcome.local_removed);
    assert_eq!(outcome.remote_deleted, Some(false));
    assert!(!path.exists());
    assert_eq!(http.requests()[0].method, HttpMethod::Delete);
}

#[tokio::test]
async fn test_discard_unconverted_document_is_local_only() {
    let http = ScriptedHttp::with(vec![]);
    let service = CoreService::new(config(http.clone())).unwrap();
    let staged = tempfile::tempdir().unwrap();

    let outcome = service
        .discard_document(
            &UserId::from("u1"),
            None,
            &LocalDocument::new(staged.path().join("never-written.pdf"), "x.pdf"),
            None,
        )
        .await;

    assert!(outcome.local_removed);
    assert_eq!(outcome.remote_deleted, None);
    assert!(http.requests().is_empty());
}

#[test]
fn test_validate_upload() {
    let service = CoreService::new(config(ScriptedHttp::with(vec![]))).unwrap();

    assert!(service
        .validate_upload("a.pdf", "application/pdf", 16)
        .is_ok());

    let too_large = service
        .validate_upload("a.pdf", "application/pdf", 17)
        .unwrap_err();
    assert!(matches!(too_large, CoreError::DocumentTooLarge { size: 17, limit: 16 }));
    assert_eq!(too_large.http_status(), 400);

    let wrong_type = service
        .validate_upload("a.png", "image/png", 1)
        .unwrap_err();
    assert!(matches!(wrong_type, CoreError::UnsupportedDocumentType { .. }));
}

#[test]
fn test_staged_file_name_follows_configured_clock() {
    let clock = Arc::new(ManualClock::new(
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap(),
    ));
    let config = CoreConfig::builder()
        .client_id("client-id")
        .client_secret("client-secret")
        .redirect_uri("http://localhost:3000/auth/callback")
        .http_client(ScriptedHttp::with(vec![]))
        .clock(clock.clone() as Arc<dyn Clock>)
        .build()
        .unwrap();
    let service = CoreService::new(config).unwrap();

    assert!(service
        .staged_file_name("notes.txt")
        .starts_with("notes-1700000000000-"));

    clock.advance(chrono::Duration::milliseconds(5));
    let later = service.staged_file_name("notes.txt");
    assert!(later.starts_with("notes-1700000000005-"));
    assert!(later.ends_with(".txt"));
}

#[test]
fn test_describe_has_no_secrets() {
    let service = CoreService::new(config(ScriptedHttp::with(vec![]))).unwrap();
    let summary = service.describe();

    assert!(summary.client_id_configured);
    assert!(summary.client_secret_configured);
    assert_eq!(summary.redirect_uri, "http://localhost:3000/auth/callback");

    let rendered = serde_json::to_string(&summary).unwrap();
    assert!(!rendered.contains("client-secret"));
    assert!(!rendered.contains("client-id"));
}
