use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};
use std::time::Duration;

use axum::body::Bytes;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Router,
};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use tokio::net::TcpListener;
use vanguard::config::NotifyConfig;
use vanguard::models::Post;
use vanguard::notify::{NotifierClient, NotifyError, PostEvent};

#[derive(Clone)]
struct HookState {
    attempts: Arc<AtomicUsize>,
    secret: Vec<u8>,
    fail_first: usize,
    fail_with: StatusCode,
}

async fn hook(State(state): State<HookState>, headers: HeaderMap, body: Bytes) -> StatusCode {
    let mut mac = Hmac::<Sha256>::new_from_slice(&state.secret).unwrap();
    mac.update(&body);
    let expected = hex::encode(mac.finalize().into_bytes());
    let sig = headers.get("X-Signature").unwrap().to_str().unwrap();
    assert_eq!(sig, expected);

    let payload: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["event"], "post_published");

    let attempt = state.attempts.fetch_add(1, Ordering::SeqCst) + 1;
    if attempt <= state.fail_first {
        state.fail_with
    } else {
        StatusCode::OK
    }
}

async fn spawn_hook(fail_first: usize, fail_with: StatusCode) -> (String, Arc<AtomicUsize>) {
    let attempts = Arc::new(AtomicUsize::new(0));
    let state = HookState { attempts: attempts.clone(), secret: b"topsecret".to_vec(), fail_first, fail_with };
    let app = Router::new().route("/", post(hook)).with_state(state);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app.into_make_service()).await.unwrap() });
    (format!("http://{addr}"), attempts)
}

fn client(url: String) -> NotifierClient {
    let cfg = NotifyConfig {
        webhook_url: Some(url),
        webhook_secret: Some(b"topsecret".to_vec()),
        retry_delays: vec![Duration::from_millis(10), Duration::from_millis(20)],
    };
    NotifierClient::new(&cfg).unwrap()
}

fn event() -> PostEvent {
    PostEvent::published(&Post {
        id: 1,
        author_id: 4,
        category: "news".into(),
        title: "Quarterly update".into(),
        body: "...".into(),
        meta: vec![],
        published: true,
        created_at: 1,
        published_at: Some(2),
    })
}

#[tokio::test]
async fn retries_on_5xx() {
    let (url, attempts) = spawn_hook(1, StatusCode::INTERNAL_SERVER_ERROR).await;
    client(url).publish(&event()).await.unwrap();
    assert_eq!(attempts.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn gives_up_after_last_retry() {
    let (url, attempts) = spawn_hook(usize::MAX, StatusCode::BAD_GATEWAY).await;
    let err = client(url).publish(&event()).await.unwrap_err();
    match err {
        NotifyError::Http(502) => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn no_retry_on_4xx() {
    let (url, attempts) = spawn_hook(usize::MAX, StatusCode::BAD_REQUEST).await;
    let err = client(url).publish(&event()).await.unwrap_err();
    match err {
        NotifyError::Http(400) => {}
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(attempts.load(Ordering::SeqCst), 1);
}
