use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use itertools::Itertools;
use serde_json::Value;
use tower::ServiceExt;
use vanguard::cluster::ClusterSet;
use vanguard::config::Config;
use vanguard::models::{Category, NewPost, Post, UserId};
use vanguard::notify::NotifierClient;
use vanguard::storage::{MemStore, Store};
use vanguard_server::{api::USER_HEADER, router, AppState};

pub struct TestApp {
    pub router: Router,
    pub store: Store,
}

/// Router over a fresh in-memory store with `news`, `shipped` and `hires` categories.
pub fn test_app(per_page: usize, clustered: &[&str]) -> TestApp {
    let store: Store = std::sync::Arc::new(MemStore::new());
    for slug in ["news", "shipped", "hires"] {
        store.upsert_category(Category { slug: slug.into(), name: slug.to_uppercase() }).expect("seed category");
    }
    let cfg = Config { per_page, clustered: ClusterSet::new(clustered.iter().copied()), ..Config::default() };
    let notifier = NotifierClient::new(&cfg.notify).expect("notifier");
    TestApp { router: router(AppState::new(store.clone(), notifier, &cfg)), store }
}

/// Insert and publish a post directly, with `published_at` controlling feed order.
pub fn seed_post(store: &Store, category: &str, title: &str, published_at: u64) -> Post {
    let draft = store
        .create_post(NewPost {
            author_id: 1,
            category: category.into(),
            title: title.into(),
            body: format!("# {title}"),
            meta: vec![],
            created_at: published_at,
        })
        .expect("create post");
    store.publish_post(draft.id, published_at).expect("publish post")
}

pub fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).expect("request")
}

pub fn json_req(method: Method, uri: &str, user: Option<UserId>, body: Value) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri).header(header::CONTENT_TYPE, "application/json");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.to_string());
    }
    builder.body(Body::from(body.to_string())).expect("request")
}

/// Urlencoded form post. Values must not contain `&`, `=`, `%` or `+`.
pub fn form_req(uri: &str, user: Option<UserId>, pairs: &[(&str, &str)]) -> Request<Body> {
    let body = pairs.iter().map(|(k, v)| format!("{k}={}", v.replace(' ', "+"))).join("&");
    let mut builder =
        Request::builder().method(Method::POST).uri(uri).header(header::CONTENT_TYPE, "application/x-www-form-urlencoded");
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.to_string());
    }
    builder.body(Body::from(body)).expect("request")
}

/// Send a request and decode the body as JSON (plain text becomes a JSON string).
pub async fn send(app: &TestApp, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.router.clone().oneshot(req).await.expect("router is infallible");
    let status = resp.status();
    let bytes = resp.into_body().collect().await.expect("body").to_bytes();
    if bytes.is_empty() {
        return (status, Value::Null);
    }
    let value = serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()));
    (status, value)
}

pub fn titles(posts: &Value) -> Vec<String> {
    posts.as_array().expect("array of posts").iter().map(|p| p["title"].as_str().expect("title").to_string()).collect()
}
