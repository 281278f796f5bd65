use super::{MockTransport, ARTICLE_HTML};
use crate::cache::{CacheSettings, MetaCache};
use crate::web::router;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn app(transport: &Arc<MockTransport>) -> axum::Router {
    router(MetaCache::with_transport(
        CacheSettings::default(),
        transport.clone(),
    ))
}

async fn send(app: axum::Router, request: Request<Body>) -> (Response, Value) {
    let response = app.oneshot(request).await.unwrap();
    let (parts, body) = response.into_parts();
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (Response::from_parts(parts, Body::empty()), json)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_missing_url_rejected() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    let (response, body) = send(app(&transport), get("/")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Missing `url` query parameter");

    let (response, _) = send(app(&transport), get("/?url=")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_invalid_url_rejected() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    for uri in ["/?url=not%20a%20url", "/?url=ftp%3A%2F%2Fexample.com%2F", "/?url=%2Fpath"] {
        let (response, body) = send(app(&transport), get(uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["error"], "Invalid url");
    }
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_unsupported_lang_rejected() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    let (response, body) = send(
        app(&transport),
        get("/?url=https%3A%2F%2Fexample.com%2Fpost&lang=fr"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fr"));
    assert_eq!(transport.calls(), 0);
}

#[tokio::test]
async fn test_returns_metadata() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    let request = Request::builder()
        .uri("/?url=https%3A%2F%2Fexample.com%2Fpost&lang=en")
        .header(header::USER_AGENT, "Previewer/1.0")
        .body(Body::empty())
        .unwrap();
    let (response, body) = send(app(&transport), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CACHE_CONTROL],
        "public, max-age=1800"
    );
    assert_eq!(body["title"], "An Article");
    assert_eq!(body["siteName"], "Example News");
    assert_eq!(body["image"], "https://example.com/images/cover.png");
    assert_eq!(body["url"], "https://example.com/post");
    assert_eq!(body["isFallback"], false);

    let requests = transport.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].1[header::USER_AGENT], "Previewer/1.0");
    assert_eq!(requests[0].1[header::ACCEPT_LANGUAGE], "en-US,en;q=0.9");
}

#[tokio::test]
async fn test_empty_lang_uses_default() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    let (response, _) = send(
        app(&transport),
        get("/?url=https%3A%2F%2Fexample.com%2Fpost&lang="),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        transport.requests()[0].1[header::ACCEPT_LANGUAGE],
        "ja-JP,ja;q=0.9"
    );
}

#[tokio::test]
async fn test_cors_headers() {
    let transport = Arc::new(MockTransport::html(ARTICLE_HTML));

    let request = Request::builder()
        .uri("/?url=https%3A%2F%2Fexample.com%2Fpost")
        .header(header::ORIGIN, "https://blog.example.org")
        .body(Body::empty())
        .unwrap();
    let (response, _) = send(app(&transport), request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "*"
    );
}
