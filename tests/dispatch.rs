//! In-process tests for routing, the handler context and the access log.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use serde_json::json;

use svcmux::http::{JSON_CONTENT_TYPE, X_REQUEST_ID};
use svcmux::observability::Severity;

mod common;

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn test_path_param_reaches_handler() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, get("/hello/123")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_bytes(response).await, b"\"Hello, World!123\"\n");
}

#[tokio::test]
async fn test_query_value() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, get("/hello?name=Ada%20L")).await;
    assert_eq!(common::body_bytes(response).await, b"\"Hello, World! Ada L\"\n");

    let response = common::send(&server, get("/hello")).await;
    assert_eq!(common::body_bytes(response).await, b"\"Hello, World! \"\n");
}

#[tokio::test]
async fn test_json_response_shape() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, get("/message")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        JSON_CONTENT_TYPE
    );
    assert_eq!(
        common::body_bytes(response).await,
        b"{\"message\":\"Hello, World\"}\n"
    );
}

#[tokio::test]
async fn test_bind_success_and_failure() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, post_json("/hello", r#"{"name":"Ada"}"#)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body: serde_json::Value = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert_eq!(body, json!({ "message": "Hello, Ada!" }));

    let response = common::send(&server, post_json("/hello", r#"{"name":"Ada","age":3}"#)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: String = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert!(body.contains("age"), "unexpected error body: {body}");

    let response = common::send(&server, post_json("/hello", "{not json")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patch_resolves_params() {
    let (server, _sink, _dir) = common::test_server();

    let request = Request::builder()
        .method(Method::PATCH)
        .uri("/items/42")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(common::body_bytes(response).await, b"{\"patched\":\"42\"}\n");
}

#[tokio::test]
async fn test_handler_reads_request_and_sets_headers() {
    let (server, _sink, _dir) = common::test_server();

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo/ada?verbose=1")
        .header("x-client", "cli/1.0")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    assert_eq!(response.status(), StatusCode::ACCEPTED);
    assert_eq!(response.headers().get("x-served-by").unwrap(), "svcmux");
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        JSON_CONTENT_TYPE
    );

    let body: serde_json::Value = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert_eq!(
        body,
        json!({ "client": "cli/1.0", "method": "PUT", "path": "/echo/ada", "name": "ada" })
    );

    let request = Request::builder()
        .method(Method::PUT)
        .uri("/echo/bob")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    let body: serde_json::Value = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert_eq!(body["client"], json!("anonymous"));
}

#[tokio::test]
async fn test_head_is_served_by_get_route() {
    let (server, _sink, _dir) = common::test_server();

    let request = Request::builder()
        .method(Method::HEAD)
        .uri("/hello/3")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get(X_REQUEST_ID).is_some());
}

#[tokio::test]
async fn test_unknown_path_is_404() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, get("/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().get(X_REQUEST_ID).is_some());
}

#[tokio::test]
async fn test_wrong_method_is_405_with_allow() {
    let (server, _sink, _dir) = common::test_server();

    let request = Request::builder()
        .method(Method::DELETE)
        .uri("/hello")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let allow = response.headers().get(header::ALLOW).unwrap().to_str().unwrap();
    assert!(allow.contains("GET"));
    assert!(allow.contains("HEAD"));
    assert!(allow.contains("POST"));
}

#[tokio::test]
async fn test_handler_writing_nothing_is_empty_200() {
    let (server, _sink, _dir) = common::test_server();

    let response = common::send(&server, get("/silent")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(common::body_bytes(response).await.is_empty());
}

#[tokio::test]
async fn test_request_ids_are_generated_and_distinct() {
    let (server, _sink, _dir) = common::test_server();

    let (first, second) = tokio::join!(
        common::send(&server, get("/session")),
        common::send(&server, get("/session"))
    );

    let first_id = first.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap().to_owned();
    let second_id = second.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap().to_owned();
    assert!(!first_id.is_empty());
    assert_ne!(first_id, second_id);

    // The handler sees the same id through its session.
    let session: String = serde_json::from_slice(&common::body_bytes(first).await).unwrap();
    assert_eq!(session, first_id);
}

#[tokio::test]
async fn test_incoming_request_id_is_preserved() {
    let (server, sink, _dir) = common::test_server();

    let request = Request::builder()
        .uri("/session")
        .header(X_REQUEST_ID, "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = common::send(&server, request).await;
    assert_eq!(response.headers().get(X_REQUEST_ID).unwrap(), "trace-abc");
    assert_eq!(common::body_bytes(response).await, b"\"trace-abc\"\n");

    let entries = sink.entries();
    let line = entries.iter().find(|e| e.message == "Request").unwrap();
    assert_eq!(line.fields["sessionId"], json!("trace-abc"));
}

#[tokio::test]
async fn test_access_log_line() {
    let (server, sink, _dir) = common::test_server();

    let response = common::send(&server, get("/hello/7?x=1")).await;
    let id = response.headers().get(X_REQUEST_ID).unwrap().to_str().unwrap().to_owned();

    let entries: Vec<_> = sink
        .entries()
        .into_iter()
        .filter(|e| e.message == "Request")
        .collect();
    assert_eq!(entries.len(), 1);

    let line = &entries[0];
    assert_eq!(line.severity, Severity::Info);
    assert_eq!(line.fields["method"], json!("GET"));
    assert_eq!(line.fields["requestURI"], json!("/hello/7?x=1"));
    assert_eq!(line.fields["remoteAddr"], json!(""));
    assert_eq!(line.fields["status"], json!(200));
    assert_eq!(line.fields["sessionId"], json!(id));
    assert!(line.fields["duration"].as_str().is_some());
}

#[tokio::test]
async fn test_access_log_records_404() {
    let (server, sink, _dir) = common::test_server();

    common::send(&server, get("/missing")).await;

    let entries = sink.entries();
    let line = entries.iter().find(|e| e.message == "Request").unwrap();
    assert_eq!(line.fields["status"], json!(404));
}

#[tokio::test]
async fn test_panicking_handler_is_500() {
    let (server, sink, _dir) = common::test_server();

    let response = common::send(&server, get("/panic")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

    // The server keeps serving.
    let response = common::send(&server, get("/hello/1")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let statuses: Vec<_> = sink
        .entries()
        .into_iter()
        .filter(|e| e.message == "Request")
        .map(|e| e.fields["status"].clone())
        .collect();
    assert_eq!(statuses, vec![json!(500), json!(200)]);
}

#[tokio::test]
async fn test_oversized_body_fails_bind() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = common::plain_config(dir.path());
    config.limits.max_body_bytes = 8;
    let sink = std::sync::Arc::new(svcmux::observability::MemorySink::new());
    let server = svcmux::HttpServer::new(common::demo_routes(), config, sink);

    let response = common::send(&server, post_json("/hello", r#"{"name":"a long name"}"#)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: String = serde_json::from_slice(&common::body_bytes(response).await).unwrap();
    assert!(body.starts_with("failed to read request body"), "{body}");
}
