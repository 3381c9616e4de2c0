// Copyright 2025 AgentReplay (https://github.com/agentreplay)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! HTTP-level tests driving the full router

use crate::api::AppState;
use crate::build_router;
use crate::relay::tests::ScriptedProvider;
use crate::relay::ChatRelay;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use intake_core::ManualClock;
use intake_storage::{StoreAdapter, SurveyRepository};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

fn app_with(provider: Option<Arc<ScriptedProvider>>) -> Router {
    let repository = Arc::new(SurveyRepository::new(
        StoreAdapter::in_memory(),
        Arc::new(ManualClock::ticking(1_000, 10)),
    ));
    let relay = provider.map(|p| Arc::new(ChatRelay::new(p, "test-model")));
    build_router(AppState { repository, relay })
}

fn app() -> Router {
    app_with(None)
}

fn request(method: Method, uri: &str, body: Option<Value>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::ORIGIN, "http://localhost:3000");
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn submit(app: &Router, name: &str) {
    let (status, body) = send(
        app,
        request(
            Method::POST,
            "/responses",
            Some(json!({
                "name": name,
                "responses": { "teachLLMs": format!("{} teaches", name) }
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_preflight() {
    let response = app()
        .oneshot(request(Method::OPTIONS, "/anything", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let headers = response.headers();
    assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_METHODS).unwrap(),
        "GET, POST, DELETE, OPTIONS"
    );
    assert_eq!(
        headers.get(header::ACCESS_CONTROL_ALLOW_HEADERS).unwrap(),
        "Content-Type, Authorization"
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert!(bytes.is_empty());
}

#[tokio::test]
async fn test_submit_and_list() {
    let app = app();
    submit(&app, "alice").await;
    submit(&app, "bob").await;

    let (status, body) = send(&app, request(Method::GET, "/responses", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["responses"][0],
        json!({
            "key": ["responses", 1000, "alice"],
            "name": "alice",
            "timestamp": 1000,
            "responses": { "teachLLMs": "alice teaches", "syntheticStudents": "" }
        })
    );
    assert_eq!(body["responses"][1]["name"], "bob");
    assert_eq!(
        body["metadata"],
        json!({
            "limit": 100,
            "offset": 0,
            "count": 2,
            "filters": { "since": 0, "name": null }
        })
    );
}

#[tokio::test]
async fn test_list_filters_from_query() {
    let app = app();
    for name in ["a", "b", "a", "b"] {
        submit(&app, name).await;
    }

    let (status, body) = send(
        &app,
        request(Method::GET, "/responses?name=b&offset=1&limit=5&since=1000", None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["responses"].as_array().unwrap().len(), 1);
    assert_eq!(body["responses"][0]["timestamp"], 1030);
    assert_eq!(
        body["metadata"],
        json!({
            "limit": 5,
            "offset": 1,
            "count": 1,
            "filters": { "since": 1000, "name": "b" }
        })
    );

    let (status, body) = send(&app, request(Method::GET, "/responses?limit=ten", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body, json!({ "error": "Invalid query parameters" }));
}

#[tokio::test]
async fn test_submit_rejects_invalid_bodies() {
    let app = app();
    for body in [
        json!({ "name": "alice" }),
        json!({ "name": "alice", "responses": "yes" }),
        json!({ "name": "alice", "responses": null }),
        json!({ "responses": {} }),
    ] {
        let (status, response) = send(&app, request(Method::POST, "/responses", Some(body))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Invalid response format" }));
    }

    let req = Request::builder()
        .method(Method::POST)
        .uri("/responses")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, stats) = send(&app, request(Method::GET, "/responses/stats", None)).await;
    assert_eq!(stats["total"], 0);
}

#[tokio::test]
async fn test_stats() {
    let app = app();
    let (status, body) = send(&app, request(Method::GET, "/responses/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "total": 0,
            "uniqueParticipants": 0,
            "timeRange": { "first": null, "last": null, "durationMs": null }
        })
    );

    for name in ["a", "b", "a"] {
        submit(&app, name).await;
    }
    let (_, body) = send(&app, request(Method::GET, "/responses/stats", None)).await;
    assert_eq!(
        body,
        json!({
            "total": 3,
            "uniqueParticipants": 2,
            "timeRange": { "first": 1000, "last": 1020, "durationMs": 20 }
        })
    );
}

#[tokio::test]
async fn test_delete_by_name() {
    let app = app();
    for name in ["x", "y", "x"] {
        submit(&app, name).await;
    }

    let (status, body) = send(&app, request(Method::DELETE, "/responses/x", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "deleted": 2, "message": "Deleted 2 responses for x" })
    );

    let (_, body) = send(&app, request(Method::GET, "/responses?name=x", None)).await;
    assert_eq!(body["metadata"]["count"], 0);

    for uri in ["/responses", "/responses/"] {
        let (status, body) = send(&app, request(Method::DELETE, uri, None)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, json!({ "error": "Name is required" }));
    }
}

#[tokio::test]
async fn test_delete_participant_named_stats() {
    let app = app();
    for name in ["stats", "other", "stats"] {
        submit(&app, name).await;
    }

    let (status, body) = send(&app, request(Method::DELETE, "/responses/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({ "success": true, "deleted": 2, "message": "Deleted 2 responses for stats" })
    );

    let (status, body) = send(&app, request(Method::GET, "/responses/stats", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["uniqueParticipants"], 1);
}

fn chat_request(body: Value) -> Request<Body> {
    request(Method::POST, "/chat", Some(body))
}

fn hello() -> Value {
    json!({ "messages": [{ "role": "user", "content": "hello" }] })
}

#[tokio::test]
async fn test_chat_streams_frames() {
    let provider = Arc::new(ScriptedProvider::new(&["Hel", "lo"]));
    let app = app_with(Some(provider.clone()));

    let response = app.oneshot(chat_request(hello())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::CONTENT_TYPE).unwrap(),
        "text/event-stream"
    );
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "*"
    );

    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(
        std::str::from_utf8(&bytes).unwrap(),
        "data: Hel\n\ndata: lo\n\ndata: [DONE]\n\n"
    );
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_chat_rejects_malformed_body_without_upstream_call() {
    let provider = Arc::new(ScriptedProvider::new(&["unused"]));
    let app = app_with(Some(provider.clone()));

    for body in [json!({}), json!({ "messages": "hello" }), json!({ "prompt": "hi" })] {
        let (status, response) = send(&app, chat_request(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(response, json!({ "error": "Invalid messages format" }));
    }
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn test_chat_failures_before_streaming_are_generic_500s() {
    let (status, body) = send(&app(), chat_request(hello())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));

    let mut provider = ScriptedProvider::new(&[]);
    provider.fail_setup = true;
    let provider = Arc::new(provider);
    let app = app_with(Some(provider.clone()));

    let (status, body) = send(&app, chat_request(hello())).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Internal server error" }));
    assert_eq!(provider.calls(), 1);
}

#[tokio::test]
async fn test_chat_mid_stream_failure_aborts_body() {
    let mut provider = ScriptedProvider::new(&["partial"]);
    provider.fail_after = true;
    let app = app_with(Some(Arc::new(provider)));

    let response = app.oneshot(chat_request(hello())).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(to_bytes(response.into_body(), usize::MAX).await.is_err());
}

#[tokio::test]
async fn test_health() {
    let (status, body) = send(&app(), request(Method::GET, "/health", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"]["backend"], "memory");
    assert_eq!(body["chat"]["enabled"], false);
}
