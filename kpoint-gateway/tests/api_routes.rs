use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use kpoint_core::{Config, Secrets, Settings};
use kpoint_db::test_helpers::create_test_gateway;
use kpoint_gateway::server::create_router;
use kpoint_gateway::state::AppState;
use serde_json::{Value, json};
use tower::ServiceExt;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TEXT: &str = "Cats are mammals. Dogs bark loudly at strangers. It is raining today.";

async fn app(upstream: &str, delay_ms: u64) -> (Router, Arc<AppState>) {
    let mut settings = Settings::default();
    settings.llm.base_url = upstream.to_string();
    settings.chat.response_delay_ms = delay_ms;
    let secrets = Secrets {
        llm_api_key: Some("sk-server".to_string()),
        remote_store_token: None,
    };
    let config = Config::validated(secrets, settings).unwrap();

    let state = AppState::from_config(&config, create_test_gateway().await.unwrap())
        .await
        .unwrap();
    (create_router(state.clone()), state)
}

async fn call(router: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let request = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => request
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => request.body(Body::empty()).unwrap(),
    };

    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn health_reports_version() {
    let upstream = MockServer::start().await;
    let (router, _) = app(&upstream.uri(), 0).await;

    let (status, body) = call(&router, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn extract_select_save_search_flow() {
    // No mock mounted: upstream answers 404 and extraction falls back.
    let upstream = MockServer::start().await;
    let (router, _) = app(&upstream.uri(), 0).await;

    let (status, body) = call(&router, "POST", "/api/extract", Some(json!({"text": TEXT}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["source"], "fallback");
    assert_eq!(body["empty"], false);
    let points = body["points"].as_array().unwrap();
    assert_eq!(points.len(), 3);
    let dogs = points[1]["id"].as_str().unwrap().to_string();

    let (_, session) = call(&router, "GET", "/api/session", None).await;
    assert_eq!(session["inputText"], TEXT);
    assert_eq!(session["extracting"], false);

    let (status, toggled) = call(&router, "POST", &format!("/api/points/{dogs}/toggle"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(toggled["selected"], true);

    let (_, detail) = call(&router, "GET", "/api/detail", None).await;
    assert_eq!(detail["point"]["id"], dogs.as_str());
    assert!(detail["analogy"].is_string());

    let (status, added) = call(&router, "POST", "/api/saved", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(added.as_array().unwrap().len(), 1);
    assert_eq!(added[0]["saved"], true);
    assert!(added[0]["timestamp"].is_string());

    let (status, again) = call(&router, "POST", &format!("/api/points/{dogs}/save"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["id"], dogs.as_str());

    let (_, found) = call(&router, "GET", "/api/saved?q=BARK", None).await;
    assert_eq!(found.as_array().unwrap().len(), 1);
    let (_, missing) = call(&router, "GET", "/api/saved?q=quantum", None).await;
    assert!(missing.as_array().unwrap().is_empty());
    let (_, all) = call(&router, "GET", "/api/saved", None).await;
    assert_eq!(all.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn extract_rejects_short_input() {
    let upstream = MockServer::start().await;
    let (router, _) = app(&upstream.uri(), 0).await;

    let (status, body) = call(&router, "POST", "/api/extract", Some(json!({"text": " a "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("too short"));
    assert!(upstream.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unknown_points_are_not_found() {
    let upstream = MockServer::start().await;
    let (router, _) = app(&upstream.uri(), 0).await;

    for (method, uri) in [
        ("POST", "/api/points/kp-0-0/toggle"),
        ("POST", "/api/points/kp-0-0/save"),
        ("GET", "/api/points/kp-0-0"),
    ] {
        let (status, _) = call(&router, method, uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{method} {uri}");
    }
}

#[tokio::test]
async fn chat_reply_is_appended_after_delay() {
    let upstream = MockServer::start().await;
    let (router, state) = app(&upstream.uri(), 10).await;

    let (status, user) = call(&router, "POST", "/api/chat", Some(json!({"content": "newton"}))).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(user["isUser"], true);

    for _ in 0..200 {
        if state.chat_messages().await.len() == 2 && state.pending_replies().await == 0 {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let (_, history) = call(&router, "GET", "/api/chat", None).await;
    assert_eq!(history["pending"], 0);
    let messages = history["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[1]["isUser"], false);
    assert_eq!(messages[1]["content"], kpoint_knowledge::NO_MATCH_REPLY);

    let (status, _) = call(&router, "POST", "/api/chat", Some(json!({"content": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pending_replies_can_be_cancelled() {
    let upstream = MockServer::start().await;
    let (router, _) = app(&upstream.uri(), 60_000).await;

    call(&router, "POST", "/api/chat", Some(json!({"content": "one"}))).await;
    let (status, body) = call(&router, "DELETE", "/api/chat/pending", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cancelled"], 1);
}

#[tokio::test]
async fn llm_proxy_relays_upstream_json() {
    let upstream = MockServer::start().await;
    let upstream_reply = json!({"id": "cmpl-9", "choices": [{"message": {"role": "assistant", "content": "hi"}}]});
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-server"))
        .and(body_partial_json(json!({
            "model": "Qwen/Qwen2.5-7B-Instruct",
            "temperature": 0.1,
            "messages": [{"role": "user", "content": "hello"}]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(upstream_reply.clone()))
        .expect(1)
        .mount(&upstream)
        .await;
    let (router, _) = app(&upstream.uri(), 0).await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/llm",
        Some(json!({
            "model": "Qwen/Qwen2.5-7B-Instruct",
            "messages": [{"role": "user", "content": "hello"}],
            "options": {"temperature": 0.1}
        })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, upstream_reply);
}

#[tokio::test]
async fn llm_proxy_failures_are_bare_500() {
    let upstream = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&upstream)
        .await;
    let (router, _) = app(&upstream.uri(), 0).await;

    let (status, body) = call(
        &router,
        "POST",
        "/api/llm",
        Some(json!({"model": "m", "messages": []})),
    )
    .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "Internal server error"}));

    let request = Request::builder()
        .method("POST")
        .uri("/api/llm")
        .body(Body::from("{broken"))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
