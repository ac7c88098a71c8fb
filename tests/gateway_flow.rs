//! End-to-end request flows through a real listener and a mock upstream.

use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};

mod common;

#[tokio::test]
async fn test_unknown_route_is_json_404() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"
        "#,
        backend.url("/users")
    ))
    .await;

    let response = reqwest::get(gateway.url("/missing")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key("x-request-id"));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Route not found"}));
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_method_not_allowed() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"
        methods = ["GET"]
        "#,
        backend.url("/users")
    ))
    .await;

    let response = reqwest::Client::new()
        .delete(gateway.url("/users"))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers()["allow"], "GET");
    assert_eq!(backend.hits(), 0);
}

#[tokio::test]
async fn test_path_variables_reach_upstream() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "user_detail"
        path = "/users/{{id}}"
        target = "{}"
        "#,
        backend.url("/v2/accounts/{id}")
    ))
    .await;

    let response = reqwest::get(gateway.url("/users/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body: Value = response.json().await.unwrap();
    assert_eq!(body["path"], "/v2/accounts/42");
}

#[tokio::test]
async fn test_cache_hit_skips_upstream() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"

        [routes.cache]
        ttl = 60
        "#,
        backend.url("/users")
    ))
    .await;

    let first = reqwest::get(gateway.url("/users")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let first_body = first.text().await.unwrap();

    let second = reqwest::get(gateway.url("/users")).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(second.text().await.unwrap(), first_body);

    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_rate_limit_rejects_third_request() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"

        [routes.rate_limit]
        limit = 2
        period = 60
        "#,
        backend.url("/users")
    ))
    .await;

    for expected_remaining in ["1", "0"] {
        let response = reqwest::get(gateway.url("/users")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["x-ratelimit-limit"], "2");
        assert_eq!(response.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let response = reqwest::get(gateway.url("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = response.headers()["retry-after"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({"error": "Rate limit exceeded"}));
    assert_eq!(backend.hits(), 2);
}

#[tokio::test]
async fn test_api_key_auth() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "private"
        path = "/private"
        target = "{}"

        [routes.auth]
        type = "api_key"
        keys = ["test-key-123"]
        "#,
        backend.url("/private")
    ))
    .await;

    let client = reqwest::Client::new();

    let denied = client.get(gateway.url("/private")).send().await.unwrap();
    assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(denied.headers()["www-authenticate"], "API-Key");
    let body: Value = denied.json().await.unwrap();
    assert_eq!(body, json!({"error": "Invalid API key"}));

    let allowed = client
        .get(gateway.url("/private"))
        .header("X-API-Key", "test-key-123")
        .send()
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);
    assert_eq!(backend.hits(), 1);
}

#[tokio::test]
async fn test_response_filter_projects_fields() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"

        [routes.response_filter]
        exclude = ["secret", "path"]
        "#,
        backend.url("/users")
    ))
    .await;

    let body: Value = reqwest::get(gateway.url("/users"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"name": "alice"}));
}

#[tokio::test]
async fn test_unreachable_upstream_is_bad_gateway() {
    let dead = common::closed_port().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "down"
        path = "/down"
        target = "http://{dead}/down"

        [routes.timeout]
        duration_ms = 2000
        retries = 1
        retry_delay_ms = 10
        "#
    ))
    .await;

    let response = reqwest::get(gateway.url("/down")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);

    let body: Value = response.json().await.unwrap();
    let message = body["error"].as_str().unwrap();
    assert!(message.starts_with("Failed to reach target API"));
}

#[tokio::test]
async fn test_graceful_shutdown_stops_server() {
    let backend = common::start_mock_backend().await;
    let gateway = common::start_gateway(&format!(
        r#"
        [[routes]]
        name = "users"
        path = "/users"
        target = "{}"
        "#,
        backend.url("/users")
    ))
    .await;

    let response = reqwest::get(gateway.url("/users")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    drop(response);

    gateway.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), gateway.handle)
        .await
        .expect("server did not stop after shutdown")
        .unwrap();
    assert!(result.is_ok());
}
