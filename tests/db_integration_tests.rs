// SPDX-License-Identifier: MIT

//! MySQL integration tests.
//!
//! These tests require a reachable MySQL server and are skipped unless
//! `TEST_DATABASE_URL` is set, e.g.
//! `TEST_DATABASE_URL=mysql://root:@127.0.0.1/learntrack_test cargo test`.
//!
//! Each test uses a unique email so runs do not interfere with each
//! other or with leftover rows from earlier runs.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use http_body_util::BodyExt;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use learntrack::middleware::auth::{create_jwt, Claims};
use tower::ServiceExt;

mod common;

/// Generate a unique email for test isolation.
fn unique_email(prefix: &str) -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    format!("{}+{}@example.com", prefix, nanos)
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).expect("response body should be JSON")
}

fn json_request(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_register_duplicate_email_rejected() {
    require_database!();
    let (app, _) = common::create_live_test_app().await;

    let email = unique_email("dup");
    let payload = serde_json::json!({ "email": email, "password": "pw123456" });

    let first = app
        .clone()
        .oneshot(json_request("POST", "/api/auth/register", payload.clone()))
        .await
        .unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_json(first).await["success"], true);

    let second = app
        .oneshot(json_request("POST", "/api/auth/register", payload))
        .await
        .unwrap();
    assert_eq!(second.status(), StatusCode::BAD_REQUEST);

    let body = body_json(second).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "This email is already registered");
}

#[tokio::test]
async fn test_login_returns_decodable_token() {
    require_database!();
    let (app, state) = common::create_live_test_app().await;

    let email = unique_email("login");
    let register = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "email": email, "password": "pw123456" }),
        ))
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::OK);

    let login = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": "pw123456" }),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::OK);

    let body = body_json(login).await;
    assert_eq!(body["success"], true);

    // The issued token must decode with the middleware's validation.
    let token = body["token"].as_str().expect("token should be a string");
    let key = DecodingKey::from_secret(&state.config.jwt_secret);
    let claims = decode::<Claims>(token, &key, &Validation::new(Algorithm::HS256))
        .expect("login token should decode")
        .claims;
    assert_eq!(claims.email, email);
    assert!(claims.sub.parse::<u64>().is_ok());
}

#[tokio::test]
async fn test_login_with_wrong_password_unauthorized() {
    require_database!();
    let (app, _) = common::create_live_test_app().await;

    let email = unique_email("wrongpw");
    let register = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/auth/register",
            serde_json::json!({ "email": email, "password": "pw123456" }),
        ))
        .await
        .unwrap();
    assert_eq!(register.status(), StatusCode::OK);

    let login = app
        .oneshot(json_request(
            "POST",
            "/api/auth/login",
            serde_json::json!({ "email": email, "password": "not-the-password" }),
        ))
        .await
        .unwrap();
    assert_eq!(login.status(), StatusCode::UNAUTHORIZED);

    let body = body_json(login).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid email or password");
}

#[tokio::test]
async fn test_health_ok_with_reachable_database() {
    require_database!();
    let (app, _) = common::create_live_test_app().await;

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_learn_status_roundtrip() {
    require_database!();
    let (app, state) = common::create_live_test_app().await;

    let email = unique_email("learn");
    let create = app
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/profile/learn_status",
            serde_json::json!({
                "user_email": email,
                "context_id": 7,
                "err_count": 2,
                "time_record": 12.5,
            }),
        ))
        .await
        .unwrap();
    assert_eq!(create.status(), StatusCode::OK);
    assert_eq!(body_json(create).await["success"], true);

    let token = create_jwt(1, &email, &state.config.jwt_secret).unwrap();
    let list = app
        .oneshot(
            Request::builder()
                .uri("/api/profile/learn_status")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(list.status(), StatusCode::OK);

    let body = body_json(list).await;
    assert_eq!(body["success"], true);
    let data = body["data"].as_array().expect("data should be an array");
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["context_id"], 7);
    assert_eq!(data[0]["err_count"], 2);
    assert_eq!(data[0]["time_record"], 12.5);
}
