// SPDX-License-Identifier: MIT

//! JWT authentication tests.
//!
//! These tests verify that tokens created by the auth routes can be
//! decoded by the auth middleware, catching compatibility issues early.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use learntrack::middleware::auth::{create_google_jwt, create_jwt, Claims};
use learntrack::models::User;

const SIGNING_KEY: &[u8] = b"test_signing_key_32_bytes_long!!";

fn decode_claims(token: &str) -> Claims {
    let key = DecodingKey::from_secret(SIGNING_KEY);
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .expect("Failed to decode JWT - check Claims struct compatibility")
        .claims
}

#[test]
fn test_jwt_roundtrip() {
    // A token from the login route must decode with the middleware's
    // Claims structure and HS256 validation.
    let token = create_jwt(42, "alice@example.com", SIGNING_KEY).unwrap();
    let claims = decode_claims(&token);

    assert_eq!(claims.sub, "42");
    assert_eq!(claims.email, "alice@example.com");
    assert!(claims.exp > claims.iat);
}

#[test]
fn test_jwt_expiry_is_one_day() {
    let token = create_jwt(1, "a@b.com", SIGNING_KEY).unwrap();
    let claims = decode_claims(&token);

    assert_eq!(claims.exp - claims.iat, 24 * 60 * 60);
}

#[test]
fn test_jwt_user_id_parses_back_to_u64() {
    let token = create_jwt(98765432, "a@b.com", SIGNING_KEY).unwrap();
    let claims = decode_claims(&token);

    let parsed: u64 = claims.sub.parse().expect("sub should parse as u64");
    assert_eq!(parsed, 98765432);
}

#[test]
fn test_google_jwt_carries_profile_fields() {
    let user = User {
        id: 7,
        email: "g@example.com".to_string(),
        password: String::new(),
        google_id: Some("google-sub-123".to_string()),
        avatar_url: Some("https://lh3.example/avatar".to_string()),
        name: Some("G User".to_string()),
        auth_provider: "google".to_string(),
        created_at: chrono::Utc::now(),
    };

    let token = create_google_jwt(&user, SIGNING_KEY).unwrap();
    let claims = decode_claims(&token);

    assert_eq!(claims.sub, "7");
    assert_eq!(claims.email, "g@example.com");
    assert_eq!(claims.name.as_deref(), Some("G User"));
    assert_eq!(claims.avatar_url.as_deref(), Some("https://lh3.example/avatar"));
    assert_eq!(claims.auth_provider.as_deref(), Some("google"));
}

#[test]
fn test_jwt_rejects_wrong_key() {
    let token = create_jwt(42, "alice@example.com", SIGNING_KEY).unwrap();

    let key = DecodingKey::from_secret(b"a_completely_different_key_here!");
    let validation = Validation::new(Algorithm::HS256);

    assert!(decode::<Claims>(&token, &key, &validation).is_err());
}
