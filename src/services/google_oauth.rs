// SPDX-License-Identifier: MIT

//! Google OAuth 2.0 client: authorization URL, code exchange, userinfo.
//!
//! The `state` parameter is stateless: an HMAC-signed payload carrying
//! the post-login redirect path and an issue timestamp. No server-side
//! session storage is needed, and the flow survives multiple instances.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::config::Config;
use crate::error::{AppError, Result};

type HmacSha256 = Hmac<Sha256>;

const AUTHORIZE_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

/// Signed state expires after 10 minutes.
const STATE_TTL_MILLIS: u128 = 10 * 60 * 1000;

/// Google user profile from the userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleUserInfo {
    /// Google account ID
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub picture: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// Client for the Google OAuth code flow.
#[derive(Clone)]
pub struct GoogleOAuthService {
    http_client: reqwest::Client,
    client_id: String,
    client_secret: String,
    redirect_uri: String,
}

impl GoogleOAuthService {
    pub fn new(config: &Config) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .unwrap_or_default();

        Self {
            http_client,
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            redirect_uri: config.google_redirect_uri.clone(),
        }
    }

    /// Build the consent-screen URL for the given signed state.
    pub fn authorize_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            AUTHORIZE_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            state
        )
    }

    /// Exchange an authorization code for an access token.
    pub async fn exchange_code(&self, code: &str) -> Result<String> {
        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("grant_type", "authorization_code"),
            ("redirect_uri", self.redirect_uri.as_str()),
        ];

        let response = self
            .http_client
            .post(TOKEN_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("token request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, body = %body, "Google token exchange failed");
            return Err(AppError::OAuth(format!(
                "token exchange returned status {}",
                status
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("invalid token response: {}", e)))?;

        Ok(token.access_token)
    }

    /// Fetch the user's profile with an access token.
    pub async fn fetch_userinfo(&self, access_token: &str) -> Result<GoogleUserInfo> {
        let response = self
            .http_client
            .get(USERINFO_URL)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AppError::OAuth(format!("userinfo request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::OAuth(format!(
                "userinfo returned status {}",
                response.status()
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AppError::OAuth(format!("invalid userinfo response: {}", e)))
    }
}

/// Create a signed OAuth state: `redirect_path|timestamp_hex|signature_hex`,
/// base64url-encoded as a whole.
pub fn create_signed_state(redirect_path: &str, secret: &[u8]) -> Result<String> {
    let timestamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("System time error: {}", e)))?
        .as_millis();

    let payload = format!("{}|{:x}", redirect_path, timestamp);

    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("HMAC init failed: {}", e)))?;
    mac.update(payload.as_bytes());
    let signature = mac.finalize().into_bytes();

    let signed = format!("{}|{}", payload, hex::encode(signature));
    Ok(URL_SAFE_NO_PAD.encode(signed.as_bytes()))
}

/// Verify the signature and freshness of an OAuth state parameter,
/// returning the embedded redirect path.
pub fn verify_signed_state(state: &str, secret: &[u8]) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(state).ok()?;
    let state_str = String::from_utf8(bytes).ok()?;

    let parts: Vec<&str> = state_str.splitn(3, '|').collect();
    if parts.len() != 3 {
        return None;
    }

    let redirect_path = parts[0];
    let timestamp_hex = parts[1];
    let signature_hex = parts[2];

    let payload = format!("{}|{}", redirect_path, timestamp_hex);

    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(payload.as_bytes());
    let expected_signature = hex::encode(mac.finalize().into_bytes());

    if signature_hex != expected_signature {
        tracing::error!("OAuth state signature mismatch! Potential tampering.");
        return None;
    }

    let issued_at = u128::from_str_radix(timestamp_hex, 16).ok()?;
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_millis();

    if now.saturating_sub(issued_at) > STATE_TTL_MILLIS {
        tracing::warn!("OAuth state expired");
        return None;
    }

    Some(redirect_path.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_state_round_trip() {
        let secret = b"secret_key";
        let state = create_signed_state("/profile/index_login.html", secret).unwrap();

        let result = verify_signed_state(&state, secret);
        assert_eq!(result, Some("/profile/index_login.html".to_string()));
    }

    #[test]
    fn test_signed_state_rejects_wrong_secret() {
        let secret = b"secret_key";
        let state = create_signed_state("/profile/index_login.html", secret).unwrap();

        assert_eq!(verify_signed_state(&state, b"wrong_key"), None);
    }

    #[test]
    fn test_signed_state_rejects_tampered_payload() {
        let secret = b"secret_key";
        let state = create_signed_state("/profile/index_login.html", secret).unwrap();

        let decoded = URL_SAFE_NO_PAD.decode(&state).unwrap();
        let tampered = String::from_utf8(decoded)
            .unwrap()
            .replace("index_login", "evil");
        let reencoded = URL_SAFE_NO_PAD.encode(tampered.as_bytes());

        assert_eq!(verify_signed_state(&reencoded, secret), None);
    }

    #[test]
    fn test_signed_state_rejects_malformed_input() {
        let secret = b"secret_key";
        assert_eq!(verify_signed_state("not-base64!!", secret), None);

        let malformed = URL_SAFE_NO_PAD.encode("only|two".as_bytes());
        assert_eq!(verify_signed_state(&malformed, secret), None);
    }

    #[test]
    fn test_signed_state_rejects_expired_timestamp() {
        let secret = b"secret_key";
        // Hand-build a state issued well past the TTL.
        let stale_ts = 1_000u128; // 1970
        let payload = format!("/profile/index_login.html|{:x}", stale_ts);
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(payload.as_bytes());
        let signature = hex::encode(mac.finalize().into_bytes());
        let state = URL_SAFE_NO_PAD.encode(format!("{}|{}", payload, signature).as_bytes());

        assert_eq!(verify_signed_state(&state, secret), None);
    }

    #[test]
    fn test_authorize_url_contains_redirect_and_state() {
        let config = crate::config::Config::test_default();
        let service = GoogleOAuthService::new(&config);

        let url = service.authorize_url("abc123");
        assert!(url.starts_with("https://accounts.google.com/o/oauth2/v2/auth?"));
        assert!(url.contains("state=abc123"));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains(&urlencoding::encode(&config.google_redirect_uri).to_string()));
    }
}
