// SPDX-License-Identifier: MIT

//! Google OAuth routes: consent redirect, callback, linked profile.

use axum::{
    extract::{Query, State},
    response::Redirect,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{AppError, Result};
use crate::middleware::auth::{create_google_jwt, AuthUser};
use crate::models::User;
use crate::services::google_oauth::{create_signed_state, verify_signed_state, GoogleUserInfo};
use crate::AppState;

/// Page the frontend lands on after a successful OAuth login.
const LOGIN_REDIRECT_PATH: &str = "/profile/index_login.html";

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/google", get(auth_start))
        .route("/api/auth/google/callback", get(auth_callback))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/auth/google/profile", get(get_profile))
}

/// Start the OAuth flow: redirect to Google's consent screen.
async fn auth_start(State(state): State<Arc<AppState>>) -> Result<Redirect> {
    let oauth_state = create_signed_state(LOGIN_REDIRECT_PATH, &state.config.oauth_state_key)?;
    let auth_url = state.google_oauth.authorize_url(&oauth_state);

    tracing::info!(
        client_id = %state.config.google_client_id,
        "Starting OAuth flow, redirecting to Google"
    );

    Ok(Redirect::temporary(&auth_url))
}

#[derive(Deserialize)]
pub struct CallbackParams {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// OAuth callback: verify state, exchange code, upsert user, issue JWT.
async fn auth_callback(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Redirect> {
    let redirect_path = params
        .state
        .as_deref()
        .and_then(|s| verify_signed_state(s, &state.config.oauth_state_key))
        .ok_or_else(|| AppError::BadRequest("Invalid request state".to_string()))?;

    if let Some(error) = params.error {
        tracing::warn!(error = %error, "OAuth error from Google");
        let redirect = format!("{}?error={}", redirect_path, urlencoding::encode(&error));
        return Ok(Redirect::temporary(&redirect));
    }

    let code = params
        .code
        .ok_or_else(|| AppError::BadRequest("Authorization code missing".to_string()))?;

    tracing::info!("Exchanging authorization code for tokens");

    let access_token = state.google_oauth.exchange_code(&code).await?;
    let userinfo = state.google_oauth.fetch_userinfo(&access_token).await?;

    let user = upsert_google_user(&state, &userinfo).await?;

    tracing::info!(
        user_id = user.id,
        email = %user.email,
        "OAuth successful, user stored"
    );

    let jwt = create_google_jwt(&user, &state.config.jwt_secret)
        .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

    let redirect_url = format!("{}?token={}&login_success=true", redirect_path, jwt);
    Ok(Redirect::temporary(&redirect_url))
}

/// Find or create the account for a Google identity.
///
/// An existing account with the same email gets the Google identity
/// backfilled; otherwise a new passwordless account is created.
async fn upsert_google_user(state: &Arc<AppState>, userinfo: &GoogleUserInfo) -> Result<User> {
    if let Some(existing) = state
        .db
        .find_user_by_email_or_google_id(&userinfo.email, &userinfo.id)
        .await?
    {
        if existing.google_id.is_none() {
            state
                .db
                .link_google_account(
                    existing.id,
                    &userinfo.id,
                    userinfo.picture.as_deref(),
                    userinfo.name.as_deref(),
                )
                .await?;
            tracing::info!(user_id = existing.id, "Linked Google identity to account");
        }

        return state
            .db
            .get_user(existing.id)
            .await?
            .ok_or_else(|| AppError::NotFound("User disappeared during linking".to_string()));
    }

    let user_id = state
        .db
        .insert_google_user(
            &userinfo.email,
            &userinfo.id,
            userinfo.picture.as_deref(),
            userinfo.name.as_deref(),
        )
        .await?;

    state
        .db
        .get_user(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User disappeared after insert".to_string()))
}

#[derive(Serialize)]
pub struct ProfileUser {
    pub id: u64,
    pub email: String,
    pub name: Option<String>,
    pub avatar_url: Option<String>,
    pub is_google_user: bool,
}

#[derive(Serialize)]
pub struct ProfileResponse {
    pub success: bool,
    pub user: ProfileUser,
}

/// Get the stored profile for the authenticated user.
async fn get_profile(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<ProfileResponse>> {
    let user = state
        .db
        .get_user(auth.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User does not exist".to_string()))?;

    Ok(Json(ProfileResponse {
        success: true,
        user: ProfileUser {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            avatar_url: user.avatar_url.clone(),
            is_google_user: user.is_google_user(),
        },
    }))
}
