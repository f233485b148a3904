// SPDX-License-Identifier: MIT

//! Password registration and login routes.

use axum::{extract::State, routing::post, Json, Router};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;
use validator::Validate;

use crate::error::{AppError, Result};
use crate::middleware::auth::create_jwt;
use crate::AppState;

/// bcrypt cost factor for new password hashes.
const BCRYPT_COST: u32 = 10;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
}

#[derive(Deserialize, Validate)]
pub struct RegisterRequest {
    #[serde(default)]
    #[validate(email(message = "Invalid email format"))]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    success: bool,
}

/// Register a new password account.
async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    }
    body.validate()
        .map_err(|_| AppError::BadRequest("Invalid email format".to_string()))?;

    let span = tracing::info_span!(
        "business.user.register",
        user.email = %body.email,
        business.operation = "user_registration",
    );

    async {
        if state.db.find_user_by_email(&body.email).await?.is_some() {
            return Err(AppError::BadRequest(
                "This email is already registered".to_string(),
            ));
        }

        let password_hash = bcrypt::hash(&body.password, BCRYPT_COST)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("Password hashing failed: {}", e)))?;

        let user_id = state
            .db
            .insert_local_user(&body.email, &password_hash)
            .await?;

        tracing::info!(user_id, email = %body.email, "User registered");

        Ok(Json(RegisterResponse { success: true }))
    }
    .instrument(span)
    .await
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    success: bool,
    token: String,
}

/// Log in with email and password, returning a session JWT.
async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    if body.email.is_empty() || body.password.is_empty() {
        return Err(AppError::BadRequest("Missing required fields".to_string()));
    }

    let span = tracing::info_span!(
        "business.user.login",
        user.email = %body.email,
        business.operation = "user_login",
    );

    async {
        let user = state
            .db
            .find_user_by_email(&body.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let valid_password = bcrypt::verify(&body.password, &user.password).unwrap_or(false);

        tracing::info!(
            email = %body.email,
            valid_password,
            "Password validation result"
        );

        if !valid_password {
            return Err(AppError::InvalidCredentials);
        }

        let token = create_jwt(user.id, &user.email, &state.config.jwt_secret)
            .map_err(|e| AppError::Internal(anyhow::anyhow!("JWT creation failed: {}", e)))?;

        Ok(Json(LoginResponse {
            success: true,
            token,
        }))
    }
    .instrument(span)
    .await
}
