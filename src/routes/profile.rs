// SPDX-License-Identifier: MIT

//! Learning-status routes.

use axum::{
    extract::State,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::Instrument;

use crate::error::{AppError, Result};
use crate::middleware::auth::AuthUser;
use crate::models::LearnStatusRecord;
use crate::AppState;

/// Creation is public: the in-page exercise JS posts results before the
/// login state is known, identifying the user by email.
pub fn public_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile/learn_status", post(create_learn_status))
}

pub fn protected_routes() -> Router<Arc<AppState>> {
    Router::new().route("/api/profile/learn_status", get(list_learn_status))
}

#[derive(Deserialize)]
pub struct CreateLearnStatusRequest {
    #[serde(default)]
    user_email: String,
    context_id: Option<u32>,
    err_count: Option<u32>,
    time_record: Option<f64>,
}

#[derive(Serialize)]
pub struct CreateLearnStatusResponse {
    success: bool,
}

/// Append a learning-status record.
async fn create_learn_status(
    State(state): State<Arc<AppState>>,
    Json(body): Json<CreateLearnStatusRequest>,
) -> Result<Json<CreateLearnStatusResponse>> {
    let (context_id, err_count, time_record) =
        match (body.context_id, body.err_count, body.time_record) {
            (Some(c), Some(e), Some(t)) if !body.user_email.is_empty() => (c, e, t),
            _ => return Err(AppError::BadRequest("Missing required fields".to_string())),
        };

    let span = tracing::info_span!(
        "business.learn_status.create",
        user.email = %body.user_email,
        context_id,
        err_count,
        time_record,
    );

    async {
        state
            .db
            .insert_learn_status(&body.user_email, context_id, err_count, time_record)
            .await?;

        Ok(Json(CreateLearnStatusResponse { success: true }))
    }
    .instrument(span)
    .await
}

#[derive(Serialize)]
pub struct LearnStatusListResponse {
    success: bool,
    data: Vec<LearnStatusRecord>,
}

/// List the authenticated user's learning-status records.
async fn list_learn_status(
    State(state): State<Arc<AppState>>,
    Extension(auth): Extension<AuthUser>,
) -> Result<Json<LearnStatusListResponse>> {
    let span = tracing::info_span!(
        "business.learn_status.query",
        user.email = %auth.email,
    );

    async {
        let rows = state.db.list_learn_status(&auth.email).await?;

        tracing::info!(
            user_email = %auth.email,
            row_count = rows.len(),
            "Learn status query completed"
        );

        Ok(Json(LearnStatusListResponse {
            success: true,
            data: rows,
        }))
    }
    .instrument(span)
    .await
}
