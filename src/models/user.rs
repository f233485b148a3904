// SPDX-License-Identifier: MIT

//! User model for storage and API.

use serde::{Deserialize, Serialize};

/// User row in the `users` table.
///
/// Password accounts have a bcrypt hash and `auth_provider = "local"`.
/// Google accounts are created with an empty hash and get `google_id`,
/// `avatar_url` and `name` from the userinfo endpoint; an existing
/// password account is linked in place on first Google login.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: u64,
    pub email: String,
    /// bcrypt hash; empty string for OAuth-only accounts
    #[serde(skip_serializing)]
    pub password: String,
    pub google_id: Option<String>,
    pub avatar_url: Option<String>,
    pub name: Option<String>,
    pub auth_provider: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl User {
    /// Whether this account is linked to a Google identity.
    pub fn is_google_user(&self) -> bool {
        self.google_id.is_some()
    }
}
