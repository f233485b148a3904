// SPDX-License-Identifier: MIT

//! Learning-status records.

use serde::{Deserialize, Serialize};

/// Learning-status row as returned by the query endpoint. Rows are
/// append-only per (user, context); inserts bind scalars directly.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LearnStatusRecord {
    pub context_id: u32,
    pub err_count: u32,
    /// Time spent, fractional seconds
    pub time_record: f64,
    pub created_at: chrono::DateTime<chrono::Utc>,
}
