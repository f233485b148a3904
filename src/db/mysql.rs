// SPDX-License-Identifier: MIT

//! MySQL client wrapper with typed, traced operations.
//!
//! Every query runs inside a `db.query`/`db.execute` span carrying the
//! SQL verb and target table, and its duration lands in the metrics
//! registry under the same labels. Connections come from a lazily
//! initialized pool, so construction never blocks on the server being
//! reachable; `/health` surfaces unreachability instead.

use std::sync::Arc;
use std::time::Instant;

use sqlx::mysql::{MySqlPool, MySqlPoolOptions};
use tracing::Instrument;

use crate::error::AppError;
use crate::models::{LearnStatusRecord, User};
use crate::telemetry::MetricsRegistry;

const MAX_CONNECTIONS: u32 = 10;

/// MySQL database client.
#[derive(Clone)]
pub struct Database {
    pool: MySqlPool,
    metrics: Arc<MetricsRegistry>,
}

impl Database {
    /// Create a client with a lazily connected pool.
    pub fn connect(database_url: &str, metrics: Arc<MetricsRegistry>) -> Result<Self, AppError> {
        let pool = MySqlPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect_lazy(database_url)
            .map_err(|e| AppError::Database(format!("Invalid database URL: {}", e)))?;

        tracing::info!("Database pool initialized");

        Ok(Self { pool, metrics })
    }

    /// Apply pending schema migrations.
    pub async fn run_migrations(&self) -> Result<(), AppError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| AppError::Database(format!("Migration failed: {}", e)))
    }

    /// Wrap a query future in a span and record duration metrics.
    async fn traced<T, F>(&self, span_name: &str, sql: &str, fut: F) -> Result<T, AppError>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        let operation = extract_operation(sql);
        let table = extract_table(sql).unwrap_or("unknown");

        let span = tracing::info_span!(
            "db.query",
            otel.name = span_name,
            db.system = "mysql",
            db.operation = operation,
            db.sql.table = table,
        );

        let start = Instant::now();
        let result = fut.instrument(span).await;
        self.metrics
            .record_db_query(operation, table, start.elapsed());

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                operation,
                table,
                "Database query failed"
            );
            AppError::Database(e.to_string())
        })
    }

    /// Cheap connectivity probe used by /health and /ready.
    pub async fn ping(&self) -> Result<(), AppError> {
        let sql = "SELECT 1";
        self.traced("db.ping", sql, async {
            sqlx::query(sql).execute(&self.pool).await.map(|_| ())
        })
        .await
    }

    // ─── User Operations ─────────────────────────────────────────

    /// Look up a user by email.
    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let sql = "SELECT * FROM users WHERE email = ?";
        self.traced("db.query", sql, async {
            sqlx::query_as::<_, User>(sql)
                .bind(email)
                .fetch_optional(&self.pool)
                .await
        })
        .await
    }

    /// Look up a user matching either the email or the Google account ID.
    pub async fn find_user_by_email_or_google_id(
        &self,
        email: &str,
        google_id: &str,
    ) -> Result<Option<User>, AppError> {
        let sql = "SELECT * FROM users WHERE email = ? OR google_id = ?";
        self.traced("db.query", sql, async {
            sqlx::query_as::<_, User>(sql)
                .bind(email)
                .bind(google_id)
                .fetch_optional(&self.pool)
                .await
        })
        .await
    }

    /// Fetch a user by primary key.
    pub async fn get_user(&self, id: u64) -> Result<Option<User>, AppError> {
        let sql = "SELECT * FROM users WHERE id = ?";
        self.traced("db.query", sql, async {
            sqlx::query_as::<_, User>(sql)
                .bind(id)
                .fetch_optional(&self.pool)
                .await
        })
        .await
    }

    /// Insert a password-authenticated user, returning its new ID.
    pub async fn insert_local_user(
        &self,
        email: &str,
        password_hash: &str,
    ) -> Result<u64, AppError> {
        let sql = "INSERT INTO users (email, password, auth_provider) VALUES (?, ?, 'local')";
        self.traced("db.execute", sql, async {
            sqlx::query(sql)
                .bind(email)
                .bind(password_hash)
                .execute(&self.pool)
                .await
                .map(|r| r.last_insert_id())
        })
        .await
    }

    /// Insert a Google-authenticated user (no password), returning its new ID.
    pub async fn insert_google_user(
        &self,
        email: &str,
        google_id: &str,
        avatar_url: Option<&str>,
        name: Option<&str>,
    ) -> Result<u64, AppError> {
        let sql = "INSERT INTO users (email, google_id, avatar_url, name, password, auth_provider) \
                   VALUES (?, ?, ?, ?, '', 'google')";
        self.traced("db.execute", sql, async {
            sqlx::query(sql)
                .bind(email)
                .bind(google_id)
                .bind(avatar_url)
                .bind(name)
                .execute(&self.pool)
                .await
                .map(|r| r.last_insert_id())
        })
        .await
    }

    /// Backfill the Google identity onto an existing password account.
    pub async fn link_google_account(
        &self,
        user_id: u64,
        google_id: &str,
        avatar_url: Option<&str>,
        name: Option<&str>,
    ) -> Result<(), AppError> {
        let sql = "UPDATE users SET google_id = ?, avatar_url = ?, name = ? WHERE id = ?";
        self.traced("db.execute", sql, async {
            sqlx::query(sql)
                .bind(google_id)
                .bind(avatar_url)
                .bind(name)
                .bind(user_id)
                .execute(&self.pool)
                .await
                .map(|_| ())
        })
        .await
    }

    // ─── Learn Status Operations ─────────────────────────────────

    /// Append a learning-status record.
    pub async fn insert_learn_status(
        &self,
        user_email: &str,
        context_id: u32,
        err_count: u32,
        time_record: f64,
    ) -> Result<(), AppError> {
        let sql = "INSERT INTO learn_status (user_email, context_id, err_count, time_record) \
                   VALUES (?, ?, ?, ?)";
        self.traced("db.execute", sql, async {
            sqlx::query(sql)
                .bind(user_email)
                .bind(context_id)
                .bind(err_count)
                .bind(time_record)
                .execute(&self.pool)
                .await
                .map(|_| ())
        })
        .await
    }

    /// All learning-status records for a user, ordered by context.
    pub async fn list_learn_status(
        &self,
        user_email: &str,
    ) -> Result<Vec<LearnStatusRecord>, AppError> {
        let sql = "SELECT context_id, err_count, time_record, created_at \
                   FROM learn_status WHERE user_email = ? ORDER BY context_id";
        self.traced("db.query", sql, async {
            sqlx::query_as::<_, LearnStatusRecord>(sql)
                .bind(user_email)
                .fetch_all(&self.pool)
                .await
        })
        .await
    }
}

/// Extract the SQL verb for span attributes and metric labels.
fn extract_operation(sql: &str) -> &'static str {
    match sql
        .split_whitespace()
        .next()
        .map(|word| word.to_ascii_uppercase())
        .as_deref()
    {
        Some("SELECT") => "SELECT",
        Some("INSERT") => "INSERT",
        Some("UPDATE") => "UPDATE",
        Some("DELETE") => "DELETE",
        Some("CREATE") => "CREATE",
        Some("DROP") => "DROP",
        Some("ALTER") => "ALTER",
        _ => "OTHER",
    }
}

/// Extract the target table name from common statement shapes.
fn extract_table(sql: &str) -> Option<&str> {
    let mut words = sql.split_whitespace();

    while let Some(word) = words.next() {
        let keyword = word.to_ascii_uppercase();
        match keyword.as_str() {
            "FROM" | "UPDATE" => return words.next(),
            "INTO" => return words.next(),
            _ => continue,
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_operation() {
        assert_eq!(extract_operation("SELECT * FROM users"), "SELECT");
        assert_eq!(extract_operation("select 1"), "SELECT");
        assert_eq!(
            extract_operation("INSERT INTO learn_status VALUES (?)"),
            "INSERT"
        );
        assert_eq!(extract_operation("UPDATE users SET name = ?"), "UPDATE");
        assert_eq!(extract_operation("SHOW TABLES"), "OTHER");
        assert_eq!(extract_operation(""), "OTHER");
    }

    #[test]
    fn test_extract_table() {
        assert_eq!(
            extract_table("SELECT * FROM users WHERE email = ?"),
            Some("users")
        );
        assert_eq!(
            extract_table("INSERT INTO learn_status (a) VALUES (?)"),
            Some("learn_status")
        );
        assert_eq!(
            extract_table("UPDATE users SET google_id = ?"),
            Some("users")
        );
        assert_eq!(extract_table("SELECT 1"), None);
    }

    #[test]
    fn test_extract_table_mixed_case() {
        assert_eq!(extract_table("select id from Users"), Some("Users"));
    }
}
