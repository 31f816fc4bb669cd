use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use crate::activity::repo_types::{ActivityLogEntry, LogAction};

const LOG_COLUMNS: &str = "id, actor, action, description, target_user, details, created_at";

/// Append one audit record. Failures are logged and swallowed so that an
/// unavailable audit trail never blocks the user-facing operation.
pub async fn record(
    db: &PgPool,
    actor: Uuid,
    action: LogAction,
    description: String,
    target_user: Option<Uuid>,
    details: serde_json::Value,
) {
    let result = sqlx::query(
        "INSERT INTO activity_logs (id, actor, action, description, target_user, details) \
         VALUES ($1, $2, $3, $4, $5, $6)",
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action.as_str())
    .bind(&description)
    .bind(target_user)
    .bind(details)
    .execute(db)
    .await;

    if let Err(e) = result {
        error!(error = %e, action = %action, %actor, "failed to append activity log");
    }
}

/// Which slice of the audit trail to read.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogFilter {
    pub action: Option<LogAction>,
    pub actor: Option<Uuid>,
    /// Restrict to entries whose actor currently holds the reviewer role.
    pub staff_only: bool,
}

pub async fn list(
    db: &PgPool,
    filter: LogFilter,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<ActivityLogEntry>> {
    let rows = sqlx::query_as::<_, ActivityLogEntry>(&format!(
        "SELECT {LOG_COLUMNS} FROM activity_logs \
         WHERE ($1::text IS NULL OR action = $1) \
           AND ($2::uuid IS NULL OR actor = $2) \
           AND (NOT $3 OR actor IN (SELECT id FROM users WHERE role = 'reviewer')) \
         ORDER BY created_at DESC \
         LIMIT $4 OFFSET $5"
    ))
    .bind(filter.action.map(|a| a.as_str()))
    .bind(filter.actor)
    .bind(filter.staff_only)
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool, filter: LogFilter) -> anyhow::Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM activity_logs \
         WHERE ($1::text IS NULL OR action = $1) \
           AND ($2::uuid IS NULL OR actor = $2) \
           AND (NOT $3 OR actor IN (SELECT id FROM users WHERE role = 'reviewer'))",
    )
    .bind(filter.action.map(|a| a.as_str()))
    .bind(filter.actor)
    .bind(filter.staff_only)
    .fetch_one(db)
    .await?;
    Ok(total)
}
