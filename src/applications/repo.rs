use sqlx::PgPool;
use uuid::Uuid;

use crate::users::repo::USER_COLUMNS;
use crate::users::repo_types::{Status, User};

pub async fn list_pending(db: &PgPool) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE role = 'member' AND status = 'pending' \
         ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list(
    db: &PgPool,
    status: Option<Status>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE role = 'member' AND ($1::text IS NULL OR status = $1) \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(status.map(|s| s.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool, status: Option<Status>) -> anyhow::Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users \
         WHERE role = 'member' AND ($1::text IS NULL OR status = $1)",
    )
    .bind(status.map(|s| s.as_str()))
    .fetch_one(db)
    .await?;
    Ok(total)
}

/// Move a pending application to approved. The status guard sits in the
/// WHERE clause, so two concurrent calls serialize on the row and at most
/// one of them gets the application back.
pub async fn approve(db: &PgPool, id: Uuid, reviewer: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users \
         SET status = 'approved', approved_by = $2, approved_at = now() \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(reviewer)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Same guard as [`approve`]; stores the rejection reason alongside the
/// reviewer reference.
pub async fn reject(
    db: &PgPool,
    id: Uuid,
    reviewer: Uuid,
    reason: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users \
         SET status = 'rejected', rejection_reason = $3, approved_by = $2 \
         WHERE id = $1 AND status = 'pending' \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(reviewer)
    .bind(reason)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// (total, pending, approved, rejected) over member applications.
pub async fn counts_by_status(db: &PgPool) -> anyhow::Result<(i64, i64, i64, i64)> {
    let counts = sqlx::query_as::<_, (i64, i64, i64, i64)>(
        "SELECT COUNT(*), \
                COUNT(*) FILTER (WHERE status = 'pending'), \
                COUNT(*) FILTER (WHERE status = 'approved'), \
                COUNT(*) FILTER (WHERE status = 'rejected') \
         FROM users WHERE role = 'member'",
    )
    .fetch_one(db)
    .await?;
    Ok(counts)
}

pub async fn counts_by_faculty(db: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT COALESCE(faculty, 'Unknown'), COUNT(*) \
         FROM users WHERE role = 'member' \
         GROUP BY 1 ORDER BY 2 DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn counts_by_role(db: &PgPool) -> anyhow::Result<Vec<(String, i64)>> {
    let rows = sqlx::query_as::<_, (String, i64)>(
        "SELECT role, COUNT(*) FROM users GROUP BY role ORDER BY 2 DESC",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}
