use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::users::repo_types::{NewUser, Role, User};

pub(crate) const USER_COLUMNS: &str = "id, student_id, name, email, password_hash, role, status, \
     faculty, department, id_card_file, supporting_file, photo_file, \
     rejection_reason, approved_by, approved_at, \
     reset_token_hash, reset_token_expires, otp_hash, otp_expires, created_at";

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_student_id(db: &PgPool, student_id: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE student_id = $1"
    ))
    .bind(student_id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
    ))
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Lookup for the reset and OTP flows, which identify the account by the
/// (student_id, email) pair.
pub async fn find_by_identity_pair(
    db: &PgPool,
    student_id: &str,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE student_id = $1 AND email = $2"
    ))
    .bind(student_id)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Any existing user holding the given student_id or email, checked before
/// registration so the caller can name the conflicting field.
pub async fn find_conflicting(
    db: &PgPool,
    student_id: &str,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE student_id = $1 OR email = $2 LIMIT 1"
    ))
    .bind(student_id)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Another user (not `id`) already holding `email`.
pub async fn find_other_with_email(
    db: &PgPool,
    email: &str,
    id: Uuid,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND id <> $2"
    ))
    .bind(email)
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

/// Insert a new account. Applicants start pending; staff start approved.
pub async fn create(db: &PgPool, new_user: NewUser) -> anyhow::Result<User> {
    let user = match new_user {
        NewUser::Applicant {
            student_id,
            name,
            email,
            password_hash,
            faculty,
            department,
            documents,
        } => {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users \
                     (id, student_id, name, email, password_hash, role, status, \
                      faculty, department, id_card_file, supporting_file, photo_file) \
                 VALUES ($1, $2, $3, $4, $5, 'member', 'pending', $6, $7, $8, $9, $10) \
                 RETURNING {USER_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(student_id)
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(faculty)
            .bind(department)
            .bind(documents.id_card)
            .bind(documents.supporting)
            .bind(documents.photo)
            .fetch_one(db)
            .await?
        }
        NewUser::Staff {
            name,
            email,
            password_hash,
            role,
        } => {
            sqlx::query_as::<_, User>(&format!(
                "INSERT INTO users (id, name, email, password_hash, role, status) \
                 VALUES ($1, $2, $3, $4, $5, 'approved') \
                 RETURNING {USER_COLUMNS}"
            ))
            .bind(Uuid::new_v4())
            .bind(name)
            .bind(email)
            .bind(password_hash)
            .bind(role.as_str())
            .fetch_one(db)
            .await?
        }
    };
    Ok(user)
}

pub async fn update_profile(
    db: &PgPool,
    id: Uuid,
    name: &str,
    email: &str,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users SET name = $2, email = $3 WHERE id = $1 RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(name)
    .bind(email)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn set_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_photo(db: &PgPool, id: Uuid, filename: &str) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET photo_file = $2 WHERE id = $1")
        .bind(id)
        .bind(filename)
        .execute(db)
        .await?;
    Ok(())
}

/// Change a user's role. Promotion to a staff role force-approves the
/// account regardless of its current review state.
pub async fn set_role(db: &PgPool, id: Uuid, role: Role) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users \
         SET role = $2, status = CASE WHEN $3::boolean THEN 'approved' ELSE status END \
         WHERE id = $1 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(id)
    .bind(role.as_str())
    .bind(role != Role::Member)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

// Credential-recovery fields below are touched only through these narrow
// updates; nothing else on the row is read or written.

pub async fn store_reset_token(
    db: &PgPool,
    id: Uuid,
    token_hash: &str,
    expires: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET reset_token_hash = $2, reset_token_expires = $3 WHERE id = $1")
        .bind(id)
        .bind(token_hash)
        .bind(expires)
        .execute(db)
        .await?;
    Ok(())
}

/// Consume an unexpired reset token and install the new password hash in a
/// single statement, so the token can never be used twice.
pub async fn reset_password_by_token(
    db: &PgPool,
    token_hash: &str,
    new_password_hash: &str,
    now: OffsetDateTime,
) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "UPDATE users \
         SET password_hash = $2, reset_token_hash = NULL, reset_token_expires = NULL \
         WHERE reset_token_hash = $1 AND reset_token_expires > $3 \
         RETURNING {USER_COLUMNS}"
    ))
    .bind(token_hash)
    .bind(new_password_hash)
    .bind(now)
    .fetch_optional(db)
    .await?;
    Ok(user)
}

pub async fn store_otp(
    db: &PgPool,
    id: Uuid,
    otp_hash: &str,
    expires: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET otp_hash = $2, otp_expires = $3 WHERE id = $1")
        .bind(id)
        .bind(otp_hash)
        .bind(expires)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn clear_otp(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE users SET otp_hash = NULL, otp_expires = NULL WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list(
    db: &PgPool,
    role: Option<Role>,
    limit: i64,
    offset: i64,
) -> anyhow::Result<Vec<User>> {
    let rows = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users \
         WHERE ($1::text IS NULL OR role = $1) \
         ORDER BY created_at DESC \
         LIMIT $2 OFFSET $3"
    ))
    .bind(role.map(|r| r.as_str()))
    .bind(limit)
    .bind(offset)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count(db: &PgPool, role: Option<Role>) -> anyhow::Result<i64> {
    let total = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR role = $1)",
    )
    .bind(role.map(|r| r.as_str()))
    .fetch_one(db)
    .await?;
    Ok(total)
}
