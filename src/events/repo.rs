use sqlx::PgPool;
use uuid::Uuid;

use crate::events::repo_types::{Event, EventPatch, NewEvent};

const EVENT_COLUMNS: &str = "id, title, category, description, date, start_time, end_time, \
     location, poster_file, attendance_enabled, created_by, created_at";

pub async fn insert(db: &PgPool, new_event: NewEvent) -> anyhow::Result<Event> {
    let event = sqlx::query_as::<_, Event>(&format!(
        "INSERT INTO events \
             (id, title, category, description, date, start_time, end_time, \
              location, poster_file, attendance_enabled, created_by) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11) \
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(new_event.title)
    .bind(new_event.category)
    .bind(new_event.description)
    .bind(new_event.date)
    .bind(new_event.start_time)
    .bind(new_event.end_time)
    .bind(new_event.location)
    .bind(new_event.poster_file)
    .bind(new_event.attendance_enabled)
    .bind(new_event.created_by)
    .fetch_one(db)
    .await?;
    Ok(event)
}

pub async fn list(db: &PgPool) -> anyhow::Result<Vec<Event>> {
    let rows = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Event>> {
    let event = sqlx::query_as::<_, Event>(&format!(
        "SELECT {EVENT_COLUMNS} FROM events WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(event)
}

pub async fn update(db: &PgPool, id: Uuid, patch: EventPatch) -> anyhow::Result<Option<Event>> {
    let event = sqlx::query_as::<_, Event>(&format!(
        "UPDATE events SET \
             title = COALESCE($2::text, title), \
             category = COALESCE($3::text, category), \
             description = COALESCE($4::text, description), \
             date = COALESCE($5::date, date), \
             start_time = COALESCE($6::text, start_time), \
             end_time = COALESCE($7::text, end_time), \
             location = COALESCE($8::text, location), \
             poster_file = COALESCE($9::text, poster_file), \
             attendance_enabled = COALESCE($10::boolean, attendance_enabled) \
         WHERE id = $1 \
         RETURNING {EVENT_COLUMNS}"
    ))
    .bind(id)
    .bind(patch.title)
    .bind(patch.category)
    .bind(patch.description)
    .bind(patch.date)
    .bind(patch.start_time)
    .bind(patch.end_time)
    .bind(patch.location)
    .bind(patch.poster_file)
    .bind(patch.attendance_enabled)
    .fetch_optional(db)
    .await?;
    Ok(event)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM events WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
