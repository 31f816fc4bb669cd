use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

/// An event on the cooperative's board, managed by reviewers.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub category: String,
    pub description: String,
    pub date: Date,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: String,
    pub poster_file: Option<String>,
    pub attendance_enabled: bool,
    pub created_by: Uuid,
    pub created_at: OffsetDateTime,
}

#[derive(Debug)]
pub struct NewEvent {
    pub title: String,
    pub category: String,
    pub description: String,
    pub date: Date,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: String,
    pub poster_file: Option<String>,
    pub attendance_enabled: bool,
    pub created_by: Uuid,
}

/// Partial update; `None` leaves the stored value untouched.
#[derive(Debug, Default)]
pub struct EventPatch {
    pub title: Option<String>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub date: Option<Date>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub location: Option<String>,
    pub poster_file: Option<String>,
    pub attendance_enabled: Option<bool>,
}
