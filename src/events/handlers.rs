use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use time::{macros::format_description, Date};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::{dto::MessageResponse, extractors::ReviewerUser},
    error::ApiError,
    files::{self, FileKind, Upload},
    state::AppState,
};

use super::{
    repo,
    repo_types::{Event, EventPatch, NewEvent},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", get(list_events).post(create_event))
        .route(
            "/events/:id",
            get(get_event).put(update_event).delete(delete_event),
        )
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
}

/// Everything an event form can carry; both create and update read the
/// same multipart shape.
#[derive(Default)]
struct EventForm {
    title: Option<String>,
    category: Option<String>,
    description: Option<String>,
    date: Option<Date>,
    start_time: Option<String>,
    end_time: Option<String>,
    location: Option<String>,
    attendance_enabled: Option<bool>,
    poster: Option<Upload>,
}

fn malformed_multipart<E>(_: E) -> ApiError {
    ApiError::BadRequest("Malformed multipart body".into())
}

fn parse_date(s: &str) -> Result<Date, ApiError> {
    let fmt = format_description!("[year]-[month]-[day]");
    Date::parse(s, &fmt).map_err(|_| ApiError::BadRequest("date must be YYYY-MM-DD".into()))
}

async fn collect_event_form(mut mp: Multipart) -> Result<EventForm, ApiError> {
    let mut form = EventForm::default();
    while let Ok(Some(field)) = mp.next_field().await {
        let Some(name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(field.text().await.map_err(malformed_multipart)?),
            "category" => form.category = Some(field.text().await.map_err(malformed_multipart)?),
            "description" => {
                form.description = Some(field.text().await.map_err(malformed_multipart)?)
            }
            "date" => {
                let raw = field.text().await.map_err(malformed_multipart)?;
                form.date = Some(parse_date(raw.trim())?);
            }
            "start_time" => form.start_time = Some(field.text().await.map_err(malformed_multipart)?),
            "end_time" => form.end_time = Some(field.text().await.map_err(malformed_multipart)?),
            "location" => form.location = Some(field.text().await.map_err(malformed_multipart)?),
            "attendance_enabled" => {
                let raw = field.text().await.map_err(malformed_multipart)?;
                form.attendance_enabled = Some(raw != "false");
            }
            "poster" => {
                form.poster = Some(Upload {
                    original_name: field.file_name().unwrap_or("upload").to_string(),
                    content_type: field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string(),
                    body: field.bytes().await.map_err(malformed_multipart)?,
                });
            }
            _ => {}
        }
    }
    Ok(form)
}

async fn store_poster(state: &AppState, poster: Upload) -> Result<String, ApiError> {
    files::validate_upload(&poster, state.config.uploads.max_bytes)?;
    let filename = state
        .files
        .save(FileKind::Poster, &poster.original_name, poster.body)
        .await?;
    Ok(filename)
}

#[instrument(skip(state, reviewer, mp))]
pub async fn create_event(
    State(state): State<AppState>,
    ReviewerUser(reviewer): ReviewerUser,
    mp: Multipart,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let form = collect_event_form(mp).await?;

    let title = form
        .title
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("title is required".into()))?;
    let date = form
        .date
        .ok_or_else(|| ApiError::BadRequest("date is required".into()))?;
    let location = form
        .location
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| ApiError::BadRequest("location is required".into()))?;

    let poster_file = match form.poster {
        Some(poster) => Some(store_poster(&state, poster).await?),
        None => None,
    };

    let event = repo::insert(
        &state.db,
        NewEvent {
            title,
            category: form.category.unwrap_or_else(|| "Workshop".into()),
            description: form.description.unwrap_or_default(),
            date,
            start_time: form.start_time,
            end_time: form.end_time,
            location,
            poster_file,
            attendance_enabled: form.attendance_enabled.unwrap_or(true),
            created_by: reviewer.id,
        },
    )
    .await?;

    info!(event_id = %event.id, reviewer_id = %reviewer.id, "event created");
    Ok((StatusCode::CREATED, Json(event)))
}

#[instrument(skip(state, _reviewer))]
pub async fn list_events(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
) -> Result<Json<Vec<Event>>, ApiError> {
    let events = repo::list(&state.db).await?;
    Ok(Json(events))
}

#[instrument(skip(state, _reviewer))]
pub async fn get_event(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Event>, ApiError> {
    let event = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Event"))?;
    Ok(Json(event))
}

#[instrument(skip(state, _reviewer, mp))]
pub async fn update_event(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
    Path(id): Path<Uuid>,
    mp: Multipart,
) -> Result<Json<Event>, ApiError> {
    let form = collect_event_form(mp).await?;

    let poster_file = match form.poster {
        Some(poster) => Some(store_poster(&state, poster).await?),
        None => None,
    };

    let event = repo::update(
        &state.db,
        id,
        EventPatch {
            title: form.title,
            category: form.category,
            description: form.description,
            date: form.date,
            start_time: form.start_time,
            end_time: form.end_time,
            location: form.location,
            poster_file,
            attendance_enabled: form.attendance_enabled,
        },
    )
    .await?
    .ok_or(ApiError::NotFound("Event"))?;

    info!(event_id = %event.id, "event updated");
    Ok(Json(event))
}

#[instrument(skip(state, _reviewer))]
pub async fn delete_event(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(ApiError::NotFound("Event"));
    }
    info!(event_id = %id, "event deleted");
    Ok(Json(MessageResponse {
        message: "Event deleted".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_iso_dates() {
        let date = parse_date("2025-09-01").unwrap();
        assert_eq!(date.to_string(), "2025-09-01");
        assert!(parse_date("01/09/2025").is_err());
        assert!(parse_date("2025-13-01").is_err());
    }
}
