use axum::{
    extract::{Path, Query, State},
    routing::{get, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    activity::{self, LogAction},
    applications::dto::{ApplicationQuery, PageQuery, Paginated, RejectRequest},
    auth::extractors::ReviewerUser,
    error::ApiError,
    mail::templates,
    state::AppState,
    users::{
        repo as users_repo,
        repo_types::{Status, User, DEFAULT_REJECTION_REASON},
    },
};

use super::repo;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/applications/pending", get(list_pending))
        .route("/applications", get(list_all))
        .route("/applications/:id", get(get_application))
        .route("/applications/:id/approve", put(approve))
        .route("/applications/:id/reject", put(reject))
}

#[instrument(skip(state, _reviewer))]
pub async fn list_pending(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
) -> Result<Json<Vec<User>>, ApiError> {
    let applications = repo::list_pending(&state.db).await?;
    Ok(Json(applications))
}

#[instrument(skip(state, _reviewer))]
pub async fn list_all(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
    Query(query): Query<ApplicationQuery>,
) -> Result<Json<Paginated<User>>, ApiError> {
    let status = match query.status.as_deref() {
        None | Some("all") => None,
        Some(s) => Some(
            s.parse::<Status>()
                .map_err(|_| ApiError::BadRequest(format!("unknown status: {s}")))?,
        ),
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (_, limit) = page.clamped();
    let applications = repo::list(&state.db, status, limit, page.offset()).await?;
    let total = repo::count(&state.db, status).await?;
    Ok(Json(Paginated::new(applications, total, &page)))
}

#[instrument(skip(state, _reviewer))]
pub async fn get_application(
    State(state): State<AppState>,
    _reviewer: ReviewerUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let application = users_repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("Application"))?;
    Ok(Json(application))
}

/// Second call on the same application reports `AlreadyProcessed`: the
/// conditional update returned nothing and the row exists in a terminal
/// state.
async fn processed_or_missing(state: &AppState, id: Uuid) -> ApiError {
    match users_repo::find_by_id(&state.db, id).await {
        Ok(Some(_)) => ApiError::AlreadyProcessed,
        Ok(None) => ApiError::NotFound("Application"),
        Err(e) => ApiError::Internal(e),
    }
}

#[instrument(skip(state, reviewer))]
pub async fn approve(
    State(state): State<AppState>,
    ReviewerUser(reviewer): ReviewerUser,
    Path(id): Path<Uuid>,
) -> Result<Json<User>, ApiError> {
    let Some(application) = repo::approve(&state.db, id, reviewer.id).await? else {
        return Err(processed_or_missing(&state, id).await);
    };

    activity::record(
        &state.db,
        reviewer.id,
        LogAction::ApproveApplication,
        format!("{} approved {}'s application", reviewer.name, application.name),
        Some(application.id),
        json!({}),
    )
    .await;

    // Approval is durable even if the notification is not.
    let (subject, html) = templates::approved(&application.name);
    if let Err(e) = state.mailer.send(&application.email, &subject, &html).await {
        warn!(error = %e, email = %application.email, "approval email failed");
    }

    info!(application_id = %application.id, reviewer_id = %reviewer.id, "application approved");
    Ok(Json(application))
}

#[instrument(skip(state, reviewer, payload))]
pub async fn reject(
    State(state): State<AppState>,
    ReviewerUser(reviewer): ReviewerUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RejectRequest>,
) -> Result<Json<User>, ApiError> {
    let reason = payload
        .reason
        .map(|r| r.trim().to_string())
        .filter(|r| !r.is_empty())
        .unwrap_or_else(|| DEFAULT_REJECTION_REASON.to_string());

    let Some(application) = repo::reject(&state.db, id, reviewer.id, &reason).await? else {
        return Err(processed_or_missing(&state, id).await);
    };

    activity::record(
        &state.db,
        reviewer.id,
        LogAction::RejectApplication,
        format!(
            "{} rejected {}'s application. Reason: {}",
            reviewer.name, application.name, reason
        ),
        Some(application.id),
        json!({ "reason": reason }),
    )
    .await;

    let (subject, html) = templates::rejected(&application.name, &reason);
    if let Err(e) = state.mailer.send(&application.email, &subject, &html).await {
        warn!(error = %e, email = %application.email, "rejection email failed");
    }

    info!(application_id = %application.id, reviewer_id = %reviewer.id, "application rejected");
    Ok(Json(application))
}
