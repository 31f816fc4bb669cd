use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    activity::{self, ActivityLogEntry, LogAction, LogFilter},
    admin::dto::{ChangeRoleRequest, CreateStaffRequest, LogQuery, UserQuery},
    applications::{
        dto::{GroupCount, PageQuery, Paginated, StatsResponse, StatusCounts},
        repo as applications_repo,
    },
    auth::{dto::PublicUser, extractors::AdminUser, handlers::is_valid_email, password},
    error::ApiError,
    state::AppState,
    users::{
        repo,
        repo_types::{NewUser, Role, User},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/admin/users", post(create_staff).get(list_users))
        .route("/admin/users/:id/role", put(change_role))
        .route("/admin/activity-logs", get(activity_logs))
        .route("/admin/staff-activity-logs", get(staff_activity_logs))
        .route("/admin/stats", get(stats))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_staff(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CreateStaffRequest>,
) -> Result<(StatusCode, Json<PublicUser>), ApiError> {
    let role = payload
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::InvalidRole)?;
    // Member accounts come in through registration and review, never here.
    if role == Role::Member {
        return Err(ApiError::InvalidRole);
    }

    let email = payload.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }
    if repo::find_by_email(&state.db, &email).await?.is_some() {
        return Err(ApiError::DuplicateIdentity("Email"));
    }

    let password_hash = password::hash_password(&payload.password)?;
    let staff = repo::create(
        &state.db,
        NewUser::Staff {
            name: payload.name.trim().to_string(),
            email,
            password_hash,
            role,
        },
    )
    .await?;

    info!(user_id = %staff.id, role = %role, "staff account created");
    Ok((StatusCode::CREATED, Json(staff.into())))
}

#[instrument(skip(state, _admin))]
pub async fn list_users(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<UserQuery>,
) -> Result<Json<Paginated<User>>, ApiError> {
    let role = match query.role.as_deref() {
        None | Some("all") => None,
        Some(r) => Some(r.parse::<Role>().map_err(|_| ApiError::InvalidRole)?),
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (_, limit) = page.clamped();
    let users = repo::list(&state.db, role, limit, page.offset()).await?;
    let total = repo::count(&state.db, role).await?;
    Ok(Json(Paginated::new(users, total, &page)))
}

#[instrument(skip(state, admin, payload))]
pub async fn change_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let new_role = payload
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::InvalidRole)?;

    let user = repo::find_by_id(&state.db, id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    let old_role = user.role;

    let updated = repo::set_role(&state.db, id, new_role)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    activity::record(
        &state.db,
        admin.id,
        LogAction::ChangeUserRole,
        format!(
            "{} changed {}'s role from {} to {}",
            admin.name, updated.name, old_role, new_role
        ),
        Some(updated.id),
        json!({ "old_role": old_role, "new_role": new_role }),
    )
    .await;

    if old_role != new_role {
        info!(user_id = %updated.id, %old_role, %new_role, "user role changed");
    } else {
        warn!(user_id = %updated.id, role = %new_role, "role change to the same role");
    }
    Ok(Json(updated.into()))
}

#[instrument(skip(state, _admin))]
pub async fn activity_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<Json<Paginated<ActivityLogEntry>>, ApiError> {
    let action = match query.action.as_deref() {
        None | Some("all") => None,
        Some(a) => Some(
            a.parse::<LogAction>()
                .map_err(|_| ApiError::BadRequest(format!("unknown action: {a}")))?,
        ),
    };
    let filter = LogFilter {
        action,
        actor: query.actor,
        staff_only: false,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (_, limit) = page.clamped();
    let logs = activity::list(&state.db, filter, limit, page.offset()).await?;
    let total = activity::count(&state.db, filter).await?;
    Ok(Json(Paginated::new(logs, total, &page)))
}

#[instrument(skip(state, _admin))]
pub async fn staff_activity_logs(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(query): Query<LogQuery>,
) -> Result<Json<Paginated<ActivityLogEntry>>, ApiError> {
    let filter = LogFilter {
        action: None,
        actor: None,
        staff_only: true,
    };
    let page = PageQuery {
        page: query.page,
        limit: query.limit,
    };
    let (_, limit) = page.clamped();
    let logs = activity::list(&state.db, filter, limit, page.offset()).await?;
    let total = activity::count(&state.db, filter).await?;
    Ok(Json(Paginated::new(logs, total, &page)))
}

#[instrument(skip(state, _admin))]
pub async fn stats(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<StatsResponse>, ApiError> {
    let (total, pending, approved, rejected) =
        applications_repo::counts_by_status(&state.db).await?;
    let by_faculty = applications_repo::counts_by_faculty(&state.db)
        .await?
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect();
    let by_role = applications_repo::counts_by_role(&state.db)
        .await?
        .into_iter()
        .map(|(key, count)| GroupCount { key, count })
        .collect();

    Ok(Json(StatsResponse {
        stats: StatusCounts {
            total,
            pending,
            approved,
            rejected,
        },
        by_faculty,
        by_role,
    }))
}
