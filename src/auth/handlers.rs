use axum::{
    extract::{DefaultBodyLimit, FromRef, Multipart, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use serde_json::json;
use time::{Duration, OffsetDateTime};
use tracing::{info, instrument, warn};

use crate::{
    activity::{self, LogAction},
    auth::{
        dto::{
            AuthResponse, ChangePasswordRequest, CodeLoginRequest, ForgotPasswordRequest,
            LoginRequest, MessageResponse, PublicUser, RegisterResponse, RequestLoginCodeRequest,
            ResetPasswordRequest, UpdateProfileRequest,
        },
        extractors::CurrentUser,
        jwt::JwtKeys,
        password::{hash_password, verify_password},
        tokens,
    },
    error::ApiError,
    files::{self, FileKind, Upload},
    mail::templates,
    state::AppState,
    users::{
        repo,
        repo_types::{DocumentSet, NewUser, Role, Status, User, DEFAULT_REJECTION_REASON},
    },
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/photo", put(update_photo))
        .layer(DefaultBodyLimit::max(20 * 1024 * 1024))
        .route("/auth/login", post(login))
        .route("/auth/forgot-password", post(forgot_password))
        .route("/auth/reset-password", post(reset_password))
        .route("/auth/request-login-code", post(request_login_code))
        .route("/auth/login-with-code", post(login_with_code))
        .route("/auth/logout", post(logout))
        .route("/auth/me", get(me))
        .route("/auth/profile", put(update_profile))
        .route("/auth/change-password", put(change_password))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Members must be approved before any login path succeeds; staff bypass
/// review entirely.
fn approval_gate(user: &User) -> Result<(), ApiError> {
    if user.role == Role::Member && user.status != Status::Approved {
        let message = match user.status {
            Status::Rejected => format!(
                "Your application was rejected. Reason: {}",
                user.rejection_reason
                    .as_deref()
                    .unwrap_or(DEFAULT_REJECTION_REASON)
            ),
            _ => "Your account has not been approved yet".to_string(),
        };
        return Err(ApiError::NotApproved(message));
    }
    Ok(())
}

fn malformed_multipart<E>(_: E) -> ApiError {
    ApiError::BadRequest("Malformed multipart body".into())
}

fn required(value: Option<String>, field: &str) -> Result<String, ApiError> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::BadRequest(format!("{field} is required")))
}

#[instrument(skip(state, mp))]
pub async fn register(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    let mut student_id = None;
    let mut name = None;
    let mut email = None;
    let mut password = None;
    let mut faculty = None;
    let mut department = None;
    let mut id_card: Option<Upload> = None;
    let mut supporting: Option<Upload> = None;
    let mut photo: Option<Upload> = None;

    while let Ok(Some(field)) = mp.next_field().await {
        let Some(field_name) = field.name().map(|s| s.to_string()) else {
            continue;
        };
        match field_name.as_str() {
            "student_id" => student_id = Some(field.text().await.map_err(malformed_multipart)?),
            "name" => name = Some(field.text().await.map_err(malformed_multipart)?),
            "email" => email = Some(field.text().await.map_err(malformed_multipart)?),
            "password" => password = Some(field.text().await.map_err(malformed_multipart)?),
            "faculty" => faculty = Some(field.text().await.map_err(malformed_multipart)?),
            "department" => department = Some(field.text().await.map_err(malformed_multipart)?),
            "id_card" | "supporting_doc" | "photo" => {
                let upload = Upload {
                    original_name: field.file_name().unwrap_or("upload").to_string(),
                    content_type: field
                        .content_type()
                        .unwrap_or("application/octet-stream")
                        .to_string(),
                    body: field.bytes().await.map_err(malformed_multipart)?,
                };
                match field_name.as_str() {
                    "id_card" => id_card = Some(upload),
                    "supporting_doc" => supporting = Some(upload),
                    _ => photo = Some(upload),
                }
            }
            _ => {}
        }
    }

    let student_id = required(student_id, "student_id")?;
    let name = required(name, "name")?;
    let email = required(email, "email")?.to_lowercase();
    let password = password.unwrap_or_default();
    let faculty = required(faculty, "faculty")?;
    let department = required(department, "department")?;

    if !is_valid_email(&email) {
        warn!(%email, "invalid email");
        return Err(ApiError::BadRequest("Invalid email".into()));
    }
    if password.len() < 8 {
        warn!("password too short");
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let (Some(id_card), Some(supporting), Some(photo)) = (id_card, supporting, photo) else {
        return Err(ApiError::MissingDocuments);
    };

    if let Some(existing) = repo::find_conflicting(&state.db, &student_id, &email).await? {
        let field = if existing.email == email {
            "Email"
        } else {
            "Student ID"
        };
        warn!(%student_id, %email, "registration conflict");
        return Err(ApiError::DuplicateIdentity(field));
    }

    let max_bytes = state.config.uploads.max_bytes;
    files::validate_upload(&id_card, max_bytes)?;
    files::validate_upload(&supporting, max_bytes)?;
    files::validate_upload(&photo, max_bytes)?;

    let documents = DocumentSet {
        id_card: state
            .files
            .save(FileKind::IdCard, &id_card.original_name, id_card.body)
            .await?,
        supporting: state
            .files
            .save(FileKind::Supporting, &supporting.original_name, supporting.body)
            .await?,
        photo: state
            .files
            .save(FileKind::Photo, &photo.original_name, photo.body)
            .await?,
    };

    let password_hash = hash_password(&password)?;
    let user = repo::create(
        &state.db,
        NewUser::Applicant {
            student_id,
            name,
            email,
            password_hash,
            faculty,
            department,
            documents,
        },
    )
    .await?;

    // Best-effort: the application is durable even if the email is not.
    let (subject, html) = templates::registration_received(&user.name);
    if let Err(e) = state.mailer.send(&user.email, &subject, &html).await {
        warn!(error = %e, email = %user.email, "registration email failed");
    }

    info!(user_id = %user.id, "membership application submitted");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "Registration received. Please wait for staff review.".into(),
            user: user.into(),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let user = repo::find_by_student_id(&state.db, payload.student_id.trim())
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    approval_gate(&user)?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    activity::record(
        &state.db,
        user.id,
        LogAction::Login,
        format!("{} logged in", user.name),
        None,
        json!({}),
    )
    .await;

    info!(user_id = %user.id, "user logged in");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = repo::find_by_identity_pair(&state.db, payload.student_id.trim(), &email)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    let raw_token = tokens::generate_reset_token();
    let expires = OffsetDateTime::now_utc() + Duration::minutes(tokens::RESET_TOKEN_TTL_MINUTES);
    repo::store_reset_token(&state.db, user.id, &tokens::hash_token(&raw_token), expires).await?;

    // The raw token exists only in this email; the store keeps its hash.
    let reset_url = format!(
        "{}/#/reset-password?token={}",
        state.config.public_url, raw_token
    );
    let (subject, html) = templates::reset_password(&user.name, &reset_url);
    state
        .mailer
        .send(&user.email, &subject, &html)
        .await
        .map_err(ApiError::Mail)?;

    info!(user_id = %user.id, "password reset email sent");
    Ok(Json(MessageResponse {
        message: "A password reset email has been sent".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let token_hash = tokens::hash_token(payload.token.trim());
    let new_hash = hash_password(&payload.password)?;
    let user = repo::reset_password_by_token(
        &state.db,
        &token_hash,
        &new_hash,
        OffsetDateTime::now_utc(),
    )
    .await?
    .ok_or(ApiError::InvalidOrExpiredToken)?;

    activity::record(
        &state.db,
        user.id,
        LogAction::ChangePassword,
        format!("{} changed their password", user.name),
        None,
        json!({}),
    )
    .await;

    info!(user_id = %user.id, "password reset");
    Ok(Json(MessageResponse {
        message: "Password changed".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn request_login_code(
    State(state): State<AppState>,
    Json(payload): Json<RequestLoginCodeRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = repo::find_by_identity_pair(&state.db, payload.student_id.trim(), &email)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    let code = tokens::generate_otp();
    let expires = OffsetDateTime::now_utc() + Duration::minutes(tokens::OTP_TTL_MINUTES);
    repo::store_otp(&state.db, user.id, &tokens::hash_token(&code), expires).await?;

    let (subject, html) = templates::login_code(&user.name, &code);
    state
        .mailer
        .send(&user.email, &subject, &html)
        .await
        .map_err(ApiError::Mail)?;

    info!(user_id = %user.id, "one-time login code sent");
    Ok(Json(MessageResponse {
        message: "A one-time login code has been sent to your email".into(),
    }))
}

#[instrument(skip(state, payload))]
pub async fn login_with_code(
    State(state): State<AppState>,
    Json(payload): Json<CodeLoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    let email = payload.email.trim().to_lowercase();
    let user = repo::find_by_identity_pair(&state.db, payload.student_id.trim(), &email)
        .await?
        .ok_or(ApiError::AccountNotFound)?;

    let now = OffsetDateTime::now_utc();
    let presented = tokens::hash_token(payload.code.trim());
    let valid = matches!(
        (&user.otp_hash, user.otp_expires),
        (Some(stored), Some(expires)) if *stored == presented && expires > now
    );
    if !valid {
        warn!(user_id = %user.id, "invalid or expired login code");
        return Err(ApiError::InvalidOrExpiredCode);
    }

    approval_gate(&user)?;

    // Single-use: the code is gone before the token leaves the server.
    repo::clear_otp(&state.db, user.id).await?;

    let keys = JwtKeys::from_ref(&state);
    let token = keys.sign(user.id)?;

    activity::record(
        &state.db,
        user.id,
        LogAction::Login,
        format!("{} logged in with a one-time code", user.name),
        None,
        json!({}),
    )
    .await;

    info!(user_id = %user.id, "user logged in with one-time code");
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

#[instrument(skip(state, user))]
pub async fn logout(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Json<MessageResponse>, ApiError> {
    // Tokens are stateless; logout is client-side discard, recorded here.
    activity::record(
        &state.db,
        user.id,
        LogAction::Logout,
        format!("{} logged out", user.name),
        None,
        json!({}),
    )
    .await;
    Ok(Json(MessageResponse {
        message: "Logged out".into(),
    }))
}

#[instrument(skip(user))]
pub async fn me(CurrentUser(user): CurrentUser) -> Json<PublicUser> {
    Json(user.into())
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<PublicUser>, ApiError> {
    let name = payload
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| user.name.clone());
    let email = payload
        .email
        .map(|e| e.trim().to_lowercase())
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| user.email.clone());

    if email != user.email {
        if !is_valid_email(&email) {
            return Err(ApiError::BadRequest("Invalid email".into()));
        }
        if repo::find_other_with_email(&state.db, &email, user.id)
            .await?
            .is_some()
        {
            return Err(ApiError::DuplicateIdentity("Email"));
        }
    }

    let updated = repo::update_profile(&state.db, user.id, &name, &email)
        .await?
        .ok_or(ApiError::NotFound("User"))?;

    activity::record(
        &state.db,
        updated.id,
        LogAction::UpdateProfile,
        format!("{} updated their profile", updated.name),
        None,
        json!({}),
    )
    .await;

    Ok(Json(updated.into()))
}

#[instrument(skip(state, user, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = %user.id, "change password with wrong current password");
        return Err(ApiError::InvalidCredentials);
    }
    if payload.new_password.len() < 8 {
        return Err(ApiError::BadRequest("Password too short".into()));
    }

    let new_hash = hash_password(&payload.new_password)?;
    repo::set_password(&state.db, user.id, &new_hash).await?;

    activity::record(
        &state.db,
        user.id,
        LogAction::ChangePassword,
        format!("{} changed their password", user.name),
        None,
        json!({}),
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Password changed".into(),
    }))
}

#[instrument(skip(state, user, mp))]
pub async fn update_photo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    mut mp: Multipart,
) -> Result<Json<MessageResponse>, ApiError> {
    let mut photo: Option<Upload> = None;
    while let Ok(Some(field)) = mp.next_field().await {
        if field.name() == Some("photo") {
            photo = Some(Upload {
                original_name: field.file_name().unwrap_or("upload").to_string(),
                content_type: field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string(),
                body: field.bytes().await.map_err(malformed_multipart)?,
            });
        }
    }
    let photo = photo.ok_or_else(|| ApiError::BadRequest("photo is required".into()))?;

    files::validate_upload(&photo, state.config.uploads.max_bytes)?;
    let filename = state
        .files
        .save(FileKind::Photo, &photo.original_name, photo.body)
        .await?;
    repo::set_photo(&state.db, user.id, &filename).await?;

    activity::record(
        &state.db,
        user.id,
        LogAction::UpdateProfile,
        format!("{} changed their profile photo", user.name),
        None,
        json!({}),
    )
    .await;

    Ok(Json(MessageResponse {
        message: "Profile photo updated".into(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn email_validation() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("a.b-c@kampus.ac.id"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing@tld"));
        assert!(!is_valid_email("two@@example.com"));
    }

    fn member(status: Status, reason: Option<&str>) -> User {
        User {
            id: Uuid::new_v4(),
            student_id: Some("A01".into()),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: String::new(),
            role: Role::Member,
            status,
            faculty: None,
            department: None,
            id_card_file: None,
            supporting_file: None,
            photo_file: None,
            rejection_reason: reason.map(Into::into),
            approved_by: None,
            approved_at: None,
            reset_token_hash: None,
            reset_token_expires: None,
            otp_hash: None,
            otp_expires: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn pending_member_cannot_log_in() {
        let err = approval_gate(&member(Status::Pending, None)).unwrap_err();
        match err {
            ApiError::NotApproved(msg) => assert!(msg.contains("not been approved")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejected_member_sees_the_reason() {
        let err = approval_gate(&member(Status::Rejected, Some("Blurry ID card"))).unwrap_err();
        match err {
            ApiError::NotApproved(msg) => assert!(msg.contains("Blurry ID card")),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn rejected_member_without_reason_gets_default() {
        let err = approval_gate(&member(Status::Rejected, None)).unwrap_err();
        match err {
            ApiError::NotApproved(msg) => assert!(msg.contains(DEFAULT_REJECTION_REASON)),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn approved_member_passes_the_gate() {
        assert!(approval_gate(&member(Status::Approved, None)).is_ok());
    }

    #[test]
    fn staff_bypass_the_gate_regardless_of_status() {
        let mut user = member(Status::Pending, None);
        user.role = Role::Reviewer;
        assert!(approval_gate(&user).is_ok());
        user.role = Role::Admin;
        user.status = Status::Rejected;
        assert!(approval_gate(&user).is_ok());
    }

    #[test]
    fn required_rejects_missing_and_blank_fields() {
        assert!(required(None, "name").is_err());
        assert!(required(Some("   ".into()), "name").is_err());
        assert_eq!(required(Some(" Alice ".into()), "name").unwrap(), "Alice");
    }
}
