use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every user-visible failure the API can produce. Infrastructure causes
/// (`Db`, `Internal`, `Mail`) are logged server-side and surfaced as a
/// generic message.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0} is already registered")]
    DuplicateIdentity(&'static str),

    #[error("ID card, supporting document and profile photo are all required")]
    MissingDocuments,

    #[error("Invalid student ID or password")]
    InvalidCredentials,

    #[error("{0}")]
    NotApproved(String),

    #[error("No account matches that student ID and email")]
    AccountNotFound,

    #[error("Reset token is invalid or has expired")]
    InvalidOrExpiredToken,

    #[error("Login code is invalid or has expired")]
    InvalidOrExpiredCode,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Application has already been processed")]
    AlreadyProcessed,

    #[error("Role must be one of: member, reviewer, admin")]
    InvalidRole,

    #[error("{0}")]
    Unauthenticated(&'static str),

    #[error("You do not have permission to perform this action")]
    Forbidden,

    #[error("Only JPEG, PNG and PDF files are allowed")]
    UnsupportedFile,

    #[error("File exceeds the {0} MB size limit")]
    FileTooLarge(u64),

    #[error("{0}")]
    BadRequest(String),

    #[error("Failed to send email, please try again")]
    Mail(#[source] anyhow::Error),

    #[error("Server error, please try again")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        use ApiError::*;
        match self {
            DuplicateIdentity(_) => StatusCode::CONFLICT,
            MissingDocuments
            | InvalidOrExpiredToken
            | InvalidOrExpiredCode
            | AlreadyProcessed
            | InvalidRole
            | UnsupportedFile
            | FileTooLarge(_)
            | BadRequest(_) => StatusCode::BAD_REQUEST,
            InvalidCredentials | Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            NotApproved(_) | Forbidden => StatusCode::FORBIDDEN,
            AccountNotFound | NotFound(_) => StatusCode::NOT_FOUND,
            Mail(_) | Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            ApiError::Internal(e) => error!(error = %e, "internal error"),
            ApiError::Mail(e) => error!(error = %e, "mail dispatch error"),
            _ => {}
        }
        let body = Json(json!({
            "success": false,
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_taxonomy() {
        assert_eq!(
            ApiError::DuplicateIdentity("Email").status(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::MissingDocuments.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::InvalidCredentials.status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::NotApproved("pending".into()).status(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::AccountNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            ApiError::InvalidOrExpiredToken.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::InvalidOrExpiredCode.status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::NotFound("Application").status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(ApiError::AlreadyProcessed.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::InvalidRole.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            ApiError::Unauthenticated("missing Authorization header").status(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(ApiError::Forbidden.status(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn internal_errors_do_not_leak_causes() {
        let err = ApiError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"));
        assert!(!err.to_string().contains("10.0.0.3"));

        let err = ApiError::Mail(anyhow::anyhow!("smtp handshake with secrets"));
        assert!(!err.to_string().contains("secrets"));
    }

    #[test]
    fn duplicate_identity_names_the_field() {
        assert_eq!(
            ApiError::DuplicateIdentity("Email").to_string(),
            "Email is already registered"
        );
        assert_eq!(
            ApiError::DuplicateIdentity("Student ID").to_string(),
            "Student ID is already registered"
        );
    }
}
