use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::users::repo_types::{Role, Status, User};

/// Request body for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub student_id: String,
    pub password: String,
}

/// Request body for the password-reset email.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub student_id: String,
    pub email: String,
}

/// Request body carrying the raw reset token from the emailed link.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: String,
    pub password: String,
}

/// Request body for a one-time login code.
#[derive(Debug, Deserialize)]
pub struct RequestLoginCodeRequest {
    pub student_id: String,
    pub email: String,
}

/// Request body for logging in with a one-time code.
#[derive(Debug, Deserialize)]
pub struct CodeLoginRequest {
    pub student_id: String,
    pub email: String,
    pub code: String,
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Public part of the user returned to clients. Credential and recovery
/// fields never appear here.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub student_id: Option<String>,
    pub name: String,
    pub email: String,
    pub faculty: Option<String>,
    pub department: Option<String>,
    pub role: Role,
    pub status: Status,
    pub photo_file: Option<String>,
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            student_id: user.student_id,
            name: user.name,
            email: user.email,
            faculty: user.faculty,
            department: user.department,
            role: user.role,
            status: user.status,
            photo_file: user.photo_file,
        }
    }
}

/// Response returned after a successful login.
#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Response for operations whose outcome is a confirmation text.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Response returned after registration.
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: PublicUser,
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::OffsetDateTime;

    fn sample_user() -> User {
        User {
            id: Uuid::new_v4(),
            student_id: Some("A01".into()),
            name: "Alice".into(),
            email: "a@x.com".into(),
            password_hash: "secret-hash".into(),
            role: Role::Member,
            status: Status::Pending,
            faculty: Some("Engineering".into()),
            department: Some("Informatics".into()),
            id_card_file: Some("id-card-1.png".into()),
            supporting_file: Some("supporting-1.pdf".into()),
            photo_file: Some("photo-1.jpg".into()),
            rejection_reason: None,
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
    fn public_user_has_no_credential_material() {
        let public = PublicUser::from(sample_user());
        let json = serde_json::to_string(&public).unwrap();
        assert!(json.contains("\"student_id\":\"A01\""));
        assert!(json.contains("\"status\":\"pending\""));
        assert!(!json.contains("secret-hash"));
        assert!(!json.contains("password"));
    }

    #[test]
    fn auth_response_serialization() {
        let response = AuthResponse {
            token: "jwt-token".into(),
            user: sample_user().into(),
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("jwt-token"));
        assert!(json.contains("\"role\":\"member\""));
    }
}
