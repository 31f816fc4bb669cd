use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Shown to rejected applicants when the reviewer gave no reason.
pub const DEFAULT_REJECTION_REASON: &str = "No specific reason given";

/// Account role. Reviewers handle membership applications; admins manage
/// users and roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Member,
    Reviewer,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Reviewer => "reviewer",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "reviewer" => Ok(Role::Reviewer),
            "admin" => Ok(Role::Admin),
            _ => Err(()),
        }
    }
}

// Stored as TEXT; decoded through the string form.
impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse().map_err(|_| format!("invalid role: {s}"))
    }
}

/// Application state of a member account. Staff accounts are created
/// approved and never pass through review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Pending,
    Approved,
    Rejected,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Pending => "pending",
            Status::Approved => "approved",
            Status::Rejected => "rejected",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Status::Pending),
            "approved" => Ok(Status::Approved),
            "rejected" => Ok(Status::Rejected),
            _ => Err(()),
        }
    }
}

impl TryFrom<String> for Status {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse().map_err(|_| format!("invalid status: {s}"))
    }
}

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    /// Immutable campus identifier; absent for staff created directly.
    pub student_id: Option<String>,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub status: Status,
    pub faculty: Option<String>,
    pub department: Option<String>,
    pub id_card_file: Option<String>,
    pub supporting_file: Option<String>,
    pub photo_file: Option<String>,
    pub rejection_reason: Option<String>,
    pub approved_by: Option<Uuid>,
    pub approved_at: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub reset_token_hash: Option<String>,
    #[serde(skip_serializing)]
    pub reset_token_expires: Option<OffsetDateTime>,
    #[serde(skip_serializing)]
    pub otp_hash: Option<String>,
    #[serde(skip_serializing)]
    pub otp_expires: Option<OffsetDateTime>,
    pub created_at: OffsetDateTime,
}

/// Stored references to the three files an applicant must provide.
#[derive(Debug, Clone)]
pub struct DocumentSet {
    pub id_card: String,
    pub supporting: String,
    pub photo: String,
}

/// Construction-time split between applicants and staff. An applicant
/// cannot be built without its documents, so the conditional-required
/// rule lives in the type instead of per-field validation.
#[derive(Debug)]
pub enum NewUser {
    Applicant {
        student_id: String,
        name: String,
        email: String,
        password_hash: String,
        faculty: String,
        department: String,
        documents: DocumentSet,
    },
    Staff {
        name: String,
        email: String,
        password_hash: String,
        role: Role,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parse_display_round_trip() {
        for role in [Role::Member, Role::Reviewer, Role::Admin] {
            assert_eq!(role.to_string().parse::<Role>(), Ok(role));
        }
        assert!("psda".parse::<Role>().is_err());
        assert!("".parse::<Role>().is_err());
    }

    #[test]
    fn status_parse_display_round_trip() {
        for status in [Status::Pending, Status::Approved, Status::Rejected] {
            assert_eq!(status.to_string().parse::<Status>(), Ok(status));
        }
        assert!("all".parse::<Status>().is_err());
    }

    #[test]
    fn serde_uses_lowercase_tags() {
        assert_eq!(serde_json::to_string(&Role::Reviewer).unwrap(), "\"reviewer\"");
        assert_eq!(serde_json::to_string(&Status::Pending).unwrap(), "\"pending\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
    }

    #[test]
    fn password_hash_is_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            student_id: Some("A01".into()),
            name: "Test".into(),
            email: "a@x.com".into(),
            password_hash: "argon2-secret".into(),
            role: Role::Member,
            status: Status::Pending,
            faculty: None,
            department: None,
            id_card_file: None,
            supporting_file: None,
            photo_file: None,
            rejection_reason: None,
            approved_by: None,
            approved_at: None,
            reset_token_hash: Some("token-secret".into()),
            reset_token_expires: None,
            otp_hash: Some("otp-secret".into()),
            otp_expires: None,
            created_at: OffsetDateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2-secret"));
        assert!(!json.contains("token-secret"));
        assert!(!json.contains("otp-secret"));
    }
}
