use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// The sensitive actions the audit trail records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogAction {
    ApproveApplication,
    RejectApplication,
    ChangeUserRole,
    UpdateProfile,
    ChangePassword,
    Login,
    Logout,
}

impl LogAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogAction::ApproveApplication => "approve_application",
            LogAction::RejectApplication => "reject_application",
            LogAction::ChangeUserRole => "change_user_role",
            LogAction::UpdateProfile => "update_profile",
            LogAction::ChangePassword => "change_password",
            LogAction::Login => "login",
            LogAction::Logout => "logout",
        }
    }
}

impl fmt::Display for LogAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogAction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve_application" => Ok(LogAction::ApproveApplication),
            "reject_application" => Ok(LogAction::RejectApplication),
            "change_user_role" => Ok(LogAction::ChangeUserRole),
            "update_profile" => Ok(LogAction::UpdateProfile),
            "change_password" => Ok(LogAction::ChangePassword),
            "login" => Ok(LogAction::Login),
            "logout" => Ok(LogAction::Logout),
            _ => Err(()),
        }
    }
}

impl TryFrom<String> for LogAction {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse().map_err(|_| format!("invalid log action: {s}"))
    }
}

/// One immutable audit record. Never updated or deleted by the core.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ActivityLogEntry {
    pub id: Uuid,
    pub actor: Uuid,
    #[sqlx(try_from = "String")]
    pub action: LogAction,
    pub description: String,
    pub target_user: Option<Uuid>,
    pub details: serde_json::Value,
    pub created_at: OffsetDateTime,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parse_display_round_trip() {
        for action in [
            LogAction::ApproveApplication,
            LogAction::RejectApplication,
            LogAction::ChangeUserRole,
            LogAction::UpdateProfile,
            LogAction::ChangePassword,
            LogAction::Login,
            LogAction::Logout,
        ] {
            assert_eq!(action.to_string().parse::<LogAction>(), Ok(action));
        }
        assert!("delete_user".parse::<LogAction>().is_err());
    }

    #[test]
    fn serde_matches_stored_form() {
        assert_eq!(
            serde_json::to_string(&LogAction::ApproveApplication).unwrap(),
            "\"approve_application\""
        );
        let action: LogAction = serde_json::from_str("\"change_user_role\"").unwrap();
        assert_eq!(action, LogAction::ChangeUserRole);
    }
}
