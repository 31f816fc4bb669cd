use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateStaffRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangeRoleRequest {
    pub role: String,
}

fn default_page() -> i64 {
    1
}
fn default_user_limit() -> i64 {
    10
}
fn default_log_limit() -> i64 {
    20
}

#[derive(Debug, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<String>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_user_limit")]
    pub limit: i64,
}

#[derive(Debug, Default, Deserialize)]
pub struct LogQuery {
    pub action: Option<String>,
    pub actor: Option<Uuid>,
    #[serde(default = "default_page")]
    pub page: i64,
    #[serde(default = "default_log_limit")]
    pub limit: i64,
}
