use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Portal role. Admins and mentors share the staff gate on admin routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    Student,
    Mentor,
    Alumni,
    Admin,
}

impl MemberRole {
    pub fn is_staff(self) -> bool {
        matches!(self, MemberRole::Admin | MemberRole::Mentor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MemberRole::Student => "student",
            MemberRole::Mentor => "mentor",
            MemberRole::Alumni => "alumni",
            MemberRole::Admin => "admin",
        }
    }

    /// Unknown strings fall back to the default role used across the portal.
    pub fn parse_or_default(s: &str) -> Self {
        match s {
            "mentor" => MemberRole::Mentor,
            "alumni" => MemberRole::Alumni,
            "admin" => MemberRole::Admin,
            _ => MemberRole::Student,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub id: Uuid,
    pub name: String,
    pub role: MemberRole,
    pub avatar: String,
    pub points: i32,
    pub badges: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    pub projects_completed: i32,
}

/// Admin-only stat mutation. The wire names match the portal's action enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatAction {
    AddPoints,
    AddBadge,
    CompleteProject,
    JoinProject,
    AttendEvent,
    SetPoints,
    SetBadges,
}

#[derive(Debug, Deserialize)]
pub struct StatsUpdateRequest {
    pub user_id: Uuid,
    pub action: StatAction,
    pub value: Option<i32>,
}

#[derive(Debug, Serialize)]
pub struct StatsUpdateResponse {
    pub ok: bool,
    pub points: i32,
    pub badges: i32,
    pub projects_completed: i32,
}

#[derive(Debug, Deserialize)]
pub struct CredentialsUpdateRequest {
    pub member_id: Uuid,
    pub username: Option<String>,
    pub password: Option<String>,
    #[serde(default = "default_true")]
    pub send_email: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CredentialsUpdateResponse {
    pub ok: bool,
    pub message: String,
    pub username: String,
    pub email_sent: bool,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    pub user_id: Option<Uuid>,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    100
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    pub user_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub active_projects: usize,
}

#[derive(Debug, Serialize)]
pub struct DashboardProject {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<Uuid>,
    pub tech: Vec<String>,
    pub member_count: i64,
}

#[derive(Debug, Serialize)]
pub struct DashboardMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub avatar: String,
    pub points: i32,
    pub badges: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub github: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio: Option<String>,
    pub joined_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub member: DashboardMember,
    pub stats: DashboardStats,
    pub projects: Vec<DashboardProject>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stat_action_uses_camel_case_wire_names() {
        assert_eq!(
            serde_json::to_string(&StatAction::AddPoints).unwrap(),
            "\"addPoints\""
        );
        let parsed: StatAction = serde_json::from_str("\"completeProject\"").unwrap();
        assert_eq!(parsed, StatAction::CompleteProject);
        let parsed: StatAction = serde_json::from_str("\"setBadges\"").unwrap();
        assert_eq!(parsed, StatAction::SetBadges);
    }

    #[test]
    fn role_round_trips_and_gates_staff() {
        assert_eq!(serde_json::to_string(&MemberRole::Admin).unwrap(), "\"admin\"");
        assert!(MemberRole::Admin.is_staff());
        assert!(MemberRole::Mentor.is_staff());
        assert!(!MemberRole::Student.is_staff());
        assert!(!MemberRole::Alumni.is_staff());
        assert_eq!(MemberRole::parse_or_default("mentor"), MemberRole::Mentor);
        assert_eq!(MemberRole::parse_or_default("whatever"), MemberRole::Student);
    }
}
