use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default)]
    pub tech: Vec<String>,
}

fn default_status() -> String {
    "recruiting".into()
}

#[derive(Debug, Deserialize)]
pub struct InterestCreateRequest {
    pub project_id: Uuid,
    pub user_id: Uuid,
}

/// Terminal decisions for an interest request. Either way the interest row
/// is removed once the decision is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterestStatus {
    Approved,
    Rejected,
}

impl InterestStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            InterestStatus::Approved => "approved",
            InterestStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct InterestDecisionRequest {
    pub interest_id: Uuid,
    pub status: InterestStatus,
    pub owner_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterestsQuery {
    pub project_id: Option<Uuid>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct InterestDeleteQuery {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ProjectMembersQuery {
    pub project_id: Uuid,
}

/// Interest row joined with the project title and requester identity the
/// admin review screen renders.
#[derive(Debug, Serialize)]
pub struct EnrichedInterest {
    pub id: Uuid,
    pub project_id: Uuid,
    pub project_title: String,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct InterestCreateResponse {
    pub ok: bool,
    pub id: Uuid,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct InterestDecisionResponse {
    pub ok: bool,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_status_uses_lowercase_wire_names() {
        let parsed: InterestStatus = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(parsed, InterestStatus::Approved);
        assert_eq!(InterestStatus::Rejected.as_str(), "rejected");
        assert!(serde_json::from_str::<InterestStatus>("\"pending\"").is_err());
    }

    #[test]
    fn create_project_defaults_apply() {
        let req: CreateProjectRequest =
            serde_json::from_str(r#"{"title":"Portal refresh"}"#).unwrap();
        assert_eq!(req.status, "recruiting");
        assert!(req.summary.is_empty());
        assert!(req.tech.is_empty());
    }
}
