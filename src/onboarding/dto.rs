use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::email::BulkSendResult;

/// A join-request submission from the public site.
#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub phone: String,
    pub github: Option<String>,
    pub portfolio: Option<String>,
    #[serde(default)]
    pub interests: Vec<String>,
    #[serde(default = "default_experience")]
    pub experience: String,
    #[serde(default)]
    pub goals: String,
    #[serde(default = "default_role")]
    pub role: String,
    #[serde(default)]
    pub availability: String,
}

fn default_experience() -> String {
    "beginner".into()
}

fn default_role() -> String {
    "student".into()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
    Held,
}

impl Decision {
    pub fn as_str(self) -> &'static str {
        match self {
            Decision::Approved => "approved",
            Decision::Rejected => "rejected",
            Decision::Held => "held",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DecisionRequest {
    pub member_id: Uuid,
    pub decision: Decision,
    pub admin_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct JoinResponse {
    pub ok: bool,
    pub message: String,
    pub id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct DecisionResponse {
    pub ok: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_sent: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct BulkEmailRequest {
    pub subject: String,
    pub body: String,
    pub recipients: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct BulkEmailResponse {
    pub ok: bool,
    pub total: usize,
    pub success_count: usize,
    pub results: Vec<BulkSendResult>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_wire_names_are_lowercase() {
        let d: Decision = serde_json::from_str("\"approved\"").unwrap();
        assert_eq!(d, Decision::Approved);
        let d: Decision = serde_json::from_str("\"held\"").unwrap();
        assert_eq!(d, Decision::Held);
        assert!(serde_json::from_str::<Decision>("\"maybe\"").is_err());
    }
}
