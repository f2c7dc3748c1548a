use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

/// Payload handed to the browser's notification display API. Every field the
/// service worker reads is normalized here so a sparse admin payload still
/// renders with the portal's branding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub vibrate: Vec<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    pub renotify: bool,
    pub require_interaction: bool,
    pub silent: bool,
    pub actions: Vec<serde_json::Value>,
    pub data: serde_json::Value,
}

impl Default for PushPayload {
    fn default() -> Self {
        Self {
            title: "DevForge".into(),
            body: String::new(),
            icon: "/app-icon-192.png".into(),
            badge: "/app-icon-72.png".into(),
            image: None,
            vibrate: vec![200, 100, 200],
            tag: None,
            renotify: false,
            require_interaction: false,
            silent: false,
            actions: Vec::new(),
            data: serde_json::Value::Object(serde_json::Map::new()),
        }
    }
}

impl PushPayload {
    /// Where the in-app notification entry links to: `data.url` or the root.
    pub fn click_url(&self) -> String {
        self.data
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or("/")
            .to_string()
    }

    /// Source label stored on notification-center rows: the payload's tag
    /// when present, otherwise the sending route's fallback.
    pub fn source(&self, fallback: &str) -> String {
        self.tag.clone().unwrap_or_else(|| fallback.into())
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionKeysJson {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Deserialize)]
pub struct WebPushSubscriptionJson {
    pub endpoint: String,
    pub keys: SubscriptionKeysJson,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub subscription: WebPushSubscriptionJson,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct UnsubscribeRequest {
    pub endpoint: String,
}

#[derive(Debug, Deserialize)]
pub struct SendRequest {
    #[serde(default)]
    pub payload: PushPayload,
}

#[derive(Debug, Deserialize)]
pub struct ScheduleRequest {
    pub payload: serde_json::Value,
    #[serde(default = "default_audience")]
    pub audience: String,
    #[serde(with = "time::serde::rfc3339")]
    pub send_at: OffsetDateTime,
}

fn default_audience() -> String {
    "subscribed".into()
}

#[derive(Debug, Deserialize)]
pub struct NotificationsQuery {
    pub user_id: Uuid,
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    50
}

#[derive(Debug, Clone, Serialize)]
pub struct DeliveryResult {
    pub endpoint: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub results: Vec<DeliveryResult>,
}

#[derive(Debug, Serialize)]
pub struct ScheduleResult {
    pub id: Uuid,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sparse_payload_gets_portal_defaults() {
        let payload: PushPayload = serde_json::from_str("{}").unwrap();
        assert_eq!(payload.title, "DevForge");
        assert_eq!(payload.icon, "/app-icon-192.png");
        assert_eq!(payload.badge, "/app-icon-72.png");
        assert_eq!(payload.vibrate, vec![200, 100, 200]);
        assert!(!payload.require_interaction);
        assert!(payload.actions.is_empty());
    }

    #[test]
    fn camel_case_fields_are_honored() {
        let payload: PushPayload = serde_json::from_str(
            r#"{"title":"Meet","requireInteraction":true,"tag":"events","data":{"url":"/events"}}"#,
        )
        .unwrap();
        assert!(payload.require_interaction);
        assert_eq!(payload.click_url(), "/events");
        // the tag wins over whatever fallback the route would use
        assert_eq!(payload.source("webpush"), "events");
    }

    #[test]
    fn click_url_falls_back_to_root() {
        let payload = PushPayload::default();
        assert_eq!(payload.click_url(), "/");
        assert_eq!(payload.source("webpush"), "webpush");
        assert_eq!(payload.source("webpush-schedule"), "webpush-schedule");
    }
}
