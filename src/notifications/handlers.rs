use axum::{
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::extractors::AdminUser,
    config::WebPushConfig,
    notifications::{
        dispatch::{dispatch, persist_outcome},
        dto::{
            NotificationsQuery, PushPayload, ScheduleRequest, ScheduleResult, SendRequest,
            SendResponse, SubscribeRequest, UnsubscribeRequest,
        },
        repo, schedule,
    },
    state::AppState,
};

const SEND_SOURCE: &str = "webpush";

pub fn notification_routes() -> Router<AppState> {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/subscribe", post(subscribe))
        .route("/notifications/unsubscribe", post(unsubscribe))
        .route("/webpush/send", post(webpush_send))
        .route("/webpush/schedule", post(create_schedule))
        .route("/webpush/process-schedules", post(process_schedules))
}

fn secret_authorized(headers: &HeaderMap, config: &WebPushConfig) -> bool {
    let given = headers
        .get("x-webpush-secret")
        .and_then(|v| v.to_str().ok());
    match (&config.send_secret, given) {
        (Some(expected), Some(given)) => expected == given,
        _ => false,
    }
}

#[instrument(skip(state, payload))]
pub async fn subscribe(
    State(state): State<AppState>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let sub = payload.subscription;
    if sub.endpoint.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing subscription endpoint".into()));
    }

    repo::upsert_subscription(
        &state.db,
        &sub.endpoint,
        &sub.keys.p256dh,
        &sub.keys.auth,
        payload.user_id,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "subscription upsert failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(endpoint = %sub.endpoint, user_id = ?payload.user_id, "push subscription saved");
    Ok(Json(json!({
        "success": true,
        "message": "Successfully subscribed to notifications",
    })))
}

#[instrument(skip(state, payload))]
pub async fn unsubscribe(
    State(state): State<AppState>,
    Json(payload): Json<UnsubscribeRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if payload.endpoint.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Missing endpoint".into()));
    }
    repo::delete_subscription(&state.db, &payload.endpoint)
        .await
        .map_err(|e| {
            error!(error = %e, "subscription delete failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(json!({ "success": true })))
}

#[instrument(skip(state))]
pub async fn list_notifications(
    State(state): State<AppState>,
    Query(q): Query<NotificationsQuery>,
) -> Result<Json<Vec<repo::Notification>>, (StatusCode, String)> {
    let rows = repo::list_notifications(&state.db, q.user_id, q.limit)
        .await
        .map_err(|e| {
            error!(error = %e, "list notifications failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(rows))
}

/// Broadcast to every stored subscription. Reachable by staff with a session
/// token, or by automation holding the shared webpush secret.
#[instrument(skip(state, admin, headers, payload))]
pub async fn webpush_send(
    State(state): State<AppState>,
    admin: Option<AdminUser>,
    headers: HeaderMap,
    Json(payload): Json<SendRequest>,
) -> Result<Json<SendResponse>, (StatusCode, String)> {
    if admin.is_none() && !secret_authorized(&headers, &state.config.webpush) {
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".into()));
    }

    let payload: PushPayload = payload.payload;
    let subs = repo::list_subscriptions(&state.db).await.map_err(|e| {
        error!(error = %e, "list subscriptions failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    let outcome = dispatch(state.push.as_ref(), &subs, &payload)
        .await
        .map_err(|e| {
            error!(error = %e, "dispatch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    persist_outcome(&state, &outcome, &payload, &payload.source(SEND_SOURCE))
        .await
        .map_err(|e| {
            error!(error = %e, "persisting send outcome failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    info!(
        total = outcome.results.len(),
        notified_users = outcome.notified_users.len(),
        removed = outcome.gone.len(),
        "webpush broadcast finished"
    );
    Ok(Json(SendResponse {
        results: outcome.results,
    }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn create_schedule(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<ScheduleRequest>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    // Reject payloads the processor would choke on later.
    let normalized: PushPayload = serde_json::from_value(payload.payload.clone())
        .map_err(|e| (StatusCode::BAD_REQUEST, format!("Invalid payload: {e}")))?;

    let id = repo::insert_schedule(
        &state.db,
        &payload.payload.to_string(),
        &payload.audience,
        payload.send_at,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "insert schedule failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(schedule_id = %id, title = %normalized.title, send_at = %payload.send_at, "notification scheduled");
    Ok(Json(json!({ "ok": true, "id": id })))
}

/// Cron entry point: settles every due pending schedule in one pass.
#[instrument(skip(state, headers))]
pub async fn process_schedules(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<ScheduleResult>>, (StatusCode, String)> {
    if !secret_authorized(&headers, &state.config.webpush) {
        warn!("process-schedules called without a valid secret");
        return Err((StatusCode::UNAUTHORIZED, "Unauthorized".into()));
    }

    let results = schedule::process_due(&state).await.map_err(|e| {
        error!(error = %e, "process-schedules failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn config(secret: Option<&str>) -> WebPushConfig {
        WebPushConfig {
            public_key: "pub".into(),
            private_key: "priv".into(),
            subject: "mailto:test@example.com".into(),
            send_secret: secret.map(String::from),
        }
    }

    #[test]
    fn secret_header_must_match_configured_secret() {
        let mut headers = HeaderMap::new();
        headers.insert("x-webpush-secret", HeaderValue::from_static("hunter2"));
        assert!(secret_authorized(&headers, &config(Some("hunter2"))));
        assert!(!secret_authorized(&headers, &config(Some("other"))));
    }

    #[test]
    fn missing_secret_or_header_is_rejected() {
        let empty = HeaderMap::new();
        assert!(!secret_authorized(&empty, &config(Some("hunter2"))));

        // no configured secret means the gate never opens
        let mut headers = HeaderMap::new();
        headers.insert("x-webpush-secret", HeaderValue::from_static("anything"));
        assert!(!secret_authorized(&headers, &config(None)));
    }
}
