use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    audit,
    auth::{extractors::AdminUser, services::is_valid_email},
    email,
    onboarding::{
        dto::{
            BulkEmailRequest, BulkEmailResponse, Decision, DecisionRequest, DecisionResponse,
            JoinRequest, JoinResponse,
        },
        repo,
        services::approve,
    },
    state::AppState,
};

/// Throttle between bulk sends; SMTP providers rate-limit hard.
const BULK_EMAIL_DELAY: Duration = Duration::from_secs(1);

pub fn onboarding_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/pending-members",
            get(list_pending).post(submit_join_request).patch(decide),
        )
        .route("/admin/bulk-email", post(bulk_email))
}

#[instrument(skip(state, payload))]
pub async fn submit_join_request(
    State(state): State<AppState>,
    Json(payload): Json<JoinRequest>,
) -> Result<Json<JoinResponse>, (StatusCode, String)> {
    if payload.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Name is required".into()));
    }
    if !is_valid_email(payload.email.trim()) {
        return Err((StatusCode::BAD_REQUEST, "Invalid email".into()));
    }

    let pending = repo::insert(&state.db, &payload).await.map_err(|e| {
        error!(error = %e, "insert pending member failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(pending_id = %pending.id, email = %pending.email, "join request received");
    Ok(Json(JoinResponse {
        ok: true,
        message: "Request received! An admin will review it shortly.".into(),
        id: pending.id,
    }))
}

#[instrument(skip(state, _admin))]
pub async fn list_pending(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<repo::PendingMember>>, (StatusCode, String)> {
    let rows = repo::list_pending(&state.db).await.map_err(|e| {
        error!(error = %e, "list pending members failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(rows))
}

#[instrument(skip(state, admin, payload))]
pub async fn decide(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<DecisionRequest>,
) -> Result<Json<DecisionResponse>, (StatusCode, String)> {
    let pending = repo::find(&state.db, payload.member_id)
        .await
        .map_err(|e| {
            error!(error = %e, "pending member lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Pending member not found".to_string()))?;

    let admin_id = payload
        .admin_id
        .clone()
        .unwrap_or_else(|| admin.0.sub.to_string());

    let mut user_id = None;
    let mut email_sent = None;
    if payload.decision == Decision::Approved {
        let outcome = approve(&state, &pending, &admin_id).await.map_err(|e| {
            error!(error = %e, pending_id = %pending.id, "approval failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
        user_id = Some(outcome.member.id);
        email_sent = Some(outcome.email_sent);
    }

    let detail = serde_json::to_value(&pending).unwrap_or_default();
    audit::record_decision(
        &state.db,
        audit::KIND_MEMBER_APPROVAL,
        &pending.id.to_string(),
        payload.decision.as_str(),
        &admin_id,
        detail,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "record decision failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    // Held requests stay in the queue; terminal decisions remove them.
    if payload.decision != Decision::Held {
        let removed = repo::delete(&state.db, pending.id).await.map_err(|e| {
            error!(error = %e, "delete pending member failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
        if !removed {
            warn!(pending_id = %pending.id, "pending member already removed");
        }
    }

    let message = match payload.decision {
        Decision::Approved => format!("Member approved! Welcome email sent to {}", pending.email),
        Decision::Rejected => "Member rejected!".to_string(),
        Decision::Held => "Member held for review".to_string(),
    };
    Ok(Json(DecisionResponse {
        ok: true,
        message,
        user_id,
        name: Some(pending.name),
        email: Some(pending.email),
        email_sent,
    }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn bulk_email(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<BulkEmailRequest>,
) -> Result<Json<BulkEmailResponse>, (StatusCode, String)> {
    if payload.subject.trim().is_empty() || payload.recipients.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing subject or recipients".into(),
        ));
    }

    info!(total = payload.recipients.len(), "starting bulk email send");
    let results = email::send_bulk(
        state.mailer.as_ref(),
        &payload.recipients,
        &payload.subject,
        &payload.body,
        BULK_EMAIL_DELAY,
    )
    .await;

    let success_count = results.iter().filter(|r| r.success).count();
    info!(success_count, total = payload.recipients.len(), "bulk email send finished");
    Ok(Json(BulkEmailResponse {
        ok: true,
        total: payload.recipients.len(),
        success_count,
        results,
    }))
}
