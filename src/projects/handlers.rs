use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    audit,
    auth::extractors::{AdminUser, AuthUser},
    members::repo as members_repo,
    notifications::{dispatch::notify_user, dto::PushPayload},
    projects::{
        dto::{
            CreateProjectRequest, EnrichedInterest, InterestCreateRequest,
            InterestCreateResponse, InterestDecisionRequest, InterestDecisionResponse,
            InterestDeleteQuery, InterestStatus, InterestsQuery, ProjectMembersQuery,
        },
        repo, services,
    },
    state::AppState,
};

const INTEREST_SOURCE: &str = "project-interest";

pub fn project_routes() -> Router<AppState> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route("/project-members", get(list_project_members))
        .route("/project-interest", post(create_interest))
        .route(
            "/project-interests",
            get(list_interests).patch(decide_interest).delete(withdraw_interest),
        )
}

#[instrument(skip(state, _user))]
pub async fn list_projects(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<Vec<repo::Project>>, (StatusCode, String)> {
    let rows = repo::list_projects(&state.db).await.map_err(|e| {
        error!(error = %e, "list projects failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    Ok(Json(rows))
}

#[instrument(skip(state, user, payload))]
pub async fn create_project(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<Json<repo::Project>, (StatusCode, String)> {
    if payload.title.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Title is required".into()));
    }

    let project = repo::insert_project(
        &state.db,
        payload.title.trim(),
        &payload.summary,
        &payload.status,
        user.0.sub,
        &payload.tech,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "create project failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    info!(project_id = %project.id, owner_id = %user.0.sub, "project created");
    Ok(Json(project))
}

#[instrument(skip(state))]
pub async fn list_project_members(
    State(state): State<AppState>,
    Query(q): Query<ProjectMembersQuery>,
) -> Result<Json<Vec<repo::ProjectMember>>, (StatusCode, String)> {
    let rows = repo::list_project_members(&state.db, q.project_id)
        .await
        .map_err(|e| {
            error!(error = %e, "list project members failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    Ok(Json(rows))
}

#[instrument(skip(state, payload))]
pub async fn create_interest(
    State(state): State<AppState>,
    Json(payload): Json<InterestCreateRequest>,
) -> Result<Json<InterestCreateResponse>, (StatusCode, String)> {
    let project = repo::find_project(&state.db, payload.project_id)
        .await
        .map_err(|e| {
            error!(error = %e, "project lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Project not found".to_string()))?;

    let interest = repo::insert_interest(&state.db, payload.project_id, payload.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "insert interest failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    // Notifications are informational; the interest row is already durable.
    let requester_name = match members_repo::find_by_id(&state.db, payload.user_id).await {
        Ok(Some(member)) => member.name,
        _ => "A member".to_string(),
    };
    if let Some(owner_id) = project.owner_id {
        let owner_payload = PushPayload {
            title: "New project interest".into(),
            body: format!("{requester_name} wants to join {}", project.title),
            data: serde_json::json!({ "url": "/projects" }),
            ..PushPayload::default()
        };
        if let Err(e) = notify_user(&state, owner_id, &owner_payload, INTEREST_SOURCE).await {
            warn!(%owner_id, error = %e, "owner notification failed");
        }
    }
    let requester_payload = PushPayload {
        title: "Interest received".into(),
        body: format!(
            "Your request to join {} was sent to the project owner.",
            project.title
        ),
        data: serde_json::json!({ "url": "/projects" }),
        ..PushPayload::default()
    };
    if let Err(e) = notify_user(&state, payload.user_id, &requester_payload, INTEREST_SOURCE).await
    {
        warn!(user_id = %payload.user_id, error = %e, "requester notification failed");
    }

    info!(interest_id = %interest.id, project_id = %project.id, "interest recorded");
    Ok(Json(InterestCreateResponse {
        ok: true,
        id: interest.id,
        message: "Interest sent! The project owner will review it.".into(),
    }))
}

#[instrument(skip(state, _admin))]
pub async fn list_interests(
    State(state): State<AppState>,
    _admin: AdminUser,
    Query(q): Query<InterestsQuery>,
) -> Result<Json<Vec<EnrichedInterest>>, (StatusCode, String)> {
    let rows = repo::list_interests(&state.db, q.project_id, q.status)
        .await
        .map_err(|e| {
            error!(error = %e, "list interests failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    let enriched = futures::future::join_all(rows.into_iter().map(|interest| {
        let db = state.db.clone();
        async move {
            let project_title = match repo::find_project(&db, interest.project_id).await {
                Ok(Some(project)) => project.title,
                _ => "Unknown project".to_string(),
            };
            let (user_name, user_email) = match members_repo::find_by_id(&db, interest.user_id)
                .await
            {
                Ok(Some(member)) => (member.name, member.email),
                _ => ("Unknown member".to_string(), String::new()),
            };
            EnrichedInterest {
                id: interest.id,
                project_id: interest.project_id,
                project_title,
                user_id: interest.user_id,
                user_name,
                user_email,
                status: interest.status,
                created_at: interest.created_at,
            }
        }
    }))
    .await;

    Ok(Json(enriched))
}

#[instrument(skip(state, admin, payload))]
pub async fn decide_interest(
    State(state): State<AppState>,
    admin: AdminUser,
    Json(payload): Json<InterestDecisionRequest>,
) -> Result<Json<InterestDecisionResponse>, (StatusCode, String)> {
    let interest = repo::find_interest(&state.db, payload.interest_id)
        .await
        .map_err(|e| {
            error!(error = %e, "interest lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Interest not found".to_string()))?;

    let decided_by = payload
        .owner_id
        .clone()
        .unwrap_or_else(|| admin.0.sub.to_string());

    if payload.status == InterestStatus::Approved {
        services::approve_interest(&state, &interest, &decided_by)
            .await
            .map_err(|e| {
                error!(error = %e, interest_id = %interest.id, "interest approval failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?;
    }

    let detail = serde_json::to_value(&interest).unwrap_or_default();
    audit::record_decision(
        &state.db,
        audit::KIND_PROJECT_INTEREST,
        &interest.id.to_string(),
        payload.status.as_str(),
        &decided_by,
        detail,
    )
    .await
    .map_err(|e| {
        error!(error = %e, "record decision failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    // Both outcomes are terminal; the interest leaves the queue here.
    let removed = repo::delete_interest(&state.db, interest.id).await.map_err(|e| {
        error!(error = %e, "delete interest failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    if !removed {
        warn!(interest_id = %interest.id, "interest already removed");
    }

    let message = match payload.status {
        InterestStatus::Approved => "Interest approved! Member added to the project.".to_string(),
        InterestStatus::Rejected => "Interest rejected.".to_string(),
    };
    Ok(Json(InterestDecisionResponse { ok: true, message }))
}

#[instrument(skip(state))]
pub async fn withdraw_interest(
    State(state): State<AppState>,
    Query(q): Query<InterestDeleteQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    let removed = repo::delete_interest(&state.db, q.id).await.map_err(|e| {
        error!(error = %e, "delete interest failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    if !removed {
        return Err((StatusCode::NOT_FOUND, "Interest not found".into()));
    }
    Ok(Json(serde_json::json!({ "ok": true })))
}
