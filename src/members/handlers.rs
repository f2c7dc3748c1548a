use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use serde_json::json;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::extractors::AdminUser,
    auth::services::{derive_username, generate_password, hash_password},
    email::credentials_email,
    members::{
        dto::{
            CredentialsUpdateRequest, CredentialsUpdateResponse, DashboardMember,
            DashboardProject, DashboardQuery, DashboardResponse, DashboardStats,
            LeaderboardEntry, LeaderboardQuery, MemberRole, StatsUpdateRequest,
            StatsUpdateResponse,
        },
        repo,
    },
    onboarding::services::GENERATED_PASSWORD_LEN,
    projects::repo as projects_repo,
    state::AppState,
};

pub fn member_routes() -> Router<AppState> {
    Router::new()
        .route("/leaderboard", get(leaderboard).post(update_stats))
        .route("/members/credentials", patch(update_credentials))
        .route("/dashboard", get(dashboard))
}

fn entry_from(member: &repo::Member, rank: usize) -> LeaderboardEntry {
    LeaderboardEntry {
        rank,
        id: member.id,
        name: member.name.clone(),
        role: MemberRole::parse_or_default(&member.role),
        avatar: member.avatar.clone(),
        points: member.points,
        badges: member.badges,
        github: member.github.clone(),
        portfolio: member.portfolio.clone(),
        projects_completed: member.projects_completed,
    }
}

#[instrument(skip(state))]
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(q): Query<LeaderboardQuery>,
) -> Result<Json<serde_json::Value>, (StatusCode, String)> {
    if let Some(user_id) = q.user_id {
        let member = repo::find_by_id(&state.db, user_id)
            .await
            .map_err(|e| {
                error!(error = %e, "member lookup failed");
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
            })?
            .ok_or((StatusCode::NOT_FOUND, "Member not found".to_string()))?;
        let rank = repo::rank_of(&state.db, user_id).await.map_err(|e| {
            error!(error = %e, "rank lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
        return Ok(Json(json!(entry_from(&member, rank as usize))));
    }

    let rows = repo::leaderboard(&state.db, q.limit).await.map_err(|e| {
        error!(error = %e, "leaderboard query failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    let entries: Vec<LeaderboardEntry> = rows
        .iter()
        .enumerate()
        .map(|(i, member)| entry_from(member, i + 1))
        .collect();
    Ok(Json(json!(entries)))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_stats(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<StatsUpdateRequest>,
) -> Result<Json<StatsUpdateResponse>, (StatusCode, String)> {
    let counters = repo::apply_stat_action(&state.db, payload.user_id, payload.action, payload.value)
        .await
        .map_err(|e| {
            error!(error = %e, "stat update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Member not found".to_string()))?;

    let (points, badges, projects_completed) = counters;
    info!(user_id = %payload.user_id, action = ?payload.action, points, "stats updated");
    Ok(Json(StatsUpdateResponse {
        ok: true,
        points,
        badges,
        projects_completed,
    }))
}

#[instrument(skip(state, _admin, payload))]
pub async fn update_credentials(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(payload): Json<CredentialsUpdateRequest>,
) -> Result<Json<CredentialsUpdateResponse>, (StatusCode, String)> {
    let member = repo::find_by_id(&state.db, payload.member_id)
        .await
        .map_err(|e| {
            error!(error = %e, "member lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Member not found".to_string()))?;

    let username = payload
        .username
        .as_deref()
        .map(|u| u.trim().to_lowercase())
        .filter(|u| !u.is_empty())
        .unwrap_or_else(|| derive_username(&member.name));
    let password = payload
        .password
        .filter(|p| !p.is_empty())
        .unwrap_or_else(|| generate_password(GENERATED_PASSWORD_LEN));

    let password_hash = hash_password(&password).map_err(|e| {
        error!(error = %e, "password hashing failed");
        (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;
    repo::update_credentials(&state.db, member.id, &username, &password_hash)
        .await
        .map_err(|e| {
            error!(error = %e, "credentials update failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    // The credentials email carries the only copy of the plaintext; a send
    // failure is reported, not fatal.
    let mut email_sent = false;
    if payload.send_email {
        let (subject, body) = credentials_email(&member.name, &username, &password);
        match state.mailer.send(&member.email, &subject, &body).await {
            Ok(()) => email_sent = true,
            Err(e) => warn!(member_id = %member.id, error = %e, "credentials email failed"),
        }
    }

    info!(member_id = %member.id, %username, email_sent, "credentials updated");
    Ok(Json(CredentialsUpdateResponse {
        ok: true,
        message: format!("Credentials updated for {}", member.name),
        username,
        email_sent,
    }))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    Query(q): Query<DashboardQuery>,
) -> Result<Json<DashboardResponse>, (StatusCode, String)> {
    let member = repo::find_by_id(&state.db, q.user_id)
        .await
        .map_err(|e| {
            error!(error = %e, "member lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::NOT_FOUND, "Member not found".to_string()))?;

    let owned = projects_repo::projects_owned_by(&state.db, member.id)
        .await
        .map_err(|e| {
            error!(error = %e, "owned projects query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    let joined_ids = projects_repo::project_ids_for_user(&state.db, member.id)
        .await
        .map_err(|e| {
            error!(error = %e, "joined projects query failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;
    let joined = projects_repo::projects_by_ids(&state.db, &joined_ids)
        .await
        .map_err(|e| {
            error!(error = %e, "joined projects fetch failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?;

    // A member can own a project they also joined; keep one copy.
    let mut projects = owned;
    for project in joined {
        if !projects.iter().any(|p| p.id == project.id) {
            projects.push(project);
        }
    }

    let counts = futures::future::join_all(
        projects
            .iter()
            .map(|p| projects_repo::count_members(&state.db, p.id)),
    )
    .await;

    let projects: Vec<DashboardProject> = projects
        .into_iter()
        .zip(counts)
        .map(|(p, count)| DashboardProject {
            id: p.id,
            title: p.title,
            summary: p.summary,
            status: p.status,
            owner_id: p.owner_id,
            tech: p.tech,
            member_count: count.unwrap_or(0),
        })
        .collect();

    let stats = DashboardStats {
        active_projects: projects.len(),
    };
    Ok(Json(DashboardResponse {
        member: DashboardMember {
            id: member.id,
            name: member.name,
            email: member.email,
            role: MemberRole::parse_or_default(&member.role),
            avatar: member.avatar,
            points: member.points,
            badges: member.badges,
            github: member.github,
            portfolio: member.portfolio,
            joined_at: member.joined_at,
        },
        stats,
        projects,
    }))
}
