use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{AuthResponse, LoginRequest, PublicUser},
        extractors::AuthUser,
        jwt::JwtKeys,
        services::verify_password,
    },
    members::{dto::MemberRole, repo as members_repo},
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        .route("/auth/me", get(get_me))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, (StatusCode, String)> {
    payload.username = payload.username.trim().to_lowercase();
    if payload.username.is_empty() || payload.password.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            "Missing username or password".into(),
        ));
    }

    let member = match members_repo::find_by_username(&state.db, &payload.username).await {
        Ok(Some(m)) => m,
        Ok(None) => {
            warn!(username = %payload.username, "login unknown username");
            return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
        }
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };

    let ok = match verify_password(&payload.password, &member.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err((StatusCode::INTERNAL_SERVER_ERROR, e.to_string()));
        }
    };
    if !ok {
        warn!(username = %payload.username, member_id = %member.id, "login invalid password");
        return Err((StatusCode::UNAUTHORIZED, "Invalid credentials".into()));
    }

    let role = MemberRole::parse_or_default(&member.role);
    let keys = JwtKeys::from_ref(&state);
    let token = keys
        .sign(member.id, &member.name, role)
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    info!(member_id = %member.id, username = %member.username, "member logged in");
    Ok(Json(AuthResponse {
        token,
        user: PublicUser::from(&member),
    }))
}

#[instrument(skip(state, user))]
pub async fn get_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<PublicUser>, (StatusCode, String)> {
    let member = members_repo::find_by_id(&state.db, user.0.sub)
        .await
        .map_err(|e| {
            error!(error = %e, user_id = %user.0.sub, "member lookup failed");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        })?
        .ok_or((StatusCode::UNAUTHORIZED, "User not found".to_string()))?;

    Ok(Json(PublicUser::from(&member)))
}
