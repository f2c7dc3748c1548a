use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::members::dto::MemberRole;
use crate::members::repo::Member;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: PublicUser,
}

/// Public view of a member, safe to hand back to its owner.
#[derive(Debug, Serialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: MemberRole,
    pub avatar: String,
    pub points: i32,
    pub badges: i32,
}

impl From<&Member> for PublicUser {
    fn from(m: &Member) -> Self {
        Self {
            id: m.id,
            name: m.name.clone(),
            email: m.email.clone(),
            role: MemberRole::parse_or_default(&m.role),
            avatar: m.avatar.clone(),
            points: m.points,
            badges: m.badges,
        }
    }
}
