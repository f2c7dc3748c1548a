use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::JoinRequest;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PendingMember {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub github: Option<String>,
    pub portfolio: Option<String>,
    pub interests: Vec<String>,
    pub experience: String,
    pub goals: String,
    pub role: String,
    pub availability: String,
    pub status: String,
    pub created_at: OffsetDateTime,
}

const COLUMNS: &str = "id, name, email, phone, github, portfolio, interests, experience, goals, \
     role, availability, status, created_at";

pub async fn insert(db: &PgPool, req: &JoinRequest) -> anyhow::Result<PendingMember> {
    let row = sqlx::query_as::<_, PendingMember>(&format!(
        r#"
        INSERT INTO pending_members
            (name, email, phone, github, portfolio, interests, experience, goals, role,
             availability)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
        RETURNING {COLUMNS}
        "#
    ))
    .bind(&req.name)
    .bind(&req.email)
    .bind(&req.phone)
    .bind(&req.github)
    .bind(&req.portfolio)
    .bind(&req.interests)
    .bind(&req.experience)
    .bind(&req.goals)
    .bind(&req.role)
    .bind(&req.availability)
    .fetch_one(db)
    .await?;
    Ok(row)
}

pub async fn list_pending(db: &PgPool) -> anyhow::Result<Vec<PendingMember>> {
    let rows = sqlx::query_as::<_, PendingMember>(&format!(
        "SELECT {COLUMNS} FROM pending_members WHERE status = 'pending' ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<PendingMember>> {
    let row = sqlx::query_as::<_, PendingMember>(&format!(
        "SELECT {COLUMNS} FROM pending_members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(row)
}

pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM pending_members WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}
