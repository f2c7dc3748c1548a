use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub summary: String,
    pub status: String,
    pub owner_id: Option<Uuid>,
    pub tech: Vec<String>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectInterest {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProjectMember {
    pub id: Uuid,
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub role: String,
    pub added_by: String,
    pub joined_at: OffsetDateTime,
}

const PROJECT_COLUMNS: &str = "id, title, summary, status, owner_id, tech, created_at";

pub async fn insert_project(
    db: &PgPool,
    title: &str,
    summary: &str,
    status: &str,
    owner_id: Uuid,
    tech: &[String],
) -> anyhow::Result<Project> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "INSERT INTO projects (title, summary, status, owner_id, tech) \
         VALUES ($1, $2, $3, $4, $5) RETURNING {PROJECT_COLUMNS}"
    ))
    .bind(title)
    .bind(summary)
    .bind(status)
    .bind(owner_id)
    .bind(tech)
    .fetch_one(db)
    .await?;
    Ok(project)
}

pub async fn list_projects(db: &PgPool) -> anyhow::Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects ORDER BY created_at DESC"
    ))
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn find_project(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Project>> {
    let project = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(project)
}

pub async fn projects_owned_by(db: &PgPool, owner_id: Uuid) -> anyhow::Result<Vec<Project>> {
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE owner_id = $1 ORDER BY created_at DESC"
    ))
    .bind(owner_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn projects_by_ids(db: &PgPool, ids: &[Uuid]) -> anyhow::Result<Vec<Project>> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, Project>(&format!(
        "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ANY($1) ORDER BY created_at DESC"
    ))
    .bind(ids)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_interest(
    db: &PgPool,
    project_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<ProjectInterest> {
    let interest = sqlx::query_as::<_, ProjectInterest>(
        "INSERT INTO project_interests (project_id, user_id) VALUES ($1, $2) \
         RETURNING id, project_id, user_id, status, created_at",
    )
    .bind(project_id)
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(interest)
}

pub async fn find_interest(db: &PgPool, id: Uuid) -> anyhow::Result<Option<ProjectInterest>> {
    let interest = sqlx::query_as::<_, ProjectInterest>(
        "SELECT id, project_id, user_id, status, created_at FROM project_interests WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(interest)
}

/// Returns whether a row was actually removed. The decision flow deletes
/// exactly once; a second delete of the same interest is a no-op.
pub async fn delete_interest(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
    let result = sqlx::query("DELETE FROM project_interests WHERE id = $1")
        .bind(id)
        .execute(db)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub async fn list_interests(
    db: &PgPool,
    project_id: Option<Uuid>,
    status: Option<String>,
) -> anyhow::Result<Vec<ProjectInterest>> {
    let mut builder = interests_query(project_id, status);
    let rows = builder
        .build_query_as::<ProjectInterest>()
        .fetch_all(db)
        .await?;
    Ok(rows)
}

/// Both filters are optional, so the statement is assembled dynamically.
fn interests_query(
    project_id: Option<Uuid>,
    status: Option<String>,
) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::new(
        "SELECT id, project_id, user_id, status, created_at FROM project_interests WHERE 1 = 1",
    );
    if let Some(project_id) = project_id {
        builder.push(" AND project_id = ").push_bind(project_id);
    }
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    builder.push(" ORDER BY created_at DESC");
    builder
}

pub struct NewProjectMember {
    pub project_id: Uuid,
    pub user_id: Uuid,
    pub user_name: String,
    pub user_email: String,
    pub added_by: String,
}

pub async fn insert_project_member(
    db: &PgPool,
    new: &NewProjectMember,
) -> anyhow::Result<ProjectMember> {
    let member = sqlx::query_as::<_, ProjectMember>(
        "INSERT INTO project_members (project_id, user_id, user_name, user_email, added_by) \
         VALUES ($1, $2, $3, $4, $5) \
         RETURNING id, project_id, user_id, user_name, user_email, role, added_by, joined_at",
    )
    .bind(new.project_id)
    .bind(new.user_id)
    .bind(&new.user_name)
    .bind(&new.user_email)
    .bind(&new.added_by)
    .fetch_one(db)
    .await?;
    Ok(member)
}

pub async fn list_project_members(
    db: &PgPool,
    project_id: Uuid,
) -> anyhow::Result<Vec<ProjectMember>> {
    let rows = sqlx::query_as::<_, ProjectMember>(
        "SELECT id, project_id, user_id, user_name, user_email, role, added_by, joined_at \
         FROM project_members WHERE project_id = $1 ORDER BY joined_at",
    )
    .bind(project_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn count_members(db: &PgPool, project_id: Uuid) -> anyhow::Result<i64> {
    let (count,): (i64,) =
        sqlx::query_as("SELECT COUNT(*) FROM project_members WHERE project_id = $1")
            .bind(project_id)
            .fetch_one(db)
            .await?;
    Ok(count)
}

pub async fn project_ids_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Uuid>> {
    let rows: Vec<(Uuid,)> =
        sqlx::query_as("SELECT project_id FROM project_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(db)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interest_filters_compose() {
        let builder = interests_query(None, None);
        let sql = builder.sql();
        assert!(!sql.contains("AND project_id"));
        assert!(!sql.contains("AND status"));
        assert!(sql.ends_with("ORDER BY created_at DESC"));

        let builder = interests_query(Some(Uuid::new_v4()), None);
        assert!(builder.sql().contains("AND project_id = $1"));

        let builder = interests_query(None, Some("pending".into()));
        assert!(builder.sql().contains("AND status = $1"));

        let builder = interests_query(Some(Uuid::new_v4()), Some("pending".into()));
        let sql = builder.sql();
        assert!(sql.contains("AND project_id = $1"));
        assert!(sql.contains("AND status = $2"));
    }
}
