use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

use super::dto::StatAction;

/// Points handed out by the gamification actions.
pub const JOIN_PROJECT_POINTS: i32 = 10;
pub const COMPLETE_PROJECT_POINTS: i32 = 50;
pub const ATTEND_EVENT_POINTS: i32 = 25;

const MEMBER_COLUMNS: &str = "id, name, email, phone, github, portfolio, interests, experience, \
     goals, role, availability, points, badges, projects_completed, avatar, username, \
     password_hash, approved_by, credentials_updated_at, joined_at, updated_at";

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Member {
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
    pub points: i32,
    pub badges: i32,
    pub projects_completed: i32,
    pub avatar: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub approved_by: String,
    pub credentials_updated_at: Option<OffsetDateTime>,
    pub joined_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// Everything needed to create a member row on approval.
#[derive(Debug, Clone)]
pub struct NewMember {
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
    pub avatar: String,
    pub username: String,
    pub password_hash: String,
    pub approved_by: String,
}

pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(db)
    .await?;
    Ok(member)
}

pub async fn find_by_username(db: &PgPool, username: &str) -> anyhow::Result<Option<Member>> {
    let member = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(db)
    .await?;
    Ok(member)
}

pub async fn insert(db: &PgPool, new: &NewMember) -> anyhow::Result<Member> {
    let member = sqlx::query_as::<_, Member>(&format!(
        r#"
        INSERT INTO members
            (id, name, email, phone, github, portfolio, interests, experience, goals,
             role, availability, avatar, username, password_hash, approved_by,
             credentials_updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, now())
        RETURNING {MEMBER_COLUMNS}
        "#
    ))
    .bind(new.id)
    .bind(&new.name)
    .bind(&new.email)
    .bind(&new.phone)
    .bind(&new.github)
    .bind(&new.portfolio)
    .bind(&new.interests)
    .bind(&new.experience)
    .bind(&new.goals)
    .bind(&new.role)
    .bind(&new.availability)
    .bind(&new.avatar)
    .bind(&new.username)
    .bind(&new.password_hash)
    .bind(&new.approved_by)
    .fetch_one(db)
    .await?;
    Ok(member)
}

pub async fn leaderboard(db: &PgPool, limit: i64) -> anyhow::Result<Vec<Member>> {
    let rows = sqlx::query_as::<_, Member>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM members ORDER BY points DESC LIMIT $1"
    ))
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// Apply a gamification action as a single atomic UPDATE; a read-modify-write
/// here would lose updates when two awards race. Returns the new counters,
/// or `None` when the member does not exist.
pub async fn apply_stat_action(
    db: &PgPool,
    user_id: Uuid,
    action: StatAction,
    value: Option<i32>,
) -> anyhow::Result<Option<(i32, i32, i32)>> {
    let (set_clause, binds_value) = stat_set_clause(action);
    let sql = format!(
        "UPDATE members SET {set_clause}, updated_at = now() WHERE id = $1 \
         RETURNING points, badges, projects_completed"
    );

    let mut query = sqlx::query_as::<_, (i32, i32, i32)>(&sql).bind(user_id);
    if binds_value {
        query = query.bind(value.unwrap_or(0));
    }
    let row = query.fetch_optional(db).await?;
    Ok(row)
}

/// SET clause for each action and whether it consumes the caller's value.
fn stat_set_clause(action: StatAction) -> (String, bool) {
    match action {
        StatAction::AddPoints => ("points = points + $2".into(), true),
        StatAction::SetPoints => ("points = $2".into(), true),
        StatAction::SetBadges => ("badges = $2".into(), true),
        StatAction::AddBadge => ("badges = badges + 1".into(), false),
        StatAction::JoinProject => (format!("points = points + {JOIN_PROJECT_POINTS}"), false),
        StatAction::AttendEvent => (format!("points = points + {ATTEND_EVENT_POINTS}"), false),
        StatAction::CompleteProject => (
            format!(
                "projects_completed = projects_completed + 1, \
                 points = points + {COMPLETE_PROJECT_POINTS}"
            ),
            false,
        ),
    }
}

/// Award the fixed project-join bonus; used by the interest-approval flow.
pub async fn award_join_points(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query(&format!(
        "UPDATE members SET points = points + {JOIN_PROJECT_POINTS}, updated_at = now() \
         WHERE id = $1"
    ))
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// 1-based rank by points. Ties share the better rank, matching the public
/// leaderboard ordering closely enough for a single profile lookup.
pub async fn rank_of(db: &PgPool, user_id: Uuid) -> anyhow::Result<i64> {
    let (rank,): (i64,) = sqlx::query_as(
        "SELECT 1 + COUNT(*) FROM members m \
         JOIN members me ON me.id = $1 WHERE m.points > me.points",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;
    Ok(rank)
}

pub async fn update_credentials(
    db: &PgPool,
    member_id: Uuid,
    username: &str,
    password_hash: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        UPDATE members
        SET username = $2, password_hash = $3, credentials_updated_at = now(),
            updated_at = now()
        WHERE id = $1
        "#,
    )
    .bind(member_id)
    .bind(username)
    .bind(password_hash)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increments_are_expressed_in_sql_not_read_modify_write() {
        let (clause, _) = stat_set_clause(StatAction::AddPoints);
        assert_eq!(clause, "points = points + $2");
        let (clause, _) = stat_set_clause(StatAction::JoinProject);
        assert_eq!(clause, "points = points + 10");
        let (clause, _) = stat_set_clause(StatAction::AttendEvent);
        assert_eq!(clause, "points = points + 25");
        let (clause, _) = stat_set_clause(StatAction::CompleteProject);
        assert!(clause.contains("projects_completed + 1"));
        assert!(clause.contains("points + 50"));
    }

    #[test]
    fn only_explicit_set_actions_overwrite_counters() {
        for action in [StatAction::SetPoints, StatAction::SetBadges, StatAction::AddPoints] {
            let (_, binds_value) = stat_set_clause(action);
            assert!(binds_value, "{action:?} consumes the request value");
        }
        for action in [
            StatAction::AddBadge,
            StatAction::JoinProject,
            StatAction::AttendEvent,
            StatAction::CompleteProject,
        ] {
            let (clause, binds_value) = stat_set_clause(action);
            assert!(!binds_value);
            assert!(!clause.contains("points = $2"), "{action:?} must not overwrite points");
        }
    }
}
