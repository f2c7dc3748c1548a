use tracing::warn;

use super::repo::{self, NewProjectMember, ProjectInterest, ProjectMember};
use crate::members::repo as members_repo;
use crate::state::AppState;

/// Turn an approved interest into a project membership. The join bonus is
/// best effort: a membership without points is recoverable, points without
/// a membership is not, so the member row is written first.
pub async fn approve_interest(
    state: &AppState,
    interest: &ProjectInterest,
    added_by: &str,
) -> anyhow::Result<ProjectMember> {
    let (user_name, user_email) = match members_repo::find_by_id(&state.db, interest.user_id).await?
    {
        Some(member) => (member.name, member.email),
        None => (String::new(), String::new()),
    };

    let member = repo::insert_project_member(
        &state.db,
        &NewProjectMember {
            project_id: interest.project_id,
            user_id: interest.user_id,
            user_name,
            user_email,
            added_by: added_by.to_string(),
        },
    )
    .await?;

    if let Err(e) = members_repo::award_join_points(&state.db, interest.user_id).await {
        warn!(user_id = %interest.user_id, error = %e, "join bonus award failed");
    }

    Ok(member)
}
