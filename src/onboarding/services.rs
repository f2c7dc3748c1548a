use tracing::{error, info, warn};
use uuid::Uuid;

use super::repo::PendingMember;
use crate::auth::services::{avatar_url, derive_username, generate_password, hash_password};
use crate::email::credentials_email;
use crate::members::repo::{self as members_repo, Member, NewMember};
use crate::state::AppState;

pub const GENERATED_PASSWORD_LEN: usize = 12;

#[derive(Debug, Clone)]
pub struct IssuedCredentials {
    pub username: String,
    pub password: String,
}

pub fn issue_credentials(name: &str) -> IssuedCredentials {
    IssuedCredentials {
        username: derive_username(name),
        password: generate_password(GENERATED_PASSWORD_LEN),
    }
}

pub struct ApprovalOutcome {
    pub member: Member,
    pub email_sent: bool,
}

/// Turn a pending member into a full member: fresh id, derived username,
/// generated password (argon2-hashed at rest), welcome email with the
/// plaintext credentials. The email is best-effort; a bounce never rolls
/// back the approval.
pub async fn approve(
    state: &AppState,
    pending: &PendingMember,
    admin_id: &str,
) -> anyhow::Result<ApprovalOutcome> {
    let credentials = issue_credentials(&pending.name);
    let password_hash = hash_password(&credentials.password)?;

    let new = NewMember {
        id: Uuid::new_v4(),
        name: pending.name.clone(),
        email: pending.email.clone(),
        phone: pending.phone.clone(),
        github: pending.github.clone(),
        portfolio: pending.portfolio.clone(),
        interests: pending.interests.clone(),
        experience: pending.experience.clone(),
        goals: pending.goals.clone(),
        role: pending.role.clone(),
        availability: pending.availability.clone(),
        avatar: avatar_url(&pending.email),
        username: credentials.username.clone(),
        password_hash,
        approved_by: admin_id.to_string(),
    };
    let member = members_repo::insert(&state.db, &new).await?;
    info!(member_id = %member.id, username = %member.username, "member approved");

    let mut email_sent = false;
    if pending.email.is_empty() {
        warn!(member_id = %member.id, "no email address on record, skipping welcome email");
    } else {
        let (subject, body) =
            credentials_email(&pending.name, &credentials.username, &credentials.password);
        match state.mailer.send(&pending.email, &subject, &body).await {
            Ok(()) => {
                email_sent = true;
                info!(to = %pending.email, "welcome email sent");
            }
            Err(e) => {
                error!(to = %pending.email, error = %e, "welcome email failed");
            }
        }
    }

    Ok(ApprovalOutcome { member, email_sent })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_credentials_follow_the_policy() {
        let creds = issue_credentials("Asha Rao");
        assert_eq!(creds.username, "asharao");
        assert_eq!(creds.password.len(), GENERATED_PASSWORD_LEN);
        assert!(creds.password.bytes().any(|b| b.is_ascii_lowercase()));
        assert!(creds.password.bytes().any(|b| b.is_ascii_uppercase()));
        assert!(creds.password.bytes().any(|b| b.is_ascii_digit()));
        assert!(creds.password.bytes().any(|b| b"!@#$%^&*".contains(&b)));
    }

    #[test]
    fn issued_usernames_never_empty() {
        assert_eq!(issue_credentials("!!!").username, "member");
    }
}
