use sqlx::PgPool;
use tracing::debug;

/// Kinds of decisions recorded in the append-only audit log.
pub const KIND_MEMBER_APPROVAL: &str = "member_approval";
pub const KIND_PROJECT_INTEREST: &str = "project_interest";

/// Append one decision to `admin_decisions`. Audit rows are never updated
/// or deleted; each admin action writes exactly one.
pub async fn record_decision(
    db: &PgPool,
    kind: &str,
    subject_id: &str,
    decision: &str,
    decided_by: &str,
    detail: serde_json::Value,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO admin_decisions (kind, subject_id, decision, decided_by, detail)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(kind)
    .bind(subject_id)
    .bind(decision)
    .bind(decided_by)
    .bind(detail)
    .execute(db)
    .await?;
    debug!(kind, subject_id, decision, decided_by, "admin decision recorded");
    Ok(())
}
