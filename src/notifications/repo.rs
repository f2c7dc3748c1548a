use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use tracing::warn;
use uuid::Uuid;

use super::dto::PushPayload;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PushSubscription {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
    pub user_id: Option<Uuid>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ScheduledNotification {
    pub id: Uuid,
    pub payload: String,
    pub audience: String,
    pub send_at: OffsetDateTime,
    pub status: String,
    pub sent_at: Option<OffsetDateTime>,
    pub error: Option<String>,
    pub results: Option<serde_json::Value>,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub body: String,
    pub icon: String,
    pub url: String,
    pub tag: Option<String>,
    pub source: String,
    pub read: bool,
    pub created_at: OffsetDateTime,
}

/// Upsert keyed by endpoint: re-subscribing the same browser refreshes the
/// keys and owner instead of growing a duplicate row.
pub async fn upsert_subscription(
    db: &PgPool,
    endpoint: &str,
    p256dh: &str,
    auth: &str,
    user_id: Option<Uuid>,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO push_subscriptions (endpoint, p256dh, auth, user_id)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (endpoint) DO UPDATE
        SET p256dh = EXCLUDED.p256dh,
            auth = EXCLUDED.auth,
            user_id = COALESCE(EXCLUDED.user_id, push_subscriptions.user_id)
        "#,
    )
    .bind(endpoint)
    .bind(p256dh)
    .bind(auth)
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn delete_subscription(db: &PgPool, endpoint: &str) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM push_subscriptions WHERE endpoint = $1")
        .bind(endpoint)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn list_subscriptions(db: &PgPool) -> anyhow::Result<Vec<PushSubscription>> {
    let rows = sqlx::query_as::<_, PushSubscription>(
        "SELECT endpoint, p256dh, auth, user_id, created_at FROM push_subscriptions",
    )
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn list_subscriptions_for_user(
    db: &PgPool,
    user_id: Uuid,
) -> anyhow::Result<Vec<PushSubscription>> {
    let rows = sqlx::query_as::<_, PushSubscription>(
        "SELECT endpoint, p256dh, auth, user_id, created_at FROM push_subscriptions \
         WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

/// One in-app notification-center row per user per broadcast.
pub async fn insert_notification(
    db: &PgPool,
    user_id: Uuid,
    payload: &PushPayload,
    source: &str,
) -> anyhow::Result<()> {
    sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, body, icon, url, tag, source)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(user_id)
    .bind(&payload.title)
    .bind(&payload.body)
    .bind(&payload.icon)
    .bind(payload.click_url())
    .bind(&payload.tag)
    .bind(source)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn list_notifications(
    db: &PgPool,
    user_id: Uuid,
    limit: i64,
) -> anyhow::Result<Vec<Notification>> {
    let rows = sqlx::query_as::<_, Notification>(
        r#"
        SELECT id, user_id, title, body, icon, url, tag, source, read, created_at
        FROM notifications
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
        "#,
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await?;
    Ok(rows)
}

pub async fn insert_schedule(
    db: &PgPool,
    payload: &str,
    audience: &str,
    send_at: OffsetDateTime,
) -> anyhow::Result<Uuid> {
    let id: (Uuid,) = sqlx::query_as(
        r#"
        INSERT INTO scheduled_notifications (payload, audience, send_at)
        VALUES ($1, $2, $3)
        RETURNING id
        "#,
    )
    .bind(payload)
    .bind(audience)
    .bind(send_at)
    .fetch_one(db)
    .await?;
    Ok(id.0)
}

const SCHEDULE_COLUMNS: &str =
    "id, payload, audience, send_at, status, sent_at, error, results, created_at";

/// Pending schedules whose due time has passed. The combined status+due
/// filter is the primary lookup; if the store cannot serve it, fall back to
/// fetching all pending rows and filtering in memory. The fallback is a
/// correctness requirement, not an optimization: a due entry must never be
/// skipped because of a missing index.
pub async fn due_schedules(
    db: &PgPool,
    now: OffsetDateTime,
) -> anyhow::Result<Vec<ScheduledNotification>> {
    let combined = sqlx::query_as::<_, ScheduledNotification>(&format!(
        "SELECT {SCHEDULE_COLUMNS} FROM scheduled_notifications \
         WHERE status = 'pending' AND send_at <= $1"
    ))
    .bind(now)
    .fetch_all(db)
    .await;

    match combined {
        Ok(rows) => Ok(rows),
        Err(e) => {
            warn!(error = %e, "combined due-schedule query failed, filtering in memory");
            let all_pending = sqlx::query_as::<_, ScheduledNotification>(&format!(
                "SELECT {SCHEDULE_COLUMNS} FROM scheduled_notifications WHERE status = 'pending'"
            ))
            .fetch_all(db)
            .await?;
            Ok(filter_due(all_pending, now))
        }
    }
}

pub(crate) fn filter_due(
    rows: Vec<ScheduledNotification>,
    now: OffsetDateTime,
) -> Vec<ScheduledNotification> {
    rows.into_iter().filter(|s| s.send_at <= now).collect()
}

pub async fn mark_sent(
    db: &PgPool,
    id: Uuid,
    results: serde_json::Value,
    sent_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE scheduled_notifications SET status = 'sent', sent_at = $2, results = $3 \
         WHERE id = $1",
    )
    .bind(id)
    .bind(sent_at)
    .bind(results)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn mark_failed(db: &PgPool, id: Uuid, error: &str) -> anyhow::Result<()> {
    sqlx::query(
        "UPDATE scheduled_notifications SET status = 'failed', error = $2, sent_at = now() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(error)
    .execute(db)
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::Duration;

    fn schedule(send_at: OffsetDateTime) -> ScheduledNotification {
        ScheduledNotification {
            id: Uuid::new_v4(),
            payload: "{}".into(),
            audience: "subscribed".into(),
            send_at,
            status: "pending".into(),
            sent_at: None,
            error: None,
            results: None,
            created_at: send_at,
        }
    }

    #[test]
    fn in_memory_filter_keeps_only_due_entries() {
        let now = OffsetDateTime::now_utc();
        let past = schedule(now - Duration::minutes(5));
        let exactly_now = schedule(now);
        let future = schedule(now + Duration::minutes(5));
        let past_id = past.id;
        let now_id = exactly_now.id;

        let due = filter_due(vec![past, exactly_now, future], now);
        let ids: Vec<Uuid> = due.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![past_id, now_id]);
    }
}
