use std::collections::BTreeSet;

use tracing::{debug, warn};
use uuid::Uuid;

use super::dto::{DeliveryResult, PushPayload};
use super::repo::{self, PushSubscription};
use crate::push::{PushClient, PushError, SubscriptionKeys};
use crate::state::AppState;

/// Outcome of one broadcast: per-endpoint results, endpoints the push
/// provider reported gone, and the distinct users who got at least one
/// successful delivery.
#[derive(Debug)]
pub struct DispatchOutcome {
    pub results: Vec<DeliveryResult>,
    pub gone: Vec<String>,
    pub notified_users: Vec<Uuid>,
}

/// Deliver `payload` to each subscription, concurrently and independently.
/// A dead endpoint (410/404) is marked for removal; any other failure is
/// recorded and the subscription is kept.
pub async fn dispatch(
    push: &dyn PushClient,
    subs: &[PushSubscription],
    payload: &PushPayload,
) -> anyhow::Result<DispatchOutcome> {
    let body = serde_json::to_vec(payload)?;

    let sends = subs.iter().map(|sub| {
        let keys = SubscriptionKeys {
            endpoint: sub.endpoint.clone(),
            p256dh: sub.p256dh.clone(),
            auth: sub.auth.clone(),
        };
        let body = &body;
        async move { (sub, push.deliver(&keys, body).await) }
    });
    let deliveries = futures::future::join_all(sends).await;

    let mut results = Vec::with_capacity(subs.len());
    let mut gone = Vec::new();
    let mut notified_users = BTreeSet::new();
    for (sub, outcome) in deliveries {
        match outcome {
            Ok(()) => {
                if let Some(user_id) = sub.user_id {
                    notified_users.insert(user_id);
                }
                results.push(DeliveryResult {
                    endpoint: sub.endpoint.clone(),
                    success: true,
                    error: None,
                });
            }
            Err(PushError::Gone) => {
                debug!(endpoint = %sub.endpoint, "subscription gone, marking for removal");
                gone.push(sub.endpoint.clone());
                results.push(DeliveryResult {
                    endpoint: sub.endpoint.clone(),
                    success: false,
                    error: Some("gone".into()),
                });
            }
            Err(PushError::Other(e)) => {
                warn!(endpoint = %sub.endpoint, error = %e, "push delivery failed");
                results.push(DeliveryResult {
                    endpoint: sub.endpoint.clone(),
                    success: false,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    Ok(DispatchOutcome {
        results,
        gone,
        notified_users: notified_users.into_iter().collect(),
    })
}

/// Persist the side effects of a broadcast: drop dead subscriptions and
/// write one notification-center row per notified user.
pub async fn persist_outcome(
    state: &AppState,
    outcome: &DispatchOutcome,
    payload: &PushPayload,
    source: &str,
) -> anyhow::Result<()> {
    for endpoint in &outcome.gone {
        if let Err(e) = repo::delete_subscription(&state.db, endpoint).await {
            warn!(%endpoint, error = %e, "failed to remove gone subscription");
        }
    }

    let writes = outcome
        .notified_users
        .iter()
        .map(|user_id| repo::insert_notification(&state.db, *user_id, payload, source));
    for result in futures::future::join_all(writes).await {
        result?;
    }
    Ok(())
}

/// Direct notification to one member: push to their registered devices and
/// always leave an in-app notification-center entry, delivery or not.
pub async fn notify_user(
    state: &AppState,
    user_id: Uuid,
    payload: &PushPayload,
    source: &str,
) -> anyhow::Result<()> {
    let subs = repo::list_subscriptions_for_user(&state.db, user_id).await?;
    if !subs.is_empty() {
        let outcome = dispatch(state.push.as_ref(), &subs, payload).await?;
        for endpoint in &outcome.gone {
            if let Err(e) = repo::delete_subscription(&state.db, endpoint).await {
                warn!(%endpoint, error = %e, "failed to remove gone subscription");
            }
        }
    }
    repo::insert_notification(&state.db, user_id, payload, source).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use time::OffsetDateTime;

    /// Push client scripted by endpoint prefix: "gone-*" reports a dead
    /// endpoint, "flaky-*" a transient failure, anything else succeeds.
    struct ScriptedPush {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl PushClient for ScriptedPush {
        async fn deliver(
            &self,
            sub: &SubscriptionKeys,
            _payload: &[u8],
        ) -> Result<(), PushError> {
            self.delivered.lock().unwrap().push(sub.endpoint.clone());
            if sub.endpoint.starts_with("gone-") {
                Err(PushError::Gone)
            } else if sub.endpoint.starts_with("flaky-") {
                Err(PushError::Other(anyhow::anyhow!("503 from push service")))
            } else {
                Ok(())
            }
        }
    }

    fn sub(endpoint: &str, user_id: Option<Uuid>) -> PushSubscription {
        PushSubscription {
            endpoint: endpoint.into(),
            p256dh: "p256dh-key".into(),
            auth: "auth-secret".into(),
            user_id,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    #[tokio::test]
    async fn only_dead_endpoints_are_marked_for_removal() {
        let push = ScriptedPush {
            delivered: Mutex::new(Vec::new()),
        };
        let subs = vec![
            sub("ok-1", None),
            sub("gone-2", None),
            sub("flaky-3", None),
        ];
        let outcome = dispatch(&push, &subs, &PushPayload::default())
            .await
            .expect("dispatch");

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.gone, vec!["gone-2".to_string()]);
        let flaky = outcome
            .results
            .iter()
            .find(|r| r.endpoint == "flaky-3")
            .unwrap();
        assert!(!flaky.success);
        // transient failure keeps the subscription
        assert!(!outcome.gone.contains(&"flaky-3".to_string()));
    }

    #[tokio::test]
    async fn one_notified_user_per_distinct_successful_recipient() {
        let push = ScriptedPush {
            delivered: Mutex::new(Vec::new()),
        };
        let asha = Uuid::new_v4();
        let ravi = Uuid::new_v4();
        let subs = vec![
            sub("ok-phone", Some(asha)),
            sub("ok-laptop", Some(asha)),
            sub("flaky-tablet", Some(ravi)),
            sub("ok-anon", None),
        ];
        let outcome = dispatch(&push, &subs, &PushPayload::default())
            .await
            .expect("dispatch");

        // Asha succeeded on two devices but counts once; Ravi never succeeded.
        assert_eq!(outcome.notified_users, vec![asha]);
        assert_eq!(push.delivered.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn failures_do_not_abort_the_rest_of_the_fanout() {
        let push = ScriptedPush {
            delivered: Mutex::new(Vec::new()),
        };
        let subs = vec![sub("gone-1", None), sub("ok-2", None), sub("ok-3", None)];
        let outcome = dispatch(&push, &subs, &PushPayload::default())
            .await
            .expect("dispatch");

        assert_eq!(outcome.results.iter().filter(|r| r.success).count(), 2);
        assert_eq!(push.delivered.lock().unwrap().len(), 3);
    }
}
