use time::OffsetDateTime;
use tracing::{error, info, instrument};

use super::dispatch::{dispatch, persist_outcome};
use super::dto::{PushPayload, ScheduleResult};
use super::repo::{self, ScheduledNotification};
use crate::state::AppState;

const SCHEDULE_SOURCE: &str = "webpush-schedule";

pub(crate) fn audience_wants_all_subscribers(audience: &str) -> bool {
    matches!(audience, "subscribed" | "all")
}

/// One processing pass: pick up every due pending schedule and run it.
/// Each entry is settled independently; an entry that errors is marked
/// `failed` and the pass continues. No processed entry is left `pending`.
#[instrument(skip(state))]
pub async fn process_due(state: &AppState) -> anyhow::Result<Vec<ScheduleResult>> {
    let now = OffsetDateTime::now_utc();
    let due = repo::due_schedules(&state.db, now).await?;
    info!(count = due.len(), "processing due schedules");

    let mut results = Vec::with_capacity(due.len());
    for entry in due {
        let id = entry.id;
        match process_entry(state, &entry).await {
            Ok(count) => results.push(ScheduleResult {
                id,
                ok: true,
                count: Some(count),
                error: None,
            }),
            Err(e) => {
                error!(schedule_id = %id, error = %e, "schedule processing failed");
                if let Err(mark_err) = repo::mark_failed(&state.db, id, &e.to_string()).await {
                    error!(schedule_id = %id, error = %mark_err, "failed to mark schedule failed");
                }
                results.push(ScheduleResult {
                    id,
                    ok: false,
                    count: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }
    Ok(results)
}

/// Run a single schedule to completion. Individual delivery failures do not
/// fail the entry; the entry fails only if it errors before finishing (bad
/// payload, storage error).
async fn process_entry(state: &AppState, entry: &ScheduledNotification) -> anyhow::Result<usize> {
    let payload: PushPayload = serde_json::from_str(&entry.payload)?;

    let subs = if audience_wants_all_subscribers(&entry.audience) {
        repo::list_subscriptions(&state.db).await?
    } else {
        Vec::new()
    };

    let outcome = dispatch(state.push.as_ref(), &subs, &payload).await?;
    persist_outcome(state, &outcome, &payload, &payload.source(SCHEDULE_SOURCE)).await?;

    let results = serde_json::to_value(&outcome.results)?;
    repo::mark_sent(&state.db, entry.id, results, OffsetDateTime::now_utc()).await?;
    Ok(outcome.results.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn audience_resolution() {
        assert!(audience_wants_all_subscribers("subscribed"));
        assert!(audience_wants_all_subscribers("all"));
        assert!(!audience_wants_all_subscribers("nobody"));
        assert!(!audience_wants_all_subscribers(""));
    }

    #[test]
    fn stored_payloads_parse_with_defaults() {
        let payload: PushPayload =
            serde_json::from_str(r#"{"title":"Demo night","body":"Friday 6pm"}"#).unwrap();
        assert_eq!(payload.title, "Demo night");
        assert_eq!(payload.icon, "/app-icon-192.png");
    }

    #[test]
    fn malformed_stored_payloads_error() {
        assert!(serde_json::from_str::<PushPayload>("not json at all").is_err());
        assert!(serde_json::from_str::<PushPayload>(r#"{"vibrate":"loud"}"#).is_err());
    }
}
