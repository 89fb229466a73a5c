use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use munchbot_core::ConversationStore;
use tokio::task::JoinHandle;
use tracing::info;

const MAX_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Drops dialogs that have not seen a reply for `idle_timeout`.
pub async fn sweep_once(
    store: &dyn ConversationStore,
    idle_timeout: Duration,
    now: DateTime<Utc>,
) -> usize {
    let idle = chrono::Duration::from_std(idle_timeout).unwrap_or(chrono::Duration::MAX);
    let cutoff = now.checked_sub_signed(idle).unwrap_or(DateTime::<Utc>::MIN_UTC);
    store.purge_idle_since(cutoff).await
}

pub fn sweep_period(idle_timeout: Duration) -> Duration {
    (idle_timeout / 2).clamp(Duration::from_secs(1), MAX_SWEEP_PERIOD)
}

pub fn spawn(store: Arc<dyn ConversationStore>, idle_timeout: Duration) -> JoinHandle<()> {
    let period = sweep_period(idle_timeout);
    info!(
        event_name = "system.sweeper.start",
        correlation_id = "bootstrap",
        idle_timeout_secs = idle_timeout.as_secs(),
        period_secs = period.as_secs(),
        "idle conversation sweeper started"
    );

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            let purged = sweep_once(store.as_ref(), idle_timeout, Utc::now()).await;
            if purged > 0 {
                info!(
                    event_name = "conversation.sweeper.purged",
                    correlation_id = "sweeper",
                    purged,
                    "idle conversations dropped"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chrono::Utc;
    use munchbot_core::{
        ConversationId, ConversationState, ConversationStore, InMemoryConversationStore,
    };

    use super::{sweep_once, sweep_period};

    #[tokio::test]
    async fn sweep_drops_only_stale_conversations() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        store
            .put(ConversationState::started(
                ConversationId::from("stale"),
                now - chrono::Duration::minutes(30),
            ))
            .await;
        store.put(ConversationState::started(ConversationId::from("fresh"), now)).await;

        let purged = sweep_once(&store, Duration::from_secs(600), now).await;

        assert_eq!(purged, 1);
        assert!(store.get(&ConversationId::from("stale")).await.is_none());
        assert!(store.get(&ConversationId::from("fresh")).await.is_some());
    }

    #[test]
    fn sweep_period_is_bounded() {
        assert_eq!(sweep_period(Duration::from_secs(1)), Duration::from_secs(1));
        assert_eq!(sweep_period(Duration::from_secs(60)), Duration::from_secs(30));
        assert_eq!(sweep_period(Duration::from_secs(3600)), Duration::from_secs(60));
    }
}
