use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::domain::conversation::{ConversationId, ConversationState};

/// Keyed store of in-flight dialogs. At most one entry per conversation id.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn get(&self, id: &ConversationId) -> Option<ConversationState>;
    async fn put(&self, state: ConversationState);
    async fn remove(&self, id: &ConversationId) -> Option<ConversationState>;
    async fn len(&self) -> usize;
    /// Removes entries last touched before `cutoff` and returns how many were dropped.
    async fn purge_idle_since(&self, cutoff: DateTime<Utc>) -> usize;
}

#[derive(Default)]
pub struct InMemoryConversationStore {
    conversations: RwLock<HashMap<String, ConversationState>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn get(&self, id: &ConversationId) -> Option<ConversationState> {
        let conversations = self.conversations.read().await;
        conversations.get(&id.0).cloned()
    }

    async fn put(&self, state: ConversationState) {
        let mut conversations = self.conversations.write().await;
        conversations.insert(state.id.0.clone(), state);
    }

    async fn remove(&self, id: &ConversationId) -> Option<ConversationState> {
        let mut conversations = self.conversations.write().await;
        conversations.remove(&id.0)
    }

    async fn len(&self) -> usize {
        self.conversations.read().await.len()
    }

    async fn purge_idle_since(&self, cutoff: DateTime<Utc>) -> usize {
        let mut conversations = self.conversations.write().await;
        let before = conversations.len();
        conversations.retain(|_, state| state.updated_at >= cutoff);
        before - conversations.len()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ConversationStore, InMemoryConversationStore};
    use crate::domain::conversation::{ConversationId, ConversationStage, ConversationState};

    #[tokio::test]
    async fn in_memory_store_round_trip() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::from("space-1");

        assert!(store.get(&id).await.is_none());
        store.put(ConversationState::started(id.clone(), Utc::now())).await;

        let found = store.get(&id).await.expect("conversation should exist");
        assert_eq!(found.stage, ConversationStage::AwaitingConfirmation);
        assert_eq!(store.len().await, 1);

        let removed = store.remove(&id).await.expect("conversation should be removed");
        assert_eq!(removed.id, id);
        assert!(store.get(&id).await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn put_replaces_existing_entry_for_same_id() {
        let store = InMemoryConversationStore::new();
        let id = ConversationId::from("space-1");
        let mut state = ConversationState::started(id.clone(), Utc::now());
        store.put(state.clone()).await;

        state.advance(ConversationStage::AwaitingZip, Utc::now());
        store.put(state).await;

        assert_eq!(store.len().await, 1);
        let found = store.get(&id).await.expect("conversation should exist");
        assert_eq!(found.stage, ConversationStage::AwaitingZip);
    }

    #[tokio::test]
    async fn separate_instances_do_not_share_state() {
        let first = InMemoryConversationStore::new();
        let second = InMemoryConversationStore::new();
        first.put(ConversationState::started(ConversationId::from("space-1"), Utc::now())).await;

        assert_eq!(first.len().await, 1);
        assert_eq!(second.len().await, 0);
    }

    #[tokio::test]
    async fn purge_drops_only_entries_idle_before_cutoff() {
        let store = InMemoryConversationStore::new();
        let now = Utc::now();
        store
            .put(ConversationState::started(
                ConversationId::from("stale"),
                now - Duration::minutes(45),
            ))
            .await;
        store.put(ConversationState::started(ConversationId::from("fresh"), now)).await;

        let purged = store.purge_idle_since(now - Duration::minutes(30)).await;

        assert_eq!(purged, 1);
        assert!(store.get(&ConversationId::from("stale")).await.is_none());
        assert!(store.get(&ConversationId::from("fresh")).await.is_some());
    }
}
