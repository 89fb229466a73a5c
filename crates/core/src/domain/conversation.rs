use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::flows::states::FlowState;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConversationId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Stage of a dialog that has an entry in the store. `Idle` is the absence of an entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationStage {
    AwaitingConfirmation,
    AwaitingZip,
}

impl ConversationStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AwaitingConfirmation => "awaiting_confirmation",
            Self::AwaitingZip => "awaiting_zip",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub id: ConversationId,
    pub stage: ConversationStage,
    pub zip: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ConversationState {
    pub fn started(id: ConversationId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            stage: ConversationStage::AwaitingConfirmation,
            zip: None,
            started_at: now,
            updated_at: now,
        }
    }

    pub fn flow_state(&self) -> FlowState {
        match self.stage {
            ConversationStage::AwaitingConfirmation => FlowState::AwaitingConfirmation,
            ConversationStage::AwaitingZip => FlowState::AwaitingZip,
        }
    }

    pub fn has_zip(&self) -> bool {
        self.zip.as_deref().is_some_and(|zip| !zip.is_empty())
    }

    pub fn advance(&mut self, stage: ConversationStage, now: DateTime<Utc>) {
        self.stage = stage;
        self.updated_at = now;
    }

    pub fn record_zip(&mut self, zip: impl Into<String>, now: DateTime<Utc>) {
        self.zip = Some(zip.into());
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::{ConversationId, ConversationStage, ConversationState};
    use crate::flows::states::FlowState;

    #[test]
    fn started_conversation_awaits_confirmation_without_zip() {
        let now = Utc::now();
        let state = ConversationState::started(ConversationId::from("space-1"), now);

        assert_eq!(state.stage, ConversationStage::AwaitingConfirmation);
        assert_eq!(state.flow_state(), FlowState::AwaitingConfirmation);
        assert!(!state.has_zip());
        assert_eq!(state.started_at, state.updated_at);
    }

    #[test]
    fn recording_zip_touches_updated_at() {
        let start = Utc::now();
        let mut state = ConversationState::started(ConversationId::from("space-1"), start);
        let later = start + Duration::seconds(30);

        state.advance(ConversationStage::AwaitingZip, later);
        state.record_zip("10001", later);

        assert_eq!(state.zip.as_deref(), Some("10001"));
        assert_eq!(state.flow_state(), FlowState::AwaitingZip);
        assert_eq!(state.updated_at, later);
        assert_eq!(state.started_at, start);
    }

    #[test]
    fn empty_zip_is_not_considered_captured() {
        let mut state = ConversationState::started(ConversationId::from("space-2"), Utc::now());
        state.zip = Some(String::new());

        assert!(!state.has_zip());
    }
}
