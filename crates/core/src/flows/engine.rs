use thiserror::Error;

use crate::flows::states::{FlowAction, FlowContext, FlowEvent, FlowState, TransitionOutcome};

/// Restaurant search dialog: confirm, collect a zip, search.
#[derive(Clone, Debug, Default)]
pub struct FlowEngine;

impl FlowEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn initial_state(&self) -> FlowState {
        FlowState::Idle
    }

    pub fn apply(
        &self,
        current: &FlowState,
        event: &FlowEvent,
        context: &FlowContext,
    ) -> Result<TransitionOutcome, FlowTransitionError> {
        transition_restaurant_search(current, event, context)
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum FlowTransitionError {
    #[error("invalid transition from {state:?} using event {event:?}")]
    InvalidTransition { state: FlowState, event: FlowEvent },
}

fn transition_restaurant_search(
    current: &FlowState,
    event: &FlowEvent,
    context: &FlowContext,
) -> Result<TransitionOutcome, FlowTransitionError> {
    use FlowAction::{
        ClearConversation, PromptConfirmation, PromptZip, SearchRestaurants, SendCancellation,
        SendResults, StoreZip,
    };
    use FlowEvent::{IntentDetected, ReplyAffirmed, ReplyDeclined, SearchFinished, ZipProvided};
    use FlowState::{AwaitingConfirmation, AwaitingZip, Idle, Searching};

    let (to, actions) = match (current, event) {
        (Idle, IntentDetected) => (AwaitingConfirmation, vec![PromptConfirmation]),
        (AwaitingConfirmation, ReplyAffirmed) if context.zip_known => {
            (Searching, vec![SearchRestaurants])
        }
        (AwaitingConfirmation, ReplyAffirmed) => (AwaitingZip, vec![PromptZip]),
        (AwaitingConfirmation, ReplyDeclined) => (Idle, vec![ClearConversation, SendCancellation]),
        (AwaitingZip, ZipProvided) => (Searching, vec![StoreZip, SearchRestaurants]),
        (Searching, SearchFinished) => (Idle, vec![SendResults, ClearConversation]),
        _ => {
            return Err(FlowTransitionError::InvalidTransition {
                state: *current,
                event: event.clone(),
            });
        }
    };

    Ok(TransitionOutcome { from: *current, to, event: event.clone(), actions })
}
