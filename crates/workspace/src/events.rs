use std::sync::Arc;

use async_trait::async_trait;
use munchbot_core::ApplicationError;
use serde::Deserialize;
use thiserror::Error;

use crate::signing::{SigningError, VerificationResponse, VerificationSigner};

pub const EVENT_VERIFICATION: &str = "verification";
pub const EVENT_ANNOTATION_ADDED: &str = "message-annotation-added";
pub const EVENT_MESSAGE_CREATED: &str = "message-created";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WebhookEvent {
    Verification { challenge: String },
    AnnotationAdded(AnnotationEvent),
    MessageCreated(MessageEvent),
    Unsupported { event_type: String },
}

impl WebhookEvent {
    pub fn from_slice(body: &[u8]) -> Result<Self, EventParseError> {
        let raw: RawWebhookEvent = serde_json::from_slice(body)?;
        raw.into_event()
    }

    pub fn event_type(&self) -> &str {
        match self {
            Self::Verification { .. } => EVENT_VERIFICATION,
            Self::AnnotationAdded(_) => EVENT_ANNOTATION_ADDED,
            Self::MessageCreated(_) => EVENT_MESSAGE_CREATED,
            Self::Unsupported { event_type } => event_type,
        }
    }

    pub fn space_id(&self) -> Option<&str> {
        match self {
            Self::AnnotationAdded(event) => Some(&event.space_id),
            Self::MessageCreated(event) => Some(&event.space_id),
            Self::Verification { .. } | Self::Unsupported { .. } => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnnotationEvent {
    pub space_id: String,
    pub user_id: String,
    pub message_id: Option<String>,
    pub annotation_type: String,
    pub annotation_payload: String,
}

impl AnnotationEvent {
    /// Decodes the JSON-encoded payload. `None` when it carries no focus tags.
    pub fn focus(&self) -> Option<FocusAnnotation> {
        serde_json::from_str::<FocusAnnotation>(&self.annotation_payload).ok()
    }
}

/// Cognitive tags the platform attaches to a message (`lens`, `category`).
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct FocusAnnotation {
    #[serde(default)]
    pub lens: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub phrase: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub space_id: String,
    pub user_id: String,
    pub message_id: Option<String>,
    pub content: String,
}

#[derive(Debug, Error)]
pub enum EventParseError {
    #[error("webhook body is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("`{event_type}` event is missing required field `{field}`")]
    MissingField { event_type: String, field: &'static str },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawWebhookEvent {
    #[serde(rename = "type")]
    event_type: String,
    challenge: Option<String>,
    space_id: Option<String>,
    user_id: Option<String>,
    message_id: Option<String>,
    content: Option<String>,
    annotation_type: Option<String>,
    annotation_payload: Option<String>,
}

impl RawWebhookEvent {
    fn into_event(self) -> Result<WebhookEvent, EventParseError> {
        let event_type = self.event_type.clone();
        let missing =
            |field: &'static str| EventParseError::MissingField { event_type: event_type.clone(), field };

        match event_type.as_str() {
            EVENT_VERIFICATION => Ok(WebhookEvent::Verification {
                challenge: self.challenge.ok_or_else(|| missing("challenge"))?,
            }),
            EVENT_ANNOTATION_ADDED => Ok(WebhookEvent::AnnotationAdded(AnnotationEvent {
                space_id: self.space_id.ok_or_else(|| missing("spaceId"))?,
                user_id: self.user_id.ok_or_else(|| missing("userId"))?,
                message_id: self.message_id,
                annotation_type: self.annotation_type.unwrap_or_default(),
                annotation_payload: self
                    .annotation_payload
                    .ok_or_else(|| missing("annotationPayload"))?,
            })),
            EVENT_MESSAGE_CREATED => Ok(WebhookEvent::MessageCreated(MessageEvent {
                space_id: self.space_id.ok_or_else(|| missing("spaceId"))?,
                user_id: self.user_id.ok_or_else(|| missing("userId"))?,
                message_id: self.message_id,
                content: self.content.unwrap_or_default(),
            })),
            _ => Ok(WebhookEvent::Unsupported { event_type: self.event_type }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventContext {
    pub correlation_id: String,
}

impl Default for EventContext {
    fn default() -> Self {
        Self { correlation_id: "unknown-correlation-id".to_owned() }
    }
}

/// What the dialog did with an event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConversationOutcome {
    Ignored,
    Prompted,
    Cancelled,
    Searched { result_count: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HandlerResult {
    Verified(VerificationResponse),
    Conversation(ConversationOutcome),
    Ignored,
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Signing(#[from] SigningError),
    #[error(transparent)]
    Handler(#[from] ApplicationError),
}

#[async_trait]
pub trait ConversationService: Send + Sync {
    async fn handle_annotation(
        &self,
        event: &AnnotationEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ApplicationError>;

    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ApplicationError>;
}

pub struct EventDispatcher {
    service: Arc<dyn ConversationService>,
    signer: VerificationSigner,
}

impl EventDispatcher {
    pub fn new(service: Arc<dyn ConversationService>, signer: VerificationSigner) -> Self {
        Self { service, signer }
    }

    pub fn verify(&self, challenge: &str) -> Result<VerificationResponse, SigningError> {
        self.signer.verification_response(challenge)
    }

    pub async fn dispatch(
        &self,
        event: &WebhookEvent,
        ctx: &EventContext,
    ) -> Result<HandlerResult, DispatchError> {
        match event {
            WebhookEvent::Verification { challenge } => {
                Ok(HandlerResult::Verified(self.verify(challenge)?))
            }
            WebhookEvent::AnnotationAdded(annotation) => {
                let outcome = self.service.handle_annotation(annotation, ctx).await?;
                Ok(HandlerResult::Conversation(outcome))
            }
            WebhookEvent::MessageCreated(message) => {
                let outcome = self.service.handle_message(message, ctx).await?;
                Ok(HandlerResult::Conversation(outcome))
            }
            WebhookEvent::Unsupported { .. } => Ok(HandlerResult::Ignored),
        }
    }
}
