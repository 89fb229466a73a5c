//! Workspace Integration - webhook bot interface
//!
//! This crate provides the messaging-platform side of munchbot:
//! - **Events** (`events`) - inbound webhook payloads and the event dispatcher
//! - **Signing** (`signing`) - `X-OUTBOUND-TOKEN` HMAC for endpoint verification
//! - **Messages** (`messages`) - dialog prompts, result rendering, `appMessage` envelope
//! - **Client** (`client`) - OAuth + message posting into a space
//!
//! # Getting Started
//!
//! 1. Register an app and note its app id and app secret
//! 2. Add a webhook pointing at `POST /webhook` subscribed to `message-created`
//!    and `message-annotation-added`; keep the webhook secret
//! 3. Set env vars: `APP_ID`, `APP_SECRET`, `WEBHOOK_SECRET`
//!
//! # Architecture
//!
//! ```text
//! Webhook POST → WebhookEvent → EventDispatcher → ConversationService → Messenger
//!                     ↓
//!           verification → VerificationSigner → X-OUTBOUND-TOKEN
//! ```

pub mod client;
pub mod events;
pub mod messages;
pub mod signing;

pub use client::{Messenger, MessengerError, WorkspaceClient, WorkspaceClientConfig};
pub use events::{
    AnnotationEvent, ConversationOutcome, ConversationService, DispatchError, EventContext,
    EventDispatcher, EventParseError, FocusAnnotation, HandlerResult, MessageEvent, WebhookEvent,
};
pub use signing::{SigningError, VerificationResponse, VerificationSigner, OUTBOUND_TOKEN_HEADER};
