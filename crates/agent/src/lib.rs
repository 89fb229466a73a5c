//! Conversation Agent - restaurant search dialog
//!
//! This crate turns workspace events into dialog steps:
//! - Detects restaurant requests from focus annotations (`intent`)
//! - Classifies confirmation replies (`intent::ReplyClassifier`)
//! - Applies `FlowEngine` transitions against the store, search and messenger (`conversation`)
//!
//! # Flow
//!
//! ```text
//! Idle → AwaitingConfirmation → AwaitingZip → Searching → Idle
//!              ↓ (decline)
//!             Idle
//! ```
//!
//! The controller never decides what a transition does; `munchbot_core::flows`
//! does. It only performs the resulting actions in order.

pub mod conversation;
pub mod intent;

pub use conversation::{ConversationController, ConversationError};
pub use intent::{is_restaurant_request, Reply, ReplyClassifier};
