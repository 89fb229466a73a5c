pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod store;

pub use domain::business::{Business, Category, Location, SearchResults};
pub use domain::conversation::{ConversationId, ConversationStage, ConversationState};
pub use errors::{ApplicationError, DomainError};
pub use flows::{FlowAction, FlowContext, FlowEngine, FlowEvent, FlowState, FlowTransitionError};
pub use store::{ConversationStore, InMemoryConversationStore};
