use std::sync::Arc;

use axum::Router;
use munchbot_agent::{ConversationController, ReplyClassifier};
use munchbot_core::config::{AppConfig, ConfigError, LoadOptions};
use munchbot_core::{ConversationStore, InMemoryConversationStore};
use munchbot_search::{RestaurantSearch, SearchClientConfig, YelpClient};
use munchbot_workspace::{
    EventDispatcher, Messenger, VerificationSigner, WorkspaceClient, WorkspaceClientConfig,
};
use thiserror::Error;
use tracing::info;

use crate::{health, webhook};

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn ConversationStore>,
    pub dispatcher: Arc<EventDispatcher>,
}

impl Application {
    pub fn router(&self) -> Router {
        webhook::router(self.dispatcher.clone()).merge(health::router(self.store.clone()))
    }
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("reply classifier pattern failed to compile: {0}")]
    ReplyClassifier(String),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let search = Arc::new(YelpClient::new(SearchClientConfig::from(&config.search)));
    let messenger = Arc::new(WorkspaceClient::new(WorkspaceClientConfig::from(&config.workspace)));
    bootstrap_with_clients(config, search, messenger)
}

/// Wires the dialog against the given outbound clients; the store is always in-memory.
pub fn bootstrap_with_clients(
    config: AppConfig,
    search: Arc<dyn RestaurantSearch>,
    messenger: Arc<dyn Messenger>,
) -> Result<Application, BootstrapError> {
    let classifier =
        ReplyClassifier::new().map_err(|error| BootstrapError::ReplyClassifier(error.to_string()))?;
    let store: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new());

    let controller = ConversationController::new(
        store.clone(),
        search,
        messenger,
        config.workspace.app_id.clone(),
        classifier,
    );
    let signer = VerificationSigner::new(config.workspace.webhook_secret.clone());
    let dispatcher = Arc::new(EventDispatcher::new(Arc::new(controller), signer));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        bot_user_id = %config.workspace.app_id,
        search_base_url = %config.search.api_base_url,
        workspace_base_url = %config.workspace.api_base_url,
        "application components wired"
    );

    Ok(Application { config, store, dispatcher })
}
