use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use munchbot_core::{
    ApplicationError, ConversationId, ConversationStage, ConversationState, ConversationStore,
    DomainError, FlowAction, FlowContext, FlowEngine, FlowEvent, FlowState, FlowTransitionError,
    SearchResults,
};
use munchbot_search::{RestaurantSearch, SearchError};
use munchbot_workspace::messages::{
    restaurant_list, CANCELLATION_NOTICE, CONFIRMATION_PROMPT, ZIP_PROMPT,
};
use munchbot_workspace::{
    AnnotationEvent, ConversationOutcome, ConversationService, EventContext, MessageEvent,
    Messenger, MessengerError,
};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::intent::{is_restaurant_request, Reply, ReplyClassifier};

#[derive(Debug, Error)]
pub enum ConversationError {
    #[error(transparent)]
    Flow(#[from] FlowTransitionError),
    #[error(transparent)]
    Search(#[from] SearchError),
    #[error(transparent)]
    Messenger(#[from] MessengerError),
}

impl From<ConversationError> for ApplicationError {
    fn from(error: ConversationError) -> Self {
        match error {
            ConversationError::Flow(error) => Self::Domain(DomainError::FlowTransition(error)),
            ConversationError::Search(error) if error.is_authentication() => {
                Self::Authentication(error.to_string())
            }
            ConversationError::Search(error) => Self::Integration(error.to_string()),
            ConversationError::Messenger(error) => error.into(),
        }
    }
}

/// Drives the restaurant dialog for each space: applies `FlowEngine` transitions
/// against the store, the search provider and the messenger.
pub struct ConversationController {
    store: Arc<dyn ConversationStore>,
    search: Arc<dyn RestaurantSearch>,
    messenger: Arc<dyn Messenger>,
    bot_user_id: String,
    engine: FlowEngine,
    classifier: ReplyClassifier,
}

impl ConversationController {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        search: Arc<dyn RestaurantSearch>,
        messenger: Arc<dyn Messenger>,
        bot_user_id: impl Into<String>,
        classifier: ReplyClassifier,
    ) -> Self {
        Self {
            store,
            search,
            messenger,
            bot_user_id: bot_user_id.into(),
            engine: FlowEngine::new(),
            classifier,
        }
    }

    pub async fn on_annotation(
        &self,
        event: &AnnotationEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ConversationError> {
        if event.user_id == self.bot_user_id || !is_restaurant_request(event) {
            return Ok(ConversationOutcome::Ignored);
        }

        let id = ConversationId::from(event.space_id.as_str());
        if let Some(active) = self.store.get(&id).await {
            debug!(
                event_name = "conversation.intent.ignored",
                correlation_id = %ctx.correlation_id,
                space_id = %id,
                stage = active.stage.as_str(),
                "restaurant intent ignored while a dialog is active"
            );
            return Ok(ConversationOutcome::Ignored);
        }

        let phrase = event.focus().and_then(|focus| focus.phrase).unwrap_or_default();
        info!(
            event_name = "conversation.intent.detected",
            correlation_id = %ctx.correlation_id,
            space_id = %id,
            phrase = phrase.as_str(),
            "restaurant intent detected"
        );
        let state = ConversationState::started(id, Utc::now());
        self.advance(state, self.engine.initial_state(), FlowEvent::IntentDetected, "", ctx).await
    }

    pub async fn on_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ConversationError> {
        if event.user_id == self.bot_user_id {
            return Ok(ConversationOutcome::Ignored);
        }

        let id = ConversationId::from(event.space_id.as_str());
        let Some(state) = self.store.get(&id).await else {
            return Ok(ConversationOutcome::Ignored);
        };

        let current = state.flow_state();
        let flow_event = match current {
            FlowState::AwaitingConfirmation => match self.classifier.classify(&event.content) {
                Reply::Affirmative => FlowEvent::ReplyAffirmed,
                Reply::Other => FlowEvent::ReplyDeclined,
            },
            FlowState::AwaitingZip => FlowEvent::ZipProvided,
            FlowState::Idle | FlowState::Searching => return Ok(ConversationOutcome::Ignored),
        };

        self.advance(state, current, flow_event, &event.content, ctx).await
    }

    async fn advance(
        &self,
        mut state: ConversationState,
        current: FlowState,
        event: FlowEvent,
        content: &str,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ConversationError> {
        let context = FlowContext { zip_known: state.has_zip() };
        let transition = self.engine.apply(&current, &event, &context)?;
        info!(
            event_name = "conversation.transition",
            correlation_id = %ctx.correlation_id,
            space_id = %state.id,
            from = ?transition.from,
            to = ?transition.to,
            flow_event = ?transition.event,
            "conversation transition applied"
        );

        let mut flow = transition.to;
        let mut pending: VecDeque<FlowAction> = transition.actions.into();
        let mut outcome = ConversationOutcome::Ignored;
        let mut found: Option<SearchResults> = None;
        let mut delivery_failure: Option<MessengerError> = None;

        while let Some(action) = pending.pop_front() {
            match action {
                FlowAction::PromptConfirmation => {
                    self.store.put(state.clone()).await;
                    self.deliver(&state.id, CONFIRMATION_PROMPT, &mut delivery_failure, ctx).await;
                    outcome = ConversationOutcome::Prompted;
                }
                FlowAction::PromptZip => {
                    state.advance(ConversationStage::AwaitingZip, Utc::now());
                    self.store.put(state.clone()).await;
                    self.deliver(&state.id, ZIP_PROMPT, &mut delivery_failure, ctx).await;
                    outcome = ConversationOutcome::Prompted;
                }
                FlowAction::StoreZip => {
                    state.record_zip(content, Utc::now());
                    self.store.put(state.clone()).await;
                }
                FlowAction::SearchRestaurants => {
                    let zip = state.zip.clone().unwrap_or_default();
                    let results = match self.search.search(&zip).await {
                        Ok(results) => results,
                        Err(error) => {
                            self.store.remove(&state.id).await;
                            return Err(error.into());
                        }
                    };
                    info!(
                        event_name = "conversation.search.completed",
                        correlation_id = %ctx.correlation_id,
                        space_id = %state.id,
                        result_count = results.len(),
                        "restaurant search completed"
                    );
                    found = Some(results);

                    let finished =
                        self.engine.apply(&flow, &FlowEvent::SearchFinished, &context)?;
                    flow = finished.to;
                    pending.extend(finished.actions);
                }
                FlowAction::SendResults => {
                    let results = found.take().unwrap_or_default();
                    let zip = state.zip.as_deref().unwrap_or_default();
                    self.deliver(
                        &state.id,
                        &restaurant_list(zip, &results),
                        &mut delivery_failure,
                        ctx,
                    )
                    .await;
                    outcome = ConversationOutcome::Searched { result_count: results.len() };
                }
                FlowAction::SendCancellation => {
                    self.deliver(&state.id, CANCELLATION_NOTICE, &mut delivery_failure, ctx).await;
                    outcome = ConversationOutcome::Cancelled;
                }
                FlowAction::ClearConversation => {
                    self.store.remove(&state.id).await;
                }
            }
        }

        match delivery_failure {
            Some(error) => Err(error.into()),
            None => Ok(outcome),
        }
    }

    /// Sends `text`, keeping the first failure so the remaining actions still run.
    async fn deliver(
        &self,
        id: &ConversationId,
        text: &str,
        failure: &mut Option<MessengerError>,
        ctx: &EventContext,
    ) {
        if let Err(error) = self.messenger.send(id.as_str(), text).await {
            warn!(
                event_name = "conversation.send.failed",
                correlation_id = %ctx.correlation_id,
                space_id = %id,
                error = %error,
                "failed to post message to space"
            );
            failure.get_or_insert(error);
        }
    }
}

#[async_trait]
impl ConversationService for ConversationController {
    async fn handle_annotation(
        &self,
        event: &AnnotationEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ApplicationError> {
        self.on_annotation(event, ctx).await.map_err(ApplicationError::from)
    }

    async fn handle_message(
        &self,
        event: &MessageEvent,
        ctx: &EventContext,
    ) -> Result<ConversationOutcome, ApplicationError> {
        self.on_message(event, ctx).await.map_err(ApplicationError::from)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use munchbot_core::{
        ApplicationError, Business, Category, ConversationId, ConversationStage, ConversationStore,
        InMemoryConversationStore, SearchResults,
    };
    use munchbot_search::{RestaurantSearch, SearchError};
    use munchbot_workspace::messages::{CANCELLATION_NOTICE, CONFIRMATION_PROMPT, ZIP_PROMPT};
    use munchbot_workspace::{
        AnnotationEvent, ConversationOutcome, ConversationService, EventContext, MessageEvent,
        Messenger, MessengerError,
    };

    use super::{ConversationController, ConversationError};
    use crate::intent::ReplyClassifier;

    const BOT_ID: &str = "bot-app-id";
    const SPACE: &str = "space-1";

    enum SearchMode {
        Results(SearchResults),
        AuthFailure,
    }

    struct FakeSearch {
        mode: SearchMode,
        zips: Mutex<Vec<String>>,
    }

    impl FakeSearch {
        fn returning(businesses: Vec<Business>) -> Self {
            let total = businesses.len() as u64;
            Self {
                mode: SearchMode::Results(SearchResults { businesses, total }),
                zips: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self { mode: SearchMode::AuthFailure, zips: Mutex::new(Vec::new()) }
        }

        fn zips(&self) -> Vec<String> {
            self.zips.lock().expect("lock").clone()
        }
    }

    #[async_trait]
    impl RestaurantSearch for FakeSearch {
        async fn search(&self, zip: &str) -> Result<SearchResults, SearchError> {
            self.zips.lock().expect("lock").push(zip.to_owned());
            match &self.mode {
                SearchMode::Results(results) => Ok(results.clone()),
                SearchMode::AuthFailure => Err(SearchError::Authentication { status: 401 }),
            }
        }
    }

    #[derive(Default)]
    struct FakeMessenger {
        sent: Mutex<Vec<(String, String)>>,
        fail: bool,
    }

    impl FakeMessenger {
        fn failing() -> Self {
            Self { sent: Mutex::new(Vec::new()), fail: true }
        }

        fn texts(&self) -> Vec<String> {
            self.sent.lock().expect("lock").iter().map(|(_, text)| text.clone()).collect()
        }
    }

    #[async_trait]
    impl Messenger for FakeMessenger {
        async fn send(&self, space_id: &str, text: &str) -> Result<(), MessengerError> {
            self.sent.lock().expect("lock").push((space_id.to_owned(), text.to_owned()));
            if self.fail {
                return Err(MessengerError::UnexpectedStatus { status: 500 });
            }
            Ok(())
        }
    }

    struct Harness {
        controller: ConversationController,
        store: Arc<InMemoryConversationStore>,
        search: Arc<FakeSearch>,
        messenger: Arc<FakeMessenger>,
    }

    fn harness_with(search: FakeSearch, messenger: FakeMessenger) -> Harness {
        let store = Arc::new(InMemoryConversationStore::new());
        let search = Arc::new(search);
        let messenger = Arc::new(messenger);
        let controller = ConversationController::new(
            store.clone(),
            search.clone(),
            messenger.clone(),
            BOT_ID,
            ReplyClassifier::new().expect("pattern compiles"),
        );
        Harness { controller, store, search, messenger }
    }

    fn harness(businesses: Vec<Business>) -> Harness {
        harness_with(FakeSearch::returning(businesses), FakeMessenger::default())
    }

    fn business(name: &str, category: &str, rating: f64) -> Business {
        Business {
            name: name.to_owned(),
            url: format!("https://example.com/{name}"),
            categories: vec![Category { alias: category.to_lowercase(), title: category.to_owned() }],
            rating,
            review_count: None,
            price: None,
            location: None,
        }
    }

    fn intent(user_id: &str) -> AnnotationEvent {
        AnnotationEvent {
            space_id: SPACE.to_owned(),
            user_id: user_id.to_owned(),
            message_id: Some("m-1".to_owned()),
            annotation_type: "message-focus".to_owned(),
            annotation_payload: r#"{"lens":"Food","category":"Request"}"#.to_owned(),
        }
    }

    fn message(user_id: &str, content: &str) -> MessageEvent {
        MessageEvent {
            space_id: SPACE.to_owned(),
            user_id: user_id.to_owned(),
            message_id: None,
            content: content.to_owned(),
        }
    }

    fn ctx() -> EventContext {
        EventContext { correlation_id: "corr-test".to_owned() }
    }

    async fn stage(harness: &Harness) -> Option<ConversationStage> {
        harness.store.get(&ConversationId::from(SPACE)).await.map(|state| state.stage)
    }

    #[tokio::test]
    async fn message_without_conversation_is_ignored() {
        let h = harness(vec![]);

        let outcome = h.controller.on_message(&message("user-1", "yes"), &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Ignored);
        assert!(h.messenger.texts().is_empty());
        assert!(h.search.zips().is_empty());
    }

    #[tokio::test]
    async fn intent_prompts_for_confirmation_exactly_once() {
        let h = harness(vec![]);

        let outcome = h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Prompted);
        assert_eq!(h.messenger.texts(), vec![CONFIRMATION_PROMPT.to_owned()]);
        assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingConfirmation));
    }

    #[tokio::test]
    async fn non_food_annotation_is_ignored() {
        let h = harness(vec![]);
        let mut annotation = intent("user-1");
        annotation.annotation_payload = r#"{"lens":"Travel","category":"Request"}"#.to_owned();

        let outcome = h.controller.on_annotation(&annotation, &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Ignored);
        assert_eq!(stage(&h).await, None);
    }

    #[tokio::test]
    async fn repeated_intent_does_not_restart_the_dialog() {
        let h = harness(vec![]);
        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");
        h.controller.on_message(&message("user-1", "yes"), &ctx()).await.expect("ok");

        let outcome = h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Ignored);
        assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingZip));
        assert_eq!(h.messenger.texts().len(), 2);
    }

    #[tokio::test]
    async fn affirmative_replies_advance_to_zip_collection() {
        for reply in ["yes", "Ok", "y"] {
            let h = harness(vec![]);
            h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");

            let outcome =
                h.controller.on_message(&message("user-1", reply), &ctx()).await.expect("ok");

            assert_eq!(outcome, ConversationOutcome::Prompted, "reply {reply:?}");
            assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingZip));
            assert_eq!(h.messenger.texts().last().map(String::as_str), Some(ZIP_PROMPT));
        }
    }

    #[tokio::test]
    async fn other_replies_cancel_once_and_clear_the_dialog() {
        for reply in ["no", "maybe"] {
            let h = harness(vec![]);
            h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");

            let outcome =
                h.controller.on_message(&message("user-1", reply), &ctx()).await.expect("ok");
            let follow_up =
                h.controller.on_message(&message("user-1", "hello?"), &ctx()).await.expect("ok");

            assert_eq!(outcome, ConversationOutcome::Cancelled);
            assert_eq!(follow_up, ConversationOutcome::Ignored);
            assert_eq!(stage(&h).await, None);
            let cancellations =
                h.messenger.texts().iter().filter(|text| *text == CANCELLATION_NOTICE).count();
            assert_eq!(cancellations, 1, "reply {reply:?}");
        }
    }

    #[tokio::test]
    async fn zip_reply_searches_and_renders_one_bullet_per_business() {
        let h = harness(vec![
            business("Joe's Pizza", "Pizza", 4.5),
            business("Dumpling House", "Chinese", 4.0),
            business("Taco Stand", "Mexican", 3.5),
        ]);
        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");
        h.controller.on_message(&message("user-1", "yes"), &ctx()).await.expect("ok");

        let outcome =
            h.controller.on_message(&message("user-1", " 10001 \n"), &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Searched { result_count: 3 });
        assert_eq!(h.search.zips(), vec![" 10001 \n".to_owned()]);
        let texts = h.messenger.texts();
        let listing = texts.last().expect("results message");
        assert_eq!(listing.lines().filter(|line| line.starts_with("* ")).count(), 3);
        assert!(listing.contains("* [Joe's Pizza](https://example.com/Joe's Pizza) - Pizza - 4.5 stars"));
        assert_eq!(stage(&h).await, None);

        let after = h.controller.on_message(&message("user-1", "thanks"), &ctx()).await.expect("ok");
        assert_eq!(after, ConversationOutcome::Ignored);
        assert_eq!(h.messenger.texts().len(), 3);
    }

    #[tokio::test]
    async fn zero_results_send_heading_without_bullets() {
        let h = harness(vec![]);
        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");
        h.controller.on_message(&message("user-1", "yes"), &ctx()).await.expect("ok");

        let outcome =
            h.controller.on_message(&message("user-1", "99999"), &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Searched { result_count: 0 });
        let texts = h.messenger.texts();
        let listing = texts.last().expect("results message");
        assert_eq!(listing.lines().filter(|line| line.starts_with("* ")).count(), 0);
    }

    #[tokio::test]
    async fn bot_messages_never_trigger_transitions_or_sends() {
        let h = harness(vec![]);

        let annotation = h.controller.on_annotation(&intent(BOT_ID), &ctx()).await.expect("ok");
        assert_eq!(annotation, ConversationOutcome::Ignored);

        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");
        let reply = h.controller.on_message(&message(BOT_ID, CONFIRMATION_PROMPT), &ctx()).await;

        assert_eq!(reply.expect("ok"), ConversationOutcome::Ignored);
        assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingConfirmation));
        assert_eq!(h.messenger.texts().len(), 1);
    }

    #[tokio::test]
    async fn search_failure_clears_dialog_and_reports_authentication() {
        let h = harness_with(FakeSearch::failing(), FakeMessenger::default());
        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");
        h.controller.on_message(&message("user-1", "yes"), &ctx()).await.expect("ok");

        let error = h
            .controller
            .on_message(&message("user-1", "10001"), &ctx())
            .await
            .expect_err("search must fail");

        assert!(matches!(error, ConversationError::Search(SearchError::Authentication { .. })));
        assert_eq!(stage(&h).await, None);
        let application = ApplicationError::from(error);
        assert_eq!(application.class(), "authentication");
    }

    #[tokio::test]
    async fn delivery_failure_still_records_state_and_surfaces_error() {
        let h = harness_with(FakeSearch::returning(vec![]), FakeMessenger::failing());

        let error = h
            .controller
            .handle_annotation(&intent("user-1"), &ctx())
            .await
            .expect_err("send fails");

        assert_eq!(error.class(), "integration");
        assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingConfirmation));
    }

    #[tokio::test]
    async fn conversations_in_different_spaces_are_independent() {
        let h = harness(vec![]);
        h.controller.on_annotation(&intent("user-1"), &ctx()).await.expect("ok");

        let mut elsewhere = message("user-2", "yes");
        elsewhere.space_id = "space-2".to_owned();
        let outcome = h.controller.on_message(&elsewhere, &ctx()).await.expect("ok");

        assert_eq!(outcome, ConversationOutcome::Ignored);
        assert_eq!(stage(&h).await, Some(ConversationStage::AwaitingConfirmation));
    }
}
