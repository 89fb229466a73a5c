use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use munchbot_workspace::{
    DispatchError, EventContext, EventDispatcher, HandlerResult, WebhookEvent,
    OUTBOUND_TOKEN_HEADER,
};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
}

pub fn router(dispatcher: Arc<EventDispatcher>) -> Router {
    Router::new().route("/webhook", post(receive)).with_state(WebhookState { dispatcher })
}

/// Every delivery is acknowledged with 200; only verification answers synchronously.
pub async fn receive(State(state): State<WebhookState>, body: Bytes) -> Response {
    let ctx = EventContext { correlation_id: Uuid::new_v4().to_string() };

    let event = match WebhookEvent::from_slice(&body) {
        Ok(event) => event,
        Err(error) => {
            warn!(
                event_name = "webhook.event.rejected",
                correlation_id = %ctx.correlation_id,
                body_len = body.len(),
                error = %error,
                "webhook body could not be parsed; acknowledging anyway"
            );
            return StatusCode::OK.into_response();
        }
    };

    if let WebhookEvent::Verification { challenge } = &event {
        return match state.dispatcher.verify(challenge) {
            Ok(response) => {
                info!(
                    event_name = "webhook.verification.signed",
                    correlation_id = %ctx.correlation_id,
                    "endpoint verification challenge answered"
                );
                (
                    StatusCode::OK,
                    [
                        ("content-type", "application/json".to_string()),
                        (OUTBOUND_TOKEN_HEADER, response.token),
                    ],
                    response.body,
                )
                    .into_response()
            }
            Err(error) => {
                error!(
                    event_name = "webhook.verification.failed",
                    correlation_id = %ctx.correlation_id,
                    error = %error,
                    "could not sign verification response"
                );
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        };
    }

    debug!(
        event_name = "webhook.event.received",
        correlation_id = %ctx.correlation_id,
        event_type = event.event_type(),
        space_id = event.space_id().unwrap_or("unknown"),
        "webhook event accepted"
    );
    let dispatcher = state.dispatcher.clone();
    tokio::spawn(async move {
        let result = dispatcher.dispatch(&event, &ctx).await;
        log_dispatch(&event, &ctx, result);
    });

    StatusCode::OK.into_response()
}

fn log_dispatch(
    event: &WebhookEvent,
    ctx: &EventContext,
    result: Result<HandlerResult, DispatchError>,
) {
    let space_id = event.space_id().unwrap_or("unknown");
    match result {
        Ok(HandlerResult::Conversation(outcome)) => info!(
            event_name = "webhook.event.handled",
            correlation_id = %ctx.correlation_id,
            event_type = event.event_type(),
            space_id,
            outcome = ?outcome,
            "webhook event handled"
        ),
        Ok(HandlerResult::Ignored) => debug!(
            event_name = "webhook.event.unsupported",
            correlation_id = %ctx.correlation_id,
            event_type = event.event_type(),
            "unsupported webhook event ignored"
        ),
        Ok(HandlerResult::Verified(_)) => debug!(
            event_name = "webhook.verification.signed",
            correlation_id = %ctx.correlation_id,
            "verification handled off the request path"
        ),
        Err(DispatchError::Handler(error)) if error.is_fatal() => error!(
            event_name = "webhook.event.failed",
            correlation_id = %ctx.correlation_id,
            event_type = event.event_type(),
            space_id,
            error_class = error.class(),
            error = %error,
            "webhook handler failed; credentials must be fixed"
        ),
        Err(DispatchError::Handler(error)) => warn!(
            event_name = "webhook.event.failed",
            correlation_id = %ctx.correlation_id,
            event_type = event.event_type(),
            space_id,
            error_class = error.class(),
            error = %error,
            "webhook handler failed"
        ),
        Err(DispatchError::Signing(error)) => error!(
            event_name = "webhook.verification.failed",
            correlation_id = %ctx.correlation_id,
            error = %error,
            "could not sign verification response"
        ),
    }
}
