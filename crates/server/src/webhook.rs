//! Webhook delivery adapter: the HTTP twin of the socket-mode runner.
//!
//! Slack posts event callbacks as JSON to `/slack/events` and slash
//! commands as form bodies to `/slack/commands`; both are reduced to the
//! same `SlackEvent` the socket adapter produces and handed to the shared
//! dispatcher. Signature verification sits in front of this service at the
//! platform edge and is not re-checked here.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Form, Json, Router,
};
use serde::Deserialize;
use tracing::debug;

use reacto_slack::commands::CommandPayload;
use reacto_slack::events::{DispatchOutcome, EventDispatcher, MessageEvent, SlackEvent};

#[derive(Clone)]
pub struct WebhookState {
    dispatcher: Arc<EventDispatcher>,
}

pub fn router(dispatcher: Arc<EventDispatcher>) -> Router {
    Router::new()
        .route("/slack/events", post(events))
        .route("/slack/commands", post(commands))
        .with_state(WebhookState { dispatcher })
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum EventsRequest {
    UrlVerification { challenge: String },
    EventCallback { event: CallbackEvent },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
struct CallbackEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    channel: String,
    #[serde(default)]
    text: String,
    #[serde(default)]
    ts: String,
    #[serde(default)]
    bot_id: Option<String>,
    #[serde(default)]
    subtype: Option<String>,
}

/// Slack's slash-command form body (the fields this bot uses).
#[derive(Debug, Deserialize)]
struct SlashCommandForm {
    command: String,
    #[serde(default)]
    text: String,
    channel_id: String,
    #[serde(default)]
    user_id: String,
}

async fn events(State(state): State<WebhookState>, Json(request): Json<EventsRequest>) -> Response {
    match request {
        EventsRequest::UrlVerification { challenge } => {
            let outcome =
                state.dispatcher.dispatch(&SlackEvent::UrlVerification { challenge }).await;
            match outcome {
                DispatchOutcome::Challenge(token) => token.into_response(),
                _ => StatusCode::OK.into_response(),
            }
        }
        EventsRequest::EventCallback { event } => {
            let slack_event = classify_callback(event);
            let outcome = state.dispatcher.dispatch(&slack_event).await;
            debug!(
                event_name = "ingress.webhook.dispatched",
                outcome = ?outcome,
                "event callback dispatched"
            );
            StatusCode::OK.into_response()
        }
        EventsRequest::Unknown => StatusCode::OK.into_response(),
    }
}

async fn commands(
    State(state): State<WebhookState>,
    Form(form): Form<SlashCommandForm>,
) -> Response {
    let payload = CommandPayload {
        verb: verb_from_command(&form.command),
        text: form.text,
        channel_id: form.channel_id,
        user_id: form.user_id,
    };

    match state.dispatcher.dispatch(&SlackEvent::Command(payload)).await {
        DispatchOutcome::Response(response) => Json(response).into_response(),
        _ => StatusCode::OK.into_response(),
    }
}

fn classify_callback(event: CallbackEvent) -> SlackEvent {
    if event.event_type == "message" {
        SlackEvent::Message(MessageEvent {
            channel_id: event.channel,
            text: event.text,
            timestamp: event.ts,
            bot_authored: event.bot_id.is_some(),
            subtype: event.subtype,
        })
    } else {
        SlackEvent::Unsupported { event_type: event.event_type }
    }
}

/// `/reaction-add` → `add`; unprefixed command names pass through as-is.
fn verb_from_command(command: &str) -> String {
    let name = command.trim().trim_start_matches('/');
    name.strip_prefix("reaction-").unwrap_or(name).to_owned()
}
