use std::sync::Arc;

use tracing::{debug, info, warn};

use reacto_core::matcher::matched_reactions;
use reacto_core::store::ConfigStore;

use crate::client::SlackClient;
use crate::commands::{CommandPayload, CommandResponse, CommandRouter};
use crate::pacing::Pacer;

/// Inbound events after classification, delivery-mechanism agnostic: the
/// socket runner and the webhook adapter both produce these.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SlackEvent {
    /// Platform verification handshake; the token is echoed verbatim.
    UrlVerification { challenge: String },
    Message(MessageEvent),
    Command(CommandPayload),
    Unsupported { event_type: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageEvent {
    pub channel_id: String,
    pub text: String,
    pub timestamp: String,
    pub bot_authored: bool,
    pub subtype: Option<String>,
}

impl MessageEvent {
    /// Bot-authored and subtyped messages (joins, edits, etc.) are never
    /// matched against the rule set.
    fn is_eligible(&self) -> bool {
        !self.bot_authored && self.subtype.as_deref().map_or(true, str::is_empty)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Verbatim challenge token to hand back to the platform.
    Challenge(String),
    Response(CommandResponse),
    ReactionsApplied { applied: usize, failed: usize },
    Ignored,
}

/// Top-level entry point: classifies events and drives the message and
/// command paths. Dispatch never fails; a failure inside one event's
/// processing is logged here and does not affect subsequent events.
pub struct EventDispatcher {
    store: Arc<ConfigStore>,
    client: Arc<dyn SlackClient>,
    router: CommandRouter,
    pacer: Pacer,
}

impl EventDispatcher {
    pub fn new(store: Arc<ConfigStore>, client: Arc<dyn SlackClient>, pacer: Pacer) -> Self {
        let router = CommandRouter::new(store.clone(), client.clone());
        Self { store, client, router, pacer }
    }

    pub async fn dispatch(&self, event: &SlackEvent) -> DispatchOutcome {
        match event {
            SlackEvent::UrlVerification { challenge } => {
                debug!(event_name = "dispatch.url_verification", "echoing challenge token");
                DispatchOutcome::Challenge(challenge.clone())
            }
            SlackEvent::Message(message) => self.handle_message(message).await,
            SlackEvent::Command(payload) => {
                DispatchOutcome::Response(self.router.route(payload).await)
            }
            SlackEvent::Unsupported { event_type } => {
                debug!(
                    event_name = "dispatch.unsupported",
                    event_type, "ignoring unsupported event"
                );
                DispatchOutcome::Ignored
            }
        }
    }

    async fn handle_message(&self, message: &MessageEvent) -> DispatchOutcome {
        if !message.is_eligible() {
            return DispatchOutcome::Ignored;
        }

        let config = self.store.get();
        if !config.is_channel_enabled(&message.channel_id) {
            return DispatchOutcome::Ignored;
        }

        let matched = matched_reactions(&message.text, &config.reaction_rules);
        if matched.is_empty() {
            return DispatchOutcome::ReactionsApplied { applied: 0, failed: 0 };
        }

        let mut applied = 0usize;
        let mut failed = 0usize;
        for (index, reaction) in matched.iter().enumerate() {
            if index > 0 {
                self.pacer.pause().await;
            }

            let name = marker_name(reaction);
            match self.client.add_reaction(&message.channel_id, &message.timestamp, &name).await {
                Ok(()) => {
                    applied += 1;
                    debug!(
                        event_name = "dispatch.reaction_applied",
                        channel_id = %message.channel_id,
                        reaction = %name,
                        "reaction applied"
                    );
                }
                Err(error) => {
                    failed += 1;
                    warn!(
                        event_name = "dispatch.reaction_failed",
                        channel_id = %message.channel_id,
                        reaction = %name,
                        error = %error,
                        "reaction apply failed; continuing with remaining markers"
                    );
                }
            }
        }

        info!(
            event_name = "dispatch.message_processed",
            channel_id = %message.channel_id,
            applied,
            failed,
            "message event processed"
        );
        DispatchOutcome::ReactionsApplied { applied, failed }
    }
}

/// Colon delimiters are configuration sugar; the Web API wants bare names.
fn marker_name(reaction: &str) -> String {
    reaction.replace(':', "")
}
