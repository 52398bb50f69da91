use std::{sync::Arc, time::Duration};

use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{EventDispatcher, SlackEvent};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport failed to connect: {0}")]
    Connect(String),
    #[error("transport read failed: {0}")]
    Receive(String),
    #[error("transport ack failed: {0}")]
    Acknowledge(String),
    #[error("transport disconnect failed: {0}")]
    Disconnect(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Envelope {
    pub envelope_id: String,
    pub event: SlackEvent,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 }
    }
}

impl ReconnectPolicy {
    fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.min(16);
        let multiplier = 1_u64 << exponent;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier).min(self.max_delay_ms);
        Duration::from_millis(delay_ms)
    }
}

/// Socket-mode delivery surface. The production transport wraps Slack's
/// WebSocket; tests script one in memory.
#[async_trait]
pub trait SocketTransport: Send + Sync {
    async fn connect(&self) -> Result<(), TransportError>;
    async fn next_envelope(&self) -> Result<Option<Envelope>, TransportError>;
    async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError>;
    async fn disconnect(&self) -> Result<(), TransportError>;
}

/// Pumps envelopes from the transport into the dispatcher, one event to
/// completion before the next, reconnecting with exponential backoff.
pub struct SocketModeRunner {
    transport: Arc<dyn SocketTransport>,
    dispatcher: Arc<EventDispatcher>,
    reconnect_policy: ReconnectPolicy,
}

impl SocketModeRunner {
    pub fn new(
        transport: Arc<dyn SocketTransport>,
        dispatcher: Arc<EventDispatcher>,
        reconnect_policy: ReconnectPolicy,
    ) -> Self {
        Self { transport, dispatcher, reconnect_policy }
    }

    pub async fn start(&self) -> Result<()> {
        for attempt in 0..=self.reconnect_policy.max_retries {
            match self.connect_and_pump(attempt).await {
                Ok(()) => return Ok(()),
                Err(transport_error) => {
                    warn!(
                        attempt,
                        max_retries = self.reconnect_policy.max_retries,
                        error = %transport_error,
                        "socket mode transport failed"
                    );

                    if attempt >= self.reconnect_policy.max_retries {
                        warn!(
                            max_retries = self.reconnect_policy.max_retries,
                            "socket mode retries exhausted; continuing process without crash"
                        );
                        return Ok(());
                    }

                    let delay = self.reconnect_policy.backoff(attempt);
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
        }

        Ok(())
    }

    async fn connect_and_pump(&self, attempt: u32) -> Result<(), TransportError> {
        info!(attempt, "opening socket mode transport connection");
        self.transport.connect().await?;
        info!(attempt, "socket mode transport connected");

        loop {
            let Some(envelope) = self.transport.next_envelope().await? else {
                info!(attempt, "socket mode transport stream closed");
                self.transport.disconnect().await?;
                return Ok(());
            };
            let channel_id = channel_of(&envelope.event);

            info!(
                event_name = "ingress.slack.envelope_received",
                envelope_id = %envelope.envelope_id,
                channel_id = channel_id.unwrap_or("unknown"),
                "received slack envelope"
            );

            if let Err(error) = self.transport.acknowledge(&envelope.envelope_id).await {
                warn!(
                    event_name = "ingress.slack.ack_failed",
                    envelope_id = %envelope.envelope_id,
                    channel_id = channel_id.unwrap_or("unknown"),
                    error = %error,
                    "failed to acknowledge slack envelope"
                );
            } else {
                debug!(
                    event_name = "ingress.slack.ack_sent",
                    envelope_id = %envelope.envelope_id,
                    channel_id = channel_id.unwrap_or("unknown"),
                    "acknowledged slack envelope"
                );
            }

            let outcome = self.dispatcher.dispatch(&envelope.event).await;
            debug!(
                event_name = "ingress.slack.dispatched",
                envelope_id = %envelope.envelope_id,
                channel_id = channel_id.unwrap_or("unknown"),
                outcome = ?outcome,
                "slack envelope dispatched"
            );
        }
    }
}

fn channel_of(event: &SlackEvent) -> Option<&str> {
    match event {
        SlackEvent::Message(message) => Some(&message.channel_id),
        SlackEvent::Command(payload) => Some(&payload.channel_id),
        SlackEvent::UrlVerification { .. } | SlackEvent::Unsupported { .. } => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Mutex;

    use reacto_core::rules::Configuration;
    use reacto_core::store::ConfigStore;

    use super::{Envelope, ReconnectPolicy, SocketModeRunner, SocketTransport, TransportError};
    use crate::client::testing::{RecordedCall, RecordingSlackClient};
    use crate::events::{EventDispatcher, MessageEvent, SlackEvent};
    use crate::pacing::Pacer;

    #[derive(Default)]
    struct ScriptedTransport {
        state: Mutex<ScriptedState>,
    }

    #[derive(Default)]
    struct ScriptedState {
        connect_results: VecDeque<Result<(), TransportError>>,
        envelopes: VecDeque<Result<Option<Envelope>, TransportError>>,
        connect_attempts: usize,
        acknowledgements: Vec<String>,
    }

    impl ScriptedTransport {
        fn with_script(
            connect_results: Vec<Result<(), TransportError>>,
            envelopes: Vec<Result<Option<Envelope>, TransportError>>,
        ) -> Self {
            Self {
                state: Mutex::new(ScriptedState {
                    connect_results: connect_results.into(),
                    envelopes: envelopes.into(),
                    connect_attempts: 0,
                    acknowledgements: Vec::new(),
                }),
            }
        }

        async fn connect_attempts(&self) -> usize {
            self.state.lock().await.connect_attempts
        }

        async fn acknowledgements(&self) -> Vec<String> {
            self.state.lock().await.acknowledgements.clone()
        }
    }

    #[async_trait]
    impl SocketTransport for ScriptedTransport {
        async fn connect(&self) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.connect_attempts += 1;
            state.connect_results.pop_front().unwrap_or(Ok(()))
        }

        async fn next_envelope(&self) -> Result<Option<Envelope>, TransportError> {
            let mut state = self.state.lock().await;
            state.envelopes.pop_front().unwrap_or(Ok(None))
        }

        async fn acknowledge(&self, envelope_id: &str) -> Result<(), TransportError> {
            let mut state = self.state.lock().await;
            state.acknowledgements.push(envelope_id.to_owned());
            Ok(())
        }

        async fn disconnect(&self) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn dispatcher_with_rule(dir: &TempDir) -> (Arc<EventDispatcher>, Arc<RecordingSlackClient>) {
        let store =
            Arc::new(ConfigStore::new(dir.path().join("config.json"), Duration::from_secs(60)));
        let mut config = Configuration::default();
        config.upsert_rule("hello", vec![":wave:".to_owned()]);
        config.enable_channel("C123");
        store.save(&config).expect("seed");

        let client = Arc::new(RecordingSlackClient::default());
        let dispatcher =
            Arc::new(EventDispatcher::new(store, client.clone(), Pacer::from_millis(0)));
        (dispatcher, client)
    }

    fn message_envelope(envelope_id: &str, channel_id: &str, text: &str) -> Envelope {
        Envelope {
            envelope_id: envelope_id.to_owned(),
            event: SlackEvent::Message(MessageEvent {
                channel_id: channel_id.to_owned(),
                text: text.to_owned(),
                timestamp: "1730000000.1000".to_owned(),
                bot_authored: false,
                subtype: None,
            }),
        }
    }

    #[tokio::test]
    async fn reconnects_after_initial_connect_failure_and_acks_envelopes() {
        let dir = TempDir::new().expect("tempdir");
        let (dispatcher, client) = dispatcher_with_rule(&dir);
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Err(TransportError::Connect("network down".to_owned())), Ok(())],
            vec![Ok(Some(message_envelope("env-1", "C123", "hello there"))), Ok(None)],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            dispatcher,
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.connect_attempts().await, 2);
        assert_eq!(transport.acknowledgements().await, vec!["env-1"]);
        assert_eq!(
            client.calls(),
            vec![RecordedCall::AddReaction {
                channel_id: "C123".to_owned(),
                timestamp: "1730000000.1000".to_owned(),
                name: "wave".to_owned(),
            }]
        );
    }

    #[tokio::test]
    async fn exhausts_retries_without_crashing() {
        let dir = TempDir::new().expect("tempdir");
        let (dispatcher, _client) = dispatcher_with_rule(&dir);
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![
                Err(TransportError::Connect("fail-1".to_owned())),
                Err(TransportError::Connect("fail-2".to_owned())),
                Err(TransportError::Connect("fail-3".to_owned())),
            ],
            vec![],
        ));

        let runner = SocketModeRunner::new(
            transport.clone(),
            dispatcher,
            ReconnectPolicy { max_retries: 2, base_delay_ms: 0, max_delay_ms: 0 },
        );

        runner.start().await.expect("runner should degrade gracefully");
        assert_eq!(transport.connect_attempts().await, 3);
    }

    #[tokio::test]
    async fn one_failing_event_does_not_stop_the_pump() {
        let dir = TempDir::new().expect("tempdir");
        let (dispatcher, client) = dispatcher_with_rule(&dir);
        // Message in a disabled channel is a no-op, not a pump failure.
        let transport = Arc::new(ScriptedTransport::with_script(
            vec![Ok(())],
            vec![
                Ok(Some(message_envelope("env-1", "C999", "hello"))),
                Ok(Some(message_envelope("env-2", "C123", "hello"))),
                Ok(None),
            ],
        ));

        let runner =
            SocketModeRunner::new(transport.clone(), dispatcher, ReconnectPolicy::default());
        runner.start().await.expect("runner should not fail");

        assert_eq!(transport.acknowledgements().await, vec!["env-1", "env-2"]);
        assert_eq!(client.calls().len(), 1);
    }
}
