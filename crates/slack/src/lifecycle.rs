use std::sync::Arc;

use thiserror::Error;
use tracing::{info, warn};

use reacto_core::store::{ConfigStore, StoreError};

use crate::client::SlackClient;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EnableOutcome {
    /// Joined the channel and persisted the membership.
    Enabled,
    /// Membership already present; the join was re-attempted as an
    /// operator convenience but nothing was persisted.
    AlreadyEnabled,
    /// Join was refused; the channel stays disabled and nothing was
    /// persisted.
    JoinFailed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisableOutcome {
    /// Membership removed, persisted, and the bot left the channel.
    Disabled,
    AlreadyDisabled,
    /// Membership removed and persisted, but the leave call failed. The
    /// state transition is already committed; only the message differs.
    DisabledLeaveFailed,
}

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// State machine for a channel's enabled/disabled status.
///
/// The enabled set in the persisted configuration is the source of truth;
/// join/leave against Slack are side effects whose failures never propagate
/// past this component as errors, only as outcome variants.
pub struct ChannelLifecycle {
    store: Arc<ConfigStore>,
    client: Arc<dyn SlackClient>,
}

impl ChannelLifecycle {
    pub fn new(store: Arc<ConfigStore>, client: Arc<dyn SlackClient>) -> Self {
        Self { store, client }
    }

    /// Enables auto reactions for the channel. Join happens before the
    /// membership is persisted, so a refused join leaves the configuration
    /// untouched.
    pub async fn enable(&self, channel_id: &str) -> Result<EnableOutcome, LifecycleError> {
        let mut config = self.store.get();

        if config.is_channel_enabled(channel_id) {
            // Re-attempt the join in case the bot was kicked out of the
            // channel since it was enabled.
            if let Err(error) = self.client.join_channel(channel_id).await {
                warn!(
                    event_name = "lifecycle.channel.rejoin_failed",
                    channel_id,
                    error = %error,
                    "re-join of already enabled channel failed"
                );
            }
            return Ok(EnableOutcome::AlreadyEnabled);
        }

        if let Err(error) = self.client.join_channel(channel_id).await {
            warn!(
                event_name = "lifecycle.channel.join_failed",
                channel_id,
                error = %error,
                "channel join refused; channel stays disabled"
            );
            return Ok(EnableOutcome::JoinFailed);
        }

        config.enable_channel(channel_id);
        self.store.save(&config)?;
        info!(event_name = "lifecycle.channel.enabled", channel_id, "channel enabled");
        Ok(EnableOutcome::Enabled)
    }

    /// Disables auto reactions for the channel. The membership removal is
    /// persisted before the leave attempt; a failed leave only changes the
    /// reported outcome, never the committed state.
    pub async fn disable(&self, channel_id: &str) -> Result<DisableOutcome, LifecycleError> {
        let mut config = self.store.get();

        if !config.disable_channel(channel_id) {
            return Ok(DisableOutcome::AlreadyDisabled);
        }
        self.store.save(&config)?;
        info!(event_name = "lifecycle.channel.disabled", channel_id, "channel disabled");

        match self.client.leave_channel(channel_id).await {
            Ok(()) => Ok(DisableOutcome::Disabled),
            Err(error) => {
                warn!(
                    event_name = "lifecycle.channel.leave_failed",
                    channel_id,
                    error = %error,
                    "channel leave failed after disable was committed"
                );
                Ok(DisableOutcome::DisabledLeaveFailed)
            }
        }
    }
}
