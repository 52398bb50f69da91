use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::error;

use reacto_core::rules::RuleUpsert;
use reacto_core::store::{ConfigStore, StoreError};

use crate::client::SlackClient;
use crate::lifecycle::{ChannelLifecycle, DisableOutcome, EnableOutcome, LifecycleError};

/// Inbound slash-command payload, already reduced to a verb plus its
/// argument text (`/reaction-add hello :wave:` arrives as verb `add`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandPayload {
    pub verb: String,
    pub text: String,
    pub channel_id: String,
    pub user_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReactionCommand {
    Add { keyword: String, reactions: Vec<String> },
    AddUsage,
    Remove { keyword: String },
    RemoveUsage,
    List,
    Enable,
    Disable,
    Unknown { verb: String },
}

/// Operator-facing response envelope; every command answers ephemerally.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CommandResponse {
    pub text: String,
    pub response_type: ResponseVisibility,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseVisibility {
    Ephemeral,
}

impl CommandResponse {
    pub fn ephemeral(text: impl Into<String>) -> Self {
        Self { text: text.into(), response_type: ResponseVisibility::Ephemeral }
    }
}

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Splits argument text into a command. `add` needs a keyword plus at least
/// one reaction token; `remove` uses the full trimmed text as the keyword.
pub fn classify_command(verb: &str, text: &str) -> ReactionCommand {
    match verb.trim().to_ascii_lowercase().as_str() {
        "add" => {
            let mut tokens = text.split_whitespace();
            let Some(keyword) = tokens.next() else {
                return ReactionCommand::AddUsage;
            };
            let reactions: Vec<String> = tokens.map(str::to_owned).collect();
            if reactions.is_empty() {
                return ReactionCommand::AddUsage;
            }
            ReactionCommand::Add { keyword: keyword.to_owned(), reactions }
        }
        "remove" => {
            let keyword = text.trim();
            if keyword.is_empty() {
                ReactionCommand::RemoveUsage
            } else {
                ReactionCommand::Remove { keyword: keyword.to_owned() }
            }
        }
        "list" => ReactionCommand::List,
        "enable" => ReactionCommand::Enable,
        "disable" => ReactionCommand::Disable,
        other => ReactionCommand::Unknown { verb: other.to_owned() },
    }
}

/// Routes parsed commands to the store and channel lifecycle.
///
/// This is an error boundary: `route` never fails. Anything escaping a
/// handler is logged and converted into a generic error response, and a
/// failed handler never leaves a partial mutation behind (mutations build on
/// a local copy and commit through a single whole-document save).
pub struct CommandRouter {
    store: Arc<ConfigStore>,
    lifecycle: ChannelLifecycle,
}

impl CommandRouter {
    pub fn new(store: Arc<ConfigStore>, client: Arc<dyn SlackClient>) -> Self {
        let lifecycle = ChannelLifecycle::new(store.clone(), client);
        Self { store, lifecycle }
    }

    pub async fn route(&self, payload: &CommandPayload) -> CommandResponse {
        match self.try_route(payload).await {
            Ok(response) => response,
            Err(command_error) => {
                error!(
                    event_name = "command.route.failed",
                    verb = %payload.verb,
                    channel_id = %payload.channel_id,
                    error = %command_error,
                    "command handler failed"
                );
                CommandResponse::ephemeral("Something went wrong while processing the command.")
            }
        }
    }

    async fn try_route(&self, payload: &CommandPayload) -> Result<CommandResponse, CommandError> {
        let response = match classify_command(&payload.verb, &payload.text) {
            ReactionCommand::Add { keyword, reactions } => self.add(&keyword, reactions)?,
            ReactionCommand::AddUsage => CommandResponse::ephemeral(
                "Provide a keyword and at least one reaction. Example: `/reaction-add hello :wave: :sunny:`",
            ),
            ReactionCommand::Remove { keyword } => self.remove(&keyword)?,
            ReactionCommand::RemoveUsage => CommandResponse::ephemeral(
                "Provide the keyword to remove. Example: `/reaction-remove hello`",
            ),
            ReactionCommand::List => self.list(),
            ReactionCommand::Enable => {
                let outcome = self.lifecycle.enable(&payload.channel_id).await?;
                enable_response(outcome)
            }
            ReactionCommand::Disable => {
                let outcome = self.lifecycle.disable(&payload.channel_id).await?;
                disable_response(outcome)
            }
            ReactionCommand::Unknown { verb } => CommandResponse::ephemeral(format!(
                "Unsupported command `{verb}`. Known commands: add, remove, list, enable, disable."
            )),
        };

        Ok(response)
    }

    fn add(&self, keyword: &str, reactions: Vec<String>) -> Result<CommandResponse, CommandError> {
        let mut config = self.store.get();
        let joined = reactions.join(" ");
        let outcome = config.upsert_rule(keyword, reactions);
        self.store.save(&config)?;

        Ok(match outcome {
            RuleUpsert::Inserted => CommandResponse::ephemeral(format!(
                "Added a new reaction rule: keyword \"{keyword}\" now triggers {joined}."
            )),
            RuleUpsert::Replaced => CommandResponse::ephemeral(format!(
                "Updated the reaction rule for keyword \"{keyword}\": now triggers {joined}."
            )),
        })
    }

    fn remove(&self, keyword: &str) -> Result<CommandResponse, CommandError> {
        let mut config = self.store.get();
        if !config.remove_rule(keyword) {
            return Ok(CommandResponse::ephemeral(format!(
                "No rule found for keyword \"{keyword}\"."
            )));
        }

        self.store.save(&config)?;
        Ok(CommandResponse::ephemeral(format!(
            "Removed the reaction rule for keyword \"{keyword}\"."
        )))
    }

    fn list(&self) -> CommandResponse {
        let config = self.store.get();
        if config.reaction_rules.is_empty() {
            return CommandResponse::ephemeral("No reaction rules configured yet.");
        }

        let mut text = String::from("Current reaction rules:\n");
        for (index, rule) in config.reaction_rules.iter().enumerate() {
            text.push_str(&format!(
                "{}. \"{}\" → {}\n",
                index + 1,
                rule.keyword,
                rule.reactions.join(" ")
            ));
        }
        CommandResponse::ephemeral(text)
    }
}

fn enable_response(outcome: EnableOutcome) -> CommandResponse {
    match outcome {
        EnableOutcome::Enabled => CommandResponse::ephemeral(
            "Auto reactions are now enabled in this channel and the bot has joined.",
        ),
        EnableOutcome::AlreadyEnabled => {
            CommandResponse::ephemeral("Auto reactions are already enabled in this channel.")
        }
        EnableOutcome::JoinFailed => CommandResponse::ephemeral(
            "Tried to enable auto reactions, but the bot could not join this channel — check bot permissions.",
        ),
    }
}

fn disable_response(outcome: DisableOutcome) -> CommandResponse {
    match outcome {
        DisableOutcome::Disabled => CommandResponse::ephemeral(
            "Auto reactions are now disabled and the bot left the channel.",
        ),
        DisableOutcome::AlreadyDisabled => {
            CommandResponse::ephemeral("Auto reactions are already disabled in this channel.")
        }
        DisableOutcome::DisabledLeaveFailed => CommandResponse::ephemeral(
            "Auto reactions are disabled for this channel, but the bot could not leave — remove it from the channel manually if needed.",
        ),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::sync::Arc;
    use std::time::Duration;

    use tempfile::TempDir;

    use reacto_core::store::ConfigStore;

    use super::{classify_command, CommandPayload, CommandRouter, ReactionCommand};
    use crate::client::testing::RecordingSlackClient;

    fn payload(verb: &str, text: &str) -> CommandPayload {
        CommandPayload {
            verb: verb.to_owned(),
            text: text.to_owned(),
            channel_id: "C123".to_owned(),
            user_id: "U1".to_owned(),
        }
    }

    fn router(dir: &TempDir) -> (CommandRouter, Arc<ConfigStore>) {
        let store =
            Arc::new(ConfigStore::new(dir.path().join("config.json"), Duration::from_secs(60)));
        let client = Arc::new(RecordingSlackClient::default());
        (CommandRouter::new(store.clone(), client), store)
    }

    #[test]
    fn classification_covers_the_fixed_vocabulary() {
        assert_eq!(
            classify_command("add", "hello :wave: :sunny:"),
            ReactionCommand::Add {
                keyword: "hello".to_owned(),
                reactions: vec![":wave:".to_owned(), ":sunny:".to_owned()],
            }
        );
        assert_eq!(classify_command("add", "hello"), ReactionCommand::AddUsage);
        assert_eq!(classify_command("add", "   "), ReactionCommand::AddUsage);
        assert_eq!(
            classify_command("remove", "  bye  "),
            ReactionCommand::Remove { keyword: "bye".to_owned() }
        );
        assert_eq!(classify_command("remove", ""), ReactionCommand::RemoveUsage);
        assert_eq!(classify_command("LIST", ""), ReactionCommand::List);
        assert_eq!(classify_command("enable", ""), ReactionCommand::Enable);
        assert_eq!(classify_command("disable", ""), ReactionCommand::Disable);
        assert!(matches!(classify_command("bogus", ""), ReactionCommand::Unknown { .. }));
    }

    #[tokio::test]
    async fn add_creates_a_rule_and_confirms() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);

        let response = router.route(&payload("add", "hello :wave:")).await;

        assert!(response.text.contains("hello"));
        let config = store.get();
        assert_eq!(config.reaction_rules.len(), 1);
        assert_eq!(config.reaction_rules[0].reactions, vec![":wave:".to_owned()]);
    }

    #[tokio::test]
    async fn add_replaces_reactions_for_an_existing_keyword() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);

        router.route(&payload("add", "hello :wave:")).await;
        let response = router.route(&payload("add", "hello :smile:")).await;

        assert!(response.text.contains("Updated"));
        let config = store.get();
        assert_eq!(config.reaction_rules.len(), 1);
        assert_eq!(config.reaction_rules[0].reactions, vec![":smile:".to_owned()]);
    }

    #[tokio::test]
    async fn add_without_reactions_is_a_usage_error_and_no_write() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);

        let response = router.route(&payload("add", "hello")).await;

        assert!(response.text.contains("Provide a keyword"));
        assert!(store.get().reaction_rules.is_empty());
    }

    #[tokio::test]
    async fn remove_of_unknown_keyword_reports_not_found_without_a_write() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);
        router.route(&payload("add", "hello :wave:")).await;
        let before = fs::read_to_string(store.path()).expect("document");

        let response = router.route(&payload("remove", "bye")).await;

        assert!(response.text.contains("No rule found"));
        let after = fs::read_to_string(store.path()).expect("document");
        assert_eq!(before, after, "a failed removal must not rewrite the document");
    }

    #[tokio::test]
    async fn remove_deletes_the_rule_case_insensitively() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);
        router.route(&payload("add", "Hello :wave:")).await;

        let response = router.route(&payload("remove", "hello")).await;

        assert!(response.text.contains("Removed"));
        assert!(store.get().reaction_rules.is_empty());
    }

    #[tokio::test]
    async fn list_enumerates_rules_in_stored_order() {
        let dir = TempDir::new().expect("tempdir");
        let (router, _store) = router(&dir);
        router.route(&payload("add", "hello :wave:")).await;
        router.route(&payload("add", "ship :boat: :rocket:")).await;

        let response = router.route(&payload("list", "")).await;

        assert!(response.text.contains("1. \"hello\" → :wave:"));
        assert!(response.text.contains("2. \"ship\" → :boat: :rocket:"));
    }

    #[tokio::test]
    async fn list_with_no_rules_says_so() {
        let dir = TempDir::new().expect("tempdir");
        let (router, _store) = router(&dir);

        let response = router.route(&payload("list", "")).await;

        assert!(response.text.contains("No reaction rules configured"));
    }

    #[tokio::test]
    async fn enable_and_disable_surface_lifecycle_outcomes() {
        let dir = TempDir::new().expect("tempdir");
        let (router, store) = router(&dir);

        let enabled = router.route(&payload("enable", "")).await;
        assert!(enabled.text.contains("now enabled"));
        assert!(store.get().is_channel_enabled("C123"));

        let again = router.route(&payload("enable", "")).await;
        assert!(again.text.contains("already enabled"));

        let disabled = router.route(&payload("disable", "")).await;
        assert!(disabled.text.contains("now disabled"));
        assert!(!store.get().is_channel_enabled("C123"));
    }

    #[tokio::test]
    async fn unknown_verb_lists_the_vocabulary() {
        let dir = TempDir::new().expect("tempdir");
        let (router, _store) = router(&dir);

        let response = router.route(&payload("frobnicate", "")).await;

        assert!(response.text.contains("Unsupported command `frobnicate`"));
    }
}
