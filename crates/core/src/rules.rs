use serde::{Deserialize, Serialize};

/// A keyword trigger mapped to an ordered list of reaction markers.
///
/// The keyword matches case-insensitively as a substring. Reactions keep
/// their insertion order; duplicates inside one rule are kept as stored and
/// only collapsed at match time, across rules.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionRule {
    pub keyword: String,
    pub reactions: Vec<String>,
}

/// The persisted configuration document.
///
/// Serializes as `{"reactionRules": [...], "enabledChannels": [...]}` and
/// must round-trip losslessly; rule order and channel order are meaningful.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    #[serde(default)]
    pub reaction_rules: Vec<ReactionRule>,
    #[serde(default)]
    pub enabled_channels: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RuleUpsert {
    Inserted,
    Replaced,
}

/// Lowercased, trimmed form under which rule keywords are unique.
pub fn normalize_keyword(keyword: &str) -> String {
    keyword.trim().to_lowercase()
}

impl Configuration {
    pub fn rule(&self, keyword: &str) -> Option<&ReactionRule> {
        let normalized = normalize_keyword(keyword);
        self.reaction_rules.iter().find(|rule| normalize_keyword(&rule.keyword) == normalized)
    }

    /// Inserts a rule, or fully replaces the reaction list of an existing
    /// rule with the same normalized keyword. Never merges.
    pub fn upsert_rule(&mut self, keyword: &str, reactions: Vec<String>) -> RuleUpsert {
        let normalized = normalize_keyword(keyword);
        match self
            .reaction_rules
            .iter_mut()
            .find(|rule| normalize_keyword(&rule.keyword) == normalized)
        {
            Some(existing) => {
                existing.reactions = reactions;
                RuleUpsert::Replaced
            }
            None => {
                self.reaction_rules.push(ReactionRule { keyword: keyword.to_owned(), reactions });
                RuleUpsert::Inserted
            }
        }
    }

    /// Removes the rule with the given normalized keyword. Returns whether
    /// anything was removed.
    pub fn remove_rule(&mut self, keyword: &str) -> bool {
        let normalized = normalize_keyword(keyword);
        let before = self.reaction_rules.len();
        self.reaction_rules.retain(|rule| normalize_keyword(&rule.keyword) != normalized);
        self.reaction_rules.len() != before
    }

    pub fn is_channel_enabled(&self, channel_id: &str) -> bool {
        self.enabled_channels.iter().any(|id| id == channel_id)
    }

    /// Appends the channel to the enabled set. Returns false without
    /// mutating when the channel is already enabled.
    pub fn enable_channel(&mut self, channel_id: &str) -> bool {
        if self.is_channel_enabled(channel_id) {
            return false;
        }
        self.enabled_channels.push(channel_id.to_owned());
        true
    }

    /// Removes the channel from the enabled set. Returns whether it was
    /// present.
    pub fn disable_channel(&mut self, channel_id: &str) -> bool {
        let before = self.enabled_channels.len();
        self.enabled_channels.retain(|id| id != channel_id);
        self.enabled_channels.len() != before
    }
}
