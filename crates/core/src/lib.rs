//! Core domain for the reacto auto-reaction bot.
//!
//! Everything in this crate is delivery-agnostic: the rule set and
//! configuration document (`rules`), the keyword match engine (`matcher`),
//! the cached configuration store (`store`), and application configuration
//! loading (`config`). Slack-facing behavior lives in `reacto-slack`.

pub mod config;
pub mod matcher;
pub mod rules;
pub mod store;

pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use matcher::matched_reactions;
pub use rules::{normalize_keyword, Configuration, ReactionRule, RuleUpsert};
pub use store::{Clock, ConfigStore, StoreError, SystemClock};
