//! Slack integration for the reacto auto-reaction bot.
//!
//! This crate owns everything Slack-facing:
//! - **Client** (`client`) - Web API calls (`reactions.add`, channel join/leave)
//! - **Lifecycle** (`lifecycle`) - per-channel enable/disable state machine
//! - **Commands** (`commands`) - `add`, `remove`, `list`, `enable`, `disable`
//! - **Events** (`events`) - event classification and dispatch
//! - **Socket Mode** (`socket`) - WebSocket delivery adapter (no public URL needed)
//! - **Pacing** (`pacing`) - fixed interval between reaction-apply calls
//!
//! # Architecture
//!
//! ```text
//! Slack Events → EventDispatcher → MatchEngine → reactions.add (paced)
//!                     ↓
//!               CommandRouter → ConfigStore / ChannelLifecycle → ephemeral response
//! ```
//!
//! The core (store, rules, matcher) lives in `reacto-core` and is
//! delivery-agnostic; socket mode here and the webhook adapter in
//! `reacto-server` are thin transports over the same dispatcher.

pub mod client;
pub mod commands;
pub mod events;
pub mod lifecycle;
pub mod pacing;
pub mod socket;
