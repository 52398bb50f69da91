use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::info;

use reacto_core::config::{AppConfig, ConfigError, LoadOptions};
use reacto_core::store::ConfigStore;
use reacto_slack::client::HttpSlackClient;
use reacto_slack::events::EventDispatcher;
use reacto_slack::pacing::Pacer;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<ConfigStore>,
    pub dispatcher: Arc<EventDispatcher>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    Ok(bootstrap_with_config(config))
}

pub fn bootstrap_with_config(config: AppConfig) -> Application {
    info!(
        event_name = "system.bootstrap.start",
        store_path = %config.store.path.display(),
        "starting application bootstrap"
    );

    let store = Arc::new(ConfigStore::new(
        config.store.path.clone(),
        Duration::from_secs(config.store.cache_ttl_secs),
    ));
    let client = Arc::new(HttpSlackClient::new(config.slack.bot_token.clone()));
    let pacer = Pacer::from_millis(config.engine.reaction_pace_ms);
    let dispatcher = Arc::new(EventDispatcher::new(store.clone(), client, pacer));

    info!(event_name = "system.bootstrap.ready", "application components wired");
    Application { config, store, dispatcher }
}
