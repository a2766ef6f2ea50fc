use std::sync::Arc;
use std::time::Duration;

use gangway_core::config::{AppConfig, ConfigError, LoadOptions};
use gangway_core::context::RetryPolicy;
use gangway_fulfillment::intents::IntentRouter;
use gangway_nlu::client::HttpNluClient;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub router: IntentRouter<HttpNluClient>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("http client construction failed: {0}")]
    HttpClient(#[source] reqwest::Error),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let nlu = HttpNluClient::new(Duration::from_secs(config.nlu.timeout_secs))
        .map_err(BootstrapError::HttpClient)?;
    let router = IntentRouter::new(
        Arc::new(nlu),
        RetryPolicy::new(config.dialog.initial_retries),
        config.defaults.clone(),
    );

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        nlu_timeout_secs = config.nlu.timeout_secs,
        initial_retries = config.dialog.initial_retries,
        "application wiring complete"
    );

    Ok(Application { config, router })
}
