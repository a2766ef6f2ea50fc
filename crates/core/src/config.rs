use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::ChatbotDescriptor;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub nlu: NluConfig,
    pub dialog: DialogConfig,
    pub defaults: DefaultsConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
    pub graceful_shutdown_secs: u64,
}

#[derive(Clone, Debug)]
pub struct NluConfig {
    /// Request timeout for calls to the NLU service. The upstream HTTP client
    /// default is deliberately not relied on.
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct DialogConfig {
    /// Retry allowance granted on welcome and after every matched answer.
    pub initial_retries: u32,
}

/// Fallback caller identity used when the webhook payload omits (or mangles)
/// the `user`/`chatbot` fields.
#[derive(Clone, Debug)]
pub struct DefaultsConfig {
    pub user: String,
    pub chatbot: ChatbotDescriptor,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub log_level: Option<String>,
    pub initial_retries: Option<u32>,
    pub nlu_timeout_secs: Option<u64>,
    pub default_user: Option<String>,
    pub chatbot_host: Option<String>,
    pub chatbot_channel_id: Option<String>,
    pub chatbot_auth_header: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                port: 8080,
                graceful_shutdown_secs: 15,
            },
            nlu: NluConfig { timeout_secs: 30 },
            dialog: DialogConfig { initial_retries: 1 },
            defaults: DefaultsConfig {
                user: String::new(),
                chatbot: ChatbotDescriptor::new("", "", ""),
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("gangway.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
            }
        }

        if let Some(nlu) = patch.nlu {
            if let Some(timeout_secs) = nlu.timeout_secs {
                self.nlu.timeout_secs = timeout_secs;
            }
        }

        if let Some(dialog) = patch.dialog {
            if let Some(initial_retries) = dialog.initial_retries {
                self.dialog.initial_retries = initial_retries;
            }
        }

        if let Some(defaults) = patch.defaults {
            if let Some(user) = defaults.user {
                self.defaults.user = user;
            }
            if let Some(chatbot) = defaults.chatbot {
                if let Some(host) = chatbot.host {
                    self.defaults.chatbot.host = host;
                }
                if let Some(channel_id) = chatbot.channel_id {
                    self.defaults.chatbot.channel_id = channel_id;
                }
                if let Some(auth_header_value) = chatbot.auth_header {
                    self.defaults.chatbot.auth_header = auth_header_value.into();
                }
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("GANGWAY_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("GANGWAY_SERVER_PORT") {
            self.server.port = parse_u16("GANGWAY_SERVER_PORT", &value)?;
        }
        if let Some(value) = read_env("GANGWAY_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_u64("GANGWAY_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        if let Some(value) = read_env("GANGWAY_NLU_TIMEOUT_SECS") {
            self.nlu.timeout_secs = parse_u64("GANGWAY_NLU_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("GANGWAY_DIALOG_INITIAL_RETRIES") {
            self.dialog.initial_retries = parse_u32("GANGWAY_DIALOG_INITIAL_RETRIES", &value)?;
        }

        if let Some(value) = read_env("GANGWAY_DEFAULTS_USER") {
            self.defaults.user = value;
        }
        if let Some(value) = read_env("GANGWAY_DEFAULTS_CHATBOT_HOST") {
            self.defaults.chatbot.host = value;
        }
        if let Some(value) = read_env("GANGWAY_DEFAULTS_CHATBOT_CHANNEL_ID") {
            self.defaults.chatbot.channel_id = value;
        }
        if let Some(value) = read_env("GANGWAY_DEFAULTS_CHATBOT_AUTH_HEADER") {
            self.defaults.chatbot.auth_header = value.into();
        }

        let log_level = read_env("GANGWAY_LOGGING_LEVEL").or_else(|| read_env("GANGWAY_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("GANGWAY_LOGGING_FORMAT").or_else(|| read_env("GANGWAY_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(initial_retries) = overrides.initial_retries {
            self.dialog.initial_retries = initial_retries;
        }
        if let Some(nlu_timeout_secs) = overrides.nlu_timeout_secs {
            self.nlu.timeout_secs = nlu_timeout_secs;
        }
        if let Some(default_user) = overrides.default_user {
            self.defaults.user = default_user;
        }
        if let Some(chatbot_host) = overrides.chatbot_host {
            self.defaults.chatbot.host = chatbot_host;
        }
        if let Some(chatbot_channel_id) = overrides.chatbot_channel_id {
            self.defaults.chatbot.channel_id = chatbot_channel_id;
        }
        if let Some(chatbot_auth_header) = overrides.chatbot_auth_header {
            self.defaults.chatbot.auth_header = chatbot_auth_header.into();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_server(&self.server)?;
        validate_nlu(&self.nlu)?;
        validate_defaults(&self.defaults)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("gangway.toml"), PathBuf::from("config/gangway.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.bind_address.trim().is_empty() {
        return Err(ConfigError::Validation("server.bind_address must not be empty".to_string()));
    }

    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
        ));
    }

    Ok(())
}

fn validate_nlu(nlu: &NluConfig) -> Result<(), ConfigError> {
    if nlu.timeout_secs == 0 || nlu.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "nlu.timeout_secs must be in range 1..=300".to_string(),
        ));
    }

    Ok(())
}

fn validate_defaults(defaults: &DefaultsConfig) -> Result<(), ConfigError> {
    if defaults.user.trim().is_empty() {
        return Err(ConfigError::Validation(
            "defaults.user is required; it is the caller identity used when the webhook payload \
             omits `user`"
                .to_string(),
        ));
    }

    let host = defaults.chatbot.host.trim();
    if host.is_empty() {
        return Err(ConfigError::Validation(
            "defaults.chatbot.host is required; it is the NLU bot instance used when the webhook \
             payload omits `chatbot`"
                .to_string(),
        ));
    }
    if host.starts_with("http://") || host.starts_with("https://") {
        return Err(ConfigError::Validation(
            "defaults.chatbot.host must be a bare host name, not a URL".to_string(),
        ));
    }

    if defaults.chatbot.channel_id.trim().is_empty() {
        return Err(ConfigError::Validation(
            "defaults.chatbot.channel_id is required".to_string(),
        ));
    }

    use secrecy::ExposeSecret;
    if defaults.chatbot.auth_header.expose_secret().trim().is_empty() {
        return Err(ConfigError::Validation(
            "defaults.chatbot.auth_header is required; it is sent verbatim as the Authorization \
             header on NLU calls"
                .to_string(),
        ));
    }

    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    server: Option<ServerPatch>,
    nlu: Option<NluPatch>,
    dialog: Option<DialogPatch>,
    defaults: Option<DefaultsPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct NluPatch {
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct DialogPatch {
    initial_retries: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct DefaultsPatch {
    user: Option<String>,
    chatbot: Option<ChatbotPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct ChatbotPatch {
    host: Option<String>,
    channel_id: Option<String>,
    auth_header: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
