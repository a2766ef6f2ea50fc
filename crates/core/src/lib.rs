pub mod config;
pub mod context;
pub mod errors;
pub mod identity;

pub use config::{AppConfig, ConfigError, ConfigOverrides, DefaultsConfig, LoadOptions};
pub use context::{
    EscalationStep, RetryPolicy, CONTEXT_LIFESPAN, CONTEXT_NAME, PARAM_RETRIES_LEFT,
};
pub use errors::InterfaceError;
pub use identity::{
    parse_chatbot_field, resolve_identity, CallerIdentity, ChatbotDescriptor, ChatbotField,
    ResolvedIdentity,
};
