use secrecy::SecretString;
use serde::Deserialize;
use serde_json::Value;

use crate::config::DefaultsConfig;

/// Descriptor of the bot instance an utterance is forwarded to. Immutable per
/// request; sourced from the webhook payload or from configured defaults.
#[derive(Clone, Debug)]
pub struct ChatbotDescriptor {
    pub host: String,
    pub channel_id: String,
    pub auth_header: SecretString,
}

impl ChatbotDescriptor {
    pub fn new(
        host: impl Into<String>,
        channel_id: impl Into<String>,
        auth_header: impl Into<String>,
    ) -> Self {
        let auth_header: String = auth_header.into();
        Self { host: host.into(), channel_id: channel_id.into(), auth_header: auth_header.into() }
    }
}

#[derive(Debug, Deserialize)]
struct RawChatbot {
    host: String,
    channel_id: String,
    auth_header: String,
}

impl From<RawChatbot> for ChatbotDescriptor {
    fn from(raw: RawChatbot) -> Self {
        Self::new(raw.host, raw.channel_id, raw.auth_header)
    }
}

/// Outcome of parsing the inbound `chatbot` payload field. Absence and
/// malformed input are distinct states so callers can default the former
/// silently and log the latter.
#[derive(Clone, Debug)]
pub enum ChatbotField {
    Absent,
    Parsed(ChatbotDescriptor),
    Malformed(String),
}

/// Parse the `chatbot` payload field. The platform delivers it either as a
/// JSON object or as a JSON-encoded string, depending on the channel.
pub fn parse_chatbot_field(value: Option<&Value>) -> ChatbotField {
    match value {
        None | Some(Value::Null) => ChatbotField::Absent,
        Some(Value::String(raw)) if raw.trim().is_empty() => ChatbotField::Absent,
        Some(Value::String(raw)) => match serde_json::from_str::<RawChatbot>(raw) {
            Ok(raw) => ChatbotField::Parsed(raw.into()),
            Err(error) => ChatbotField::Malformed(error.to_string()),
        },
        Some(value @ Value::Object(_)) => match RawChatbot::deserialize(value) {
            Ok(raw) => ChatbotField::Parsed(raw.into()),
            Err(error) => ChatbotField::Malformed(error.to_string()),
        },
        Some(_) => {
            ChatbotField::Malformed("expected an object or a JSON-encoded string".to_owned())
        }
    }
}

/// Who is speaking, and through which bot instance.
#[derive(Clone, Debug)]
pub struct CallerIdentity {
    pub user: String,
    pub chatbot: ChatbotDescriptor,
}

/// A resolved identity plus the reason the chatbot descriptor fell back to
/// defaults, when it did so because of malformed input.
#[derive(Clone, Debug)]
pub struct ResolvedIdentity {
    pub identity: CallerIdentity,
    pub chatbot_fallback: Option<String>,
}

/// Coalesce the payload-supplied identity with configured defaults. An absent
/// `user` or `chatbot` falls back silently; a malformed `chatbot` falls back
/// too, but the parse failure is surfaced for the caller to log.
pub fn resolve_identity(
    user: Option<&str>,
    chatbot: ChatbotField,
    defaults: &DefaultsConfig,
) -> ResolvedIdentity {
    let user = match user.map(str::trim) {
        Some(value) if !value.is_empty() => value.to_owned(),
        _ => defaults.user.clone(),
    };

    let (chatbot, chatbot_fallback) = match chatbot {
        ChatbotField::Parsed(descriptor) => (descriptor, None),
        ChatbotField::Absent => (defaults.chatbot.clone(), None),
        ChatbotField::Malformed(reason) => (defaults.chatbot.clone(), Some(reason)),
    };

    ResolvedIdentity { identity: CallerIdentity { user, chatbot }, chatbot_fallback }
}

#[cfg(test)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::{parse_chatbot_field, resolve_identity, ChatbotDescriptor, ChatbotField};
    use crate::config::DefaultsConfig;

    fn defaults() -> DefaultsConfig {
        DefaultsConfig {
            user: "fallback-user".to_owned(),
            chatbot: ChatbotDescriptor::new("bot.example.com", "web", "Bearer fallback"),
        }
    }

    #[test]
    fn object_payload_parses_into_a_descriptor() {
        let value = json!({
            "host": "bot.example.com",
            "channel_id": "whatsapp",
            "auth_header": "Bearer abc"
        });

        let ChatbotField::Parsed(descriptor) = parse_chatbot_field(Some(&value)) else {
            panic!("object payload should parse");
        };
        assert_eq!(descriptor.host, "bot.example.com");
        assert_eq!(descriptor.channel_id, "whatsapp");
        assert_eq!(descriptor.auth_header.expose_secret(), "Bearer abc");
    }

    #[test]
    fn json_encoded_string_payload_parses_into_a_descriptor() {
        let value = json!(
            r#"{"host":"bot.example.com","channel_id":"sms","auth_header":"Bearer xyz"}"#
        );

        let ChatbotField::Parsed(descriptor) = parse_chatbot_field(Some(&value)) else {
            panic!("string payload should parse");
        };
        assert_eq!(descriptor.channel_id, "sms");
    }

    #[test]
    fn missing_null_and_blank_fields_are_absent() {
        assert!(matches!(parse_chatbot_field(None), ChatbotField::Absent));
        assert!(matches!(parse_chatbot_field(Some(&serde_json::Value::Null)), ChatbotField::Absent));
        assert!(matches!(parse_chatbot_field(Some(&json!("  "))), ChatbotField::Absent));
    }

    #[test]
    fn broken_json_string_is_malformed_not_absent() {
        let value = json!("{host: not-json");
        assert!(matches!(parse_chatbot_field(Some(&value)), ChatbotField::Malformed(_)));
    }

    #[test]
    fn non_object_payload_is_malformed() {
        assert!(matches!(parse_chatbot_field(Some(&json!(42))), ChatbotField::Malformed(_)));
        assert!(matches!(parse_chatbot_field(Some(&json!([1, 2]))), ChatbotField::Malformed(_)));
    }

    #[test]
    fn absent_fields_resolve_to_defaults_without_a_fallback_reason() {
        let resolved = resolve_identity(None, ChatbotField::Absent, &defaults());

        assert_eq!(resolved.identity.user, "fallback-user");
        assert_eq!(resolved.identity.chatbot.host, "bot.example.com");
        assert!(resolved.chatbot_fallback.is_none());
    }

    #[test]
    fn blank_user_resolves_to_the_default_user() {
        let resolved = resolve_identity(Some("   "), ChatbotField::Absent, &defaults());
        assert_eq!(resolved.identity.user, "fallback-user");
    }

    #[test]
    fn malformed_chatbot_resolves_to_defaults_and_reports_the_reason() {
        let resolved = resolve_identity(
            Some("caller-7"),
            ChatbotField::Malformed("expected value at line 1".to_owned()),
            &defaults(),
        );

        assert_eq!(resolved.identity.user, "caller-7");
        assert_eq!(resolved.identity.chatbot.channel_id, "web");
        assert_eq!(resolved.chatbot_fallback.as_deref(), Some("expected value at line 1"));
    }

    #[test]
    fn auth_header_is_not_leaked_by_debug() {
        let descriptor = ChatbotDescriptor::new("bot.example.com", "web", "Bearer top-secret");
        let debug = format!("{descriptor:?}");
        assert!(!debug.contains("top-secret"));
    }
}
