use gangway_core::context::{CONTEXT_LIFESPAN, CONTEXT_NAME, PARAM_RETRIES_LEFT};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Inbound fulfillment webhook payload: the matched intent, the raw user
/// utterance, the conversation contexts the platform carried over, and the
/// caller-identity side channel.
#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookRequest {
    pub session: String,
    #[serde(default)]
    pub query_text: String,
    pub intent: IntentRef,
    #[serde(default)]
    pub contexts: Vec<DialogContext>,
    #[serde(default)]
    pub payload: Option<CallerPayload>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IntentRef {
    pub display_name: String,
}

/// A named, lifespan-bounded key-value record attached to the conversation by
/// the host platform.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DialogContext {
    pub name: String,
    pub lifespan_count: u32,
    #[serde(default)]
    pub parameters: Map<String, Value>,
}

/// Custom payload fields the channel attaches to each request. Both are
/// optional; absent values fall back to configured defaults.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
pub struct CallerPayload {
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub chatbot: Option<Value>,
}

impl WebhookRequest {
    pub fn context(&self, name: &str) -> Option<&DialogContext> {
        self.contexts.iter().find(|context| context.name == name)
    }

    /// Remaining retry allowance stored on the conversation, if the retry
    /// context is present and carries a usable counter.
    pub fn stored_retries(&self) -> Option<u32> {
        self.context(CONTEXT_NAME)?.u32_param(PARAM_RETRIES_LEFT)
    }
}

impl DialogContext {
    /// The retry context as written back to the platform: counter set,
    /// lifespan refreshed to the constant.
    pub fn retry(retries_left: u32) -> Self {
        let mut parameters = Map::new();
        parameters.insert(PARAM_RETRIES_LEFT.to_owned(), Value::from(retries_left));
        Self { name: CONTEXT_NAME.to_owned(), lifespan_count: CONTEXT_LIFESPAN, parameters }
    }

    pub fn u32_param(&self, key: &str) -> Option<u32> {
        let value = self.parameters.get(key)?;
        if let Some(number) = value.as_u64() {
            return u32::try_from(number).ok();
        }
        // Some channels serialize context numbers as floats.
        value.as_f64().filter(|number| number.fract() == 0.0 && *number >= 0.0).map(|n| n as u32)
    }
}

/// Outbound webhook reply: response texts, an optional followup event, and
/// the contexts to persist. The platform treats an empty message list as an
/// error, so every handled turn attaches at least one message.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub messages: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub followup_event: Option<EventTrigger>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub output_contexts: Vec<DialogContext>,
}

#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
pub struct EventTrigger {
    pub name: String,
}

#[derive(Debug, Default)]
pub struct ResponseBuilder {
    response: WebhookResponse,
}

impl ResponseBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, text: impl Into<String>) -> Self {
        self.response.messages.push(text.into());
        self
    }

    pub fn followup_event(mut self, name: impl Into<String>) -> Self {
        self.response.followup_event = Some(EventTrigger { name: name.into() });
        self
    }

    pub fn retry_context(mut self, retries_left: u32) -> Self {
        self.response.output_contexts.push(DialogContext::retry(retries_left));
        self
    }

    pub fn build(self) -> WebhookResponse {
        self.response
    }
}

#[cfg(test)]
mod tests {
    use gangway_core::context::{CONTEXT_LIFESPAN, CONTEXT_NAME, PARAM_RETRIES_LEFT};
    use serde_json::{json, Value};

    use super::{DialogContext, ResponseBuilder, WebhookRequest};

    #[test]
    fn request_decodes_the_platform_payload() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "session": "conv-42",
            "queryText": "where is my parcel",
            "intent": { "displayName": "Default Fallback Intent" },
            "contexts": [
                {
                    "name": "unknown_utterance",
                    "lifespanCount": 2,
                    "parameters": { "retries_left": 1 }
                }
            ],
            "payload": {
                "user": "caller-7",
                "chatbot": { "host": "bot.example.com", "channel_id": "web", "auth_header": "Bearer x" }
            }
        }))
        .expect("request should decode");

        assert_eq!(request.session, "conv-42");
        assert_eq!(request.query_text, "where is my parcel");
        assert_eq!(request.intent.display_name, "Default Fallback Intent");
        assert_eq!(request.stored_retries(), Some(1));
        assert_eq!(request.payload.as_ref().and_then(|p| p.user.as_deref()), Some("caller-7"));
    }

    #[test]
    fn minimal_request_decodes_without_optional_sections() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "session": "conv-1",
            "intent": { "displayName": "Default Welcome Intent" }
        }))
        .expect("minimal request should decode");

        assert!(request.contexts.is_empty());
        assert!(request.payload.is_none());
        assert_eq!(request.stored_retries(), None);
    }

    #[test]
    fn stored_retries_ignores_unusable_counters() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "session": "conv-2",
            "intent": { "displayName": "Default Fallback Intent" },
            "contexts": [
                {
                    "name": "unknown_utterance",
                    "lifespanCount": 2,
                    "parameters": { "retries_left": "one" }
                }
            ]
        }))
        .expect("request should decode");

        assert_eq!(request.stored_retries(), None);
    }

    #[test]
    fn float_shaped_counters_are_accepted() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "session": "conv-3",
            "intent": { "displayName": "Default Fallback Intent" },
            "contexts": [
                {
                    "name": "unknown_utterance",
                    "lifespanCount": 1,
                    "parameters": { "retries_left": 1.0 }
                }
            ]
        }))
        .expect("request should decode");

        assert_eq!(request.stored_retries(), Some(1));
    }

    #[test]
    fn retry_context_writer_refreshes_the_lifespan() {
        let context = DialogContext::retry(0);

        assert_eq!(context.name, CONTEXT_NAME);
        assert_eq!(context.lifespan_count, CONTEXT_LIFESPAN);
        assert_eq!(context.u32_param(PARAM_RETRIES_LEFT), Some(0));
    }

    #[test]
    fn response_omits_empty_sections_on_the_wire() {
        let response = ResponseBuilder::new().message("hello").build();
        let value = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(value, json!({ "messages": ["hello"] }));
    }

    #[test]
    fn handoff_response_serializes_the_followup_event() {
        let response =
            ResponseBuilder::new().followup_event("support_handoff").message("placeholder").build();
        let value = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(value["followupEvent"], json!({ "name": "support_handoff" }));
        assert_eq!(value["messages"], json!(["placeholder"]));
        assert_eq!(value.get("outputContexts"), None::<&Value>);
    }

    #[test]
    fn retry_context_round_trips_through_serialization() {
        let response = ResponseBuilder::new().message("again?").retry_context(1).build();
        let value = serde_json::to_value(&response).expect("response should serialize");

        assert_eq!(
            value["outputContexts"],
            json!([{
                "name": "unknown_utterance",
                "lifespanCount": 2,
                "parameters": { "retries_left": 1 }
            }])
        );
    }
}
