use std::sync::Arc;
use std::time::Instant;

use gangway_core::config::DefaultsConfig;
use gangway_core::context::{EscalationStep, RetryPolicy};
use gangway_core::identity::{parse_chatbot_field, resolve_identity, CallerIdentity};
use gangway_nlu::answer::is_unmatched;
use gangway_nlu::client::NluClient;
use tracing::{debug, info, warn};

use crate::request::{ResponseBuilder, WebhookRequest, WebhookResponse};

pub const WELCOME_INTENT: &str = "Default Welcome Intent";
pub const FALLBACK_INTENT: &str = "Default Fallback Intent";

pub const GREETING: &str = "Hi! I'm your virtual assistant. What can I do for you?";
pub const REPEAT_PROMPT: &str = "Could you please repeat that?";

pub const HANDOFF_EVENT: &str = "support_handoff";
/// The platform rejects a reply with no messages, so the hand-off event
/// always travels with a placeholder text.
pub const HANDOFF_NOTICE: &str = "Let me transfer you to a human agent.";

/// The finite set of intents this webhook fulfills. Anything else is left to
/// the platform's own response handling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Intent {
    Welcome,
    Fallback,
    Other(String),
}

impl Intent {
    pub fn from_display_name(name: &str) -> Self {
        match name {
            WELCOME_INTENT => Self::Welcome,
            FALLBACK_INTENT => Self::Fallback,
            other => Self::Other(other.to_owned()),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnContext {
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq)]
pub enum TurnOutcome {
    Responded(WebhookResponse),
    /// No handler claims the intent; the platform's default response applies.
    Unhandled,
}

/// Routes each webhook turn to exactly one handler.
pub struct IntentRouter<N> {
    welcome: WelcomeHandler<N>,
    fallback: FallbackHandler<N>,
}

impl<N: NluClient> IntentRouter<N> {
    pub fn new(nlu: Arc<N>, policy: RetryPolicy, defaults: DefaultsConfig) -> Self {
        Self {
            welcome: WelcomeHandler { nlu: nlu.clone(), policy, defaults: defaults.clone() },
            fallback: FallbackHandler { nlu, policy, defaults },
        }
    }

    pub async fn route(&self, request: &WebhookRequest, ctx: &TurnContext) -> TurnOutcome {
        match Intent::from_display_name(&request.intent.display_name) {
            Intent::Welcome => TurnOutcome::Responded(self.welcome.handle(request, ctx).await),
            Intent::Fallback => TurnOutcome::Responded(self.fallback.handle(request, ctx).await),
            Intent::Other(name) => {
                debug!(
                    event_name = "ingress.fulfillment.intent_unhandled",
                    correlation_id = %ctx.correlation_id,
                    intent = %name,
                    "no handler registered for intent; deferring to platform default"
                );
                TurnOutcome::Unhandled
            }
        }
    }
}

fn resolve_caller(
    request: &WebhookRequest,
    defaults: &DefaultsConfig,
    ctx: &TurnContext,
) -> CallerIdentity {
    let payload = request.payload.as_ref();
    let chatbot = parse_chatbot_field(payload.and_then(|payload| payload.chatbot.as_ref()));
    let resolved =
        resolve_identity(payload.and_then(|payload| payload.user.as_deref()), chatbot, defaults);

    if let Some(reason) = &resolved.chatbot_fallback {
        warn!(
            event_name = "ingress.fulfillment.chatbot_payload_malformed",
            correlation_id = %ctx.correlation_id,
            session = %request.session,
            reason = %reason,
            "chatbot payload could not be parsed; using configured defaults"
        );
    }

    resolved.identity
}

struct WelcomeHandler<N> {
    nlu: Arc<N>,
    policy: RetryPolicy,
    defaults: DefaultsConfig,
}

impl<N: NluClient> WelcomeHandler<N> {
    async fn handle(&self, request: &WebhookRequest, ctx: &TurnContext) -> WebhookResponse {
        let caller = resolve_caller(request, &self.defaults, ctx);

        // Drop whatever conversation the NLU service still holds for this
        // user before greeting. The reply is discarded even when the call
        // failed; the greeting goes out regardless.
        let _ = self.nlu.reset(&caller.chatbot, &caller.user).await;

        info!(
            event_name = "ingress.fulfillment.welcome",
            correlation_id = %ctx.correlation_id,
            session = %request.session,
            retries_reset_to = self.policy.initial_retries(),
            "welcome turn reset escalation and conversation state"
        );

        ResponseBuilder::new()
            .retry_context(self.policy.initial_retries())
            .message(GREETING)
            .build()
    }
}

struct FallbackHandler<N> {
    nlu: Arc<N>,
    policy: RetryPolicy,
    defaults: DefaultsConfig,
}

impl<N: NluClient> FallbackHandler<N> {
    async fn handle(&self, request: &WebhookRequest, ctx: &TurnContext) -> WebhookResponse {
        let caller = resolve_caller(request, &self.defaults, ctx);

        let started = Instant::now();
        let reply = self.nlu.ask(&request.query_text, &caller.chatbot, &caller.user).await;
        let unmatched = is_unmatched(&reply);

        info!(
            event_name = "ingress.fulfillment.nlu_answered",
            correlation_id = %ctx.correlation_id,
            session = %request.session,
            elapsed_ms = started.elapsed().as_millis() as u64,
            unmatched,
            "nlu round trip finished"
        );

        if !unmatched {
            // A resolved answer ends any escalation in progress.
            return ResponseBuilder::new()
                .retry_context(self.policy.initial_retries())
                .message(reply)
                .build();
        }

        match self.policy.assess(request.stored_retries()) {
            EscalationStep::HandOff => {
                info!(
                    event_name = "ingress.fulfillment.handoff",
                    correlation_id = %ctx.correlation_id,
                    session = %request.session,
                    "retry allowance exhausted; handing off to a human agent"
                );
                ResponseBuilder::new()
                    .followup_event(HANDOFF_EVENT)
                    .message(HANDOFF_NOTICE)
                    .build()
            }
            EscalationStep::Repeat { retries_left } => ResponseBuilder::new()
                .retry_context(retries_left)
                .message(REPEAT_PROMPT)
                .build(),
        }
    }
}
