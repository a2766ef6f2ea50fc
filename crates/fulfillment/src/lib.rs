//! Platform glue - fulfillment webhook handling for the conversational agent
//!
//! This crate turns inbound fulfillment webhooks into answers:
//! - **Wire model** (`request`) - webhook request/response payloads and the
//!   conversation-context records round-tripped through the platform
//! - **Intents** (`intents`) - finite intent dispatch plus the welcome and
//!   fallback handlers
//!
//! # Architecture
//!
//! ```text
//! Webhook POST → IntentRouter → WelcomeHandler ──→ NLU reset ─→ greeting
//!                     │
//!                     └────────→ FallbackHandler → NLU ask ──→ answer
//!                                      │
//!                                      └─ unmatched → retry context ──→ "please repeat"
//!                                                         │
//!                                                         └─ exhausted → hand-off event
//! ```
//!
//! The retry counter lives in the platform's context store: handlers read it
//! from the inbound request and write it back as an output context, so no
//! conversation state is held in this process.

pub mod intents;
pub mod request;

pub use intents::{
    Intent, IntentRouter, TurnContext, TurnOutcome, FALLBACK_INTENT, GREETING, HANDOFF_EVENT,
    HANDOFF_NOTICE, REPEAT_PROMPT, WELCOME_INTENT,
};
pub use request::{
    CallerPayload, DialogContext, EventTrigger, IntentRef, ResponseBuilder, WebhookRequest,
    WebhookResponse,
};
