use std::time::{Duration, Instant};

use async_trait::async_trait;
use gangway_core::identity::ChatbotDescriptor;
use reqwest::header::AUTHORIZATION;
use secrecy::ExposeSecret;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::answer::{render_reply, NluReply, FAILURE_REPLY};

/// Sentinel utterance that makes the NLU service drop any conversation state
/// it holds for the user.
pub const RESET_UTTERANCE: &str = "exit";

#[derive(Debug, Error)]
pub enum NluError {
    #[error("nlu transport failed: {0}")]
    Transport(#[source] reqwest::Error),
    #[error("nlu reply decode failed: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Outbound seam to the NLU service. `ask` always yields a renderable reply;
/// failures are rendered, never raised, and never retried here.
#[async_trait]
pub trait NluClient: Send + Sync {
    async fn ask(&self, utterance: &str, chatbot: &ChatbotDescriptor, user: &str) -> String;

    /// Clear server-side conversation state for this user before a new
    /// conversation starts. The reply text is of no interest to callers.
    async fn reset(&self, chatbot: &ChatbotDescriptor, user: &str) -> String {
        self.ask(RESET_UTTERANCE, chatbot, user).await
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AskPayload<'a> {
    user_id: &'a str,
    channel_id: &'a str,
    text: &'a str,
}

/// `reqwest`-backed forwarder posting to `https://{host}/ivr/receive` with the
/// caller's `Authorization` header. The request timeout comes from
/// configuration; the client is shared and cheap to clone.
#[derive(Clone, Debug)]
pub struct HttpNluClient {
    http: reqwest::Client,
}

impl HttpNluClient {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }

    async fn exchange(
        &self,
        utterance: &str,
        chatbot: &ChatbotDescriptor,
        user: &str,
    ) -> Result<NluReply, NluError> {
        let url = format!("https://{host}/ivr/receive", host = chatbot.host);
        let payload =
            AskPayload { user_id: user, channel_id: &chatbot.channel_id, text: utterance };

        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, chatbot.auth_header.expose_secret())
            .json(&payload)
            .send()
            .await
            .map_err(NluError::Transport)?
            .error_for_status()
            .map_err(NluError::Transport)?;

        response.json::<NluReply>().await.map_err(NluError::Decode)
    }
}

#[async_trait]
impl NluClient for HttpNluClient {
    async fn ask(&self, utterance: &str, chatbot: &ChatbotDescriptor, user: &str) -> String {
        let started = Instant::now();

        match self.exchange(utterance, chatbot, user).await {
            Ok(reply) => {
                debug!(
                    event_name = "egress.nlu.reply_received",
                    host = %chatbot.host,
                    channel_id = %chatbot.channel_id,
                    answer_count = reply.answers.len(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "nlu reply received"
                );
                render_reply(&reply)
            }
            Err(error) => {
                warn!(
                    event_name = "egress.nlu.request_failed",
                    host = %chatbot.host,
                    channel_id = %chatbot.channel_id,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "nlu request failed; returning canned failure reply"
                );
                FAILURE_REPLY.to_owned()
            }
        }
    }
}
