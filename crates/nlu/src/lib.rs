//! NLU Forwarder - outbound bridge to the natural-language-understanding service
//!
//! This crate owns everything about talking to the NLU backend:
//! - **Client** (`client`) - the `NluClient` seam and its `reqwest` implementation
//! - **Answers** (`answer`) - reply-shape heuristics (failure marker, partial-match joining)
//!
//! # Contract
//!
//! `ask` never fails. A transport or decode error is logged with diagnostic
//! detail and rendered as the canned failure reply, which downstream handlers
//! classify as an unmatched turn. There are no automatic retries; retrying is
//! the escalation policy's job, one user turn at a time.

pub mod answer;
pub mod client;

pub use answer::{
    is_unmatched, render_reply, Answer, NluReply, ANSWER_SEPARATOR, FAILURE_MARKER, FAILURE_REPLY,
    PARTIAL_MARKER,
};
pub use client::{HttpNluClient, NluClient, NluError, RESET_UTTERANCE};
