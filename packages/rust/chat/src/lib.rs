//! Conversational-service boundary.
//!
//! This crate provides:
//! - [`ChatService`] — one prompt in, one completion out
//! - [`ChatClient`] — OpenAI-compatible chat-completions HTTP implementation
//! - [`complete_with_retry`] — bounded retry with exponential backoff and jitter

pub mod client;
pub mod retry;

use std::future::Future;
use std::time::Duration;

use rankpages_shared::Result;

pub use client::ChatClient;
pub use retry::{NoopRetryObserver, RetryObserver, RetryPolicy, complete_with_retry};

/// A single completion request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    /// Fully rendered prompt text.
    pub prompt: String,
    /// Model identifier understood by the service.
    pub model: String,
    /// Upper bound for this one attempt.
    pub timeout: Duration,
}

/// Something that turns a prompt into response text.
///
/// Implementations report transient failures as
/// [`RankPagesError::Service`](rankpages_shared::RankPagesError::Service);
/// those are the only errors [`complete_with_retry`] retries.
pub trait ChatService {
    fn complete(&self, request: &ChatRequest) -> impl Future<Output = Result<String>> + Send;
}
