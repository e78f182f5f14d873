//! Provider-facing types and error definitions.

use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while invoking a provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Transport-level failure (connect, TLS, body read).
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider answered with a non-success status.
    #[error("provider returned {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered 2xx but the payload did not parse.
    #[error("malformed provider response: {0}")]
    Malformed(String),

    /// The provider answered but the completion text was empty.
    #[error("provider returned an empty completion")]
    EmptyCompletion,
}

/// Result type for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        ProviderError::Transport(sanitize(&e.to_string()))
    }
}

/// A single completion request, dialect-independent.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// System/instruction prompt, when the dialect supports one.
    pub system: Option<String>,

    /// User prompt.
    pub prompt: String,

    /// Model override; the provider's default model when `None`.
    pub model: Option<String>,

    pub max_tokens: u32,
    pub temperature: f32,
}

/// A completed provider response.
#[derive(Debug, Clone, Serialize)]
pub struct Completion {
    /// Completion text.
    pub text: String,

    /// Model that served the request.
    pub model: String,

    /// Provider that served the request.
    pub provider: String,
}

/// Truncate and scrub an upstream error message before it reaches logs or
/// results. Upstream bodies can echo request headers, including credentials.
pub fn sanitize(message: &str) -> String {
    const MAX_LEN: usize = 240;

    let mut scrubbed = String::with_capacity(message.len().min(MAX_LEN));
    for word in message.split_whitespace() {
        if !scrubbed.is_empty() {
            scrubbed.push(' ');
        }
        let lowered = word.to_ascii_lowercase();
        if lowered.starts_with("sk-")
            || lowered.starts_with("bearer")
            || lowered.contains("api_key=")
            || lowered.contains("key=")
        {
            scrubbed.push_str("[redacted]");
        } else {
            scrubbed.push_str(word);
        }
    }

    if scrubbed.len() > MAX_LEN {
        let mut end = MAX_LEN;
        while !scrubbed.is_char_boundary(end) {
            end -= 1;
        }
        scrubbed.truncate(end);
        scrubbed.push_str("...");
    }
    scrubbed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_redacts_keys() {
        let msg = "unauthorized: sk-abc123 rejected for key=xyz";
        let clean = sanitize(msg);
        assert!(!clean.contains("sk-abc123"));
        assert!(!clean.contains("key=xyz"));
        assert!(clean.contains("[redacted]"));
    }

    #[test]
    fn test_sanitize_truncates() {
        let msg = "x".repeat(1000);
        let clean = sanitize(&msg);
        assert!(clean.len() <= 244);
        assert!(clean.ends_with("..."));
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::Api {
            status: 429,
            message: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned 429: rate limited");
    }
}
