use async_trait::async_trait;
use thiserror::Error;

use crate::util::env::EnvErr;

pub mod extract;
pub mod gemini;

/// Seam over the text-completion backend, so workflows can run against a
/// scripted stand-in under test.
#[async_trait]
pub trait TextModel: Send + Sync {
    /// One stateless prompt-in, free-text-out exchange.
    async fn complete(&self, prompt: &str) -> AiResult<String>;
}

pub type AiResult<T> = core::result::Result<T, AiError>;

#[derive(Debug, Error)]
pub enum AiError {
    #[error("completion quota exhausted")]
    RateLimited,

    #[error("model '{0}' not found")]
    ModelNotFound(String),

    #[error("completion timed out after {0}s")]
    Timeout(u64),

    #[error("completion contained no text")]
    EmptyReply,

    #[error("reqwest error: {0}")]
    ReqwestError(#[from] reqwest::Error),

    #[error("while parsing environment vars: {0}")]
    EnvError(#[from] EnvErr),

    #[error("error during completion fetch ({status}): {body}")]
    FetchErr {
        status: http::StatusCode,
        body: String,
    },
}
