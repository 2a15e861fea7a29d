//! Error handling: the fetch-pipeline taxonomy plus context wrappers for
//! grammers errors.

use anyhow::{Context, Result};
use thiserror::Error;

/// Failures of a single post fetch. Every variant maps to one short reply to
/// the requester; nothing here is allowed to escape a handler.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The text is not a Telegram post link in a shape we understand.
    #[error("invalid post link: {0}")]
    InvalidLink(String),

    /// The post exists but the user session cannot see it (or it does not
    /// exist at all; Telegram does not tell us which).
    #[error("could not fetch the post; make sure the user session has access to the chat")]
    Unavailable,

    /// Download or re-upload failed mid-transfer.
    #[error("transfer failed: {0}")]
    Transfer(String),

    /// The task was cancelled via /killall or shutdown. Not reported to the
    /// requester as an error.
    #[error("cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Extension trait to add Telegram-specific context to errors.
pub trait TgErrorContext<T> {
    /// Add context for authorization check.
    fn context_auth_check(self) -> Result<T>;

    /// Add context for bot-token sign-in.
    fn context_bot_sign_in(self) -> Result<T>;

    /// Add context for replying to the requesting chat.
    fn context_reply(self) -> Result<T>;

    /// Add context for uploading a local artifact.
    fn context_upload(self, path: &str) -> Result<T>;
}

impl<T, E: std::error::Error + Send + Sync + 'static> TgErrorContext<T>
    for std::result::Result<T, E>
{
    fn context_auth_check(self) -> Result<T> {
        self.context("Failed to check authorization status")
    }

    fn context_bot_sign_in(self) -> Result<T> {
        self.context("Bot sign-in failed. Check BOT_TOKEN and API credentials.")
    }

    fn context_reply(self) -> Result<T> {
        self.context("Failed to send a reply to the requesting chat")
    }

    fn context_upload(self, path: &str) -> Result<T> {
        self.with_context(|| format!("Failed to upload file: {}", path))
    }
}
