//! Error types for talking to the mail API.

use reqwest::StatusCode;

/// Errors returned by a [`crate::mailbox::Mailbox`] implementation.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("Authentication failed: {status} ({body})")]
    Auth { status: StatusCode, body: String },

    #[error("Mail API request failed: {status} ({body})")]
    Api { status: StatusCode, body: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Message is missing the {0} header")]
    MissingHeader(&'static str),
}

impl MailError {
    /// Map a non-success response status into the right variant. A 401
    /// means the access token was refused which no later call in the
    /// same scan can recover from.
    pub fn from_status(status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED {
            MailError::Auth { status, body }
        } else {
            MailError::Api { status, body }
        }
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, MailError::Auth { .. })
    }
}

pub type Result<T> = std::result::Result<T, MailError>;
