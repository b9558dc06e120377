use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Browser(#[from] partdesk_browser::BrowserError),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("resolver returned HTTP {status}: {body}")]
    ResolverStatus { status: u16, body: String },

    #[error("invalid setting {key}: {reason}")]
    InvalidSetting { key: String, reason: String },

    #[error("browser session is not ready: {0}")]
    NotReady(String),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn invalid_setting(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidSetting {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl partdesk_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

partdesk_common::impl_context!();
