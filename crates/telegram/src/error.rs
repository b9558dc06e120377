use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Telegram(#[from] teloxide::RequestError),

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
}

impl partdesk_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::message(message)
    }
}

impl From<Error> for partdesk_common::Error {
    fn from(err: Error) -> Self {
        partdesk_common::Error::delivery(err)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

partdesk_common::impl_context!();
