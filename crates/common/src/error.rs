use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("alert delivery failed")]
    Delivery {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }

    #[must_use]
    pub fn delivery(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Delivery {
            source: Box::new(source),
        }
    }
}

impl FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message(message)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

// ── Shared context trait ────────────────────────────────────────────────────

/// Error types that can be built from a plain message string.
///
/// Implement it for a crate's error type and invoke [`impl_context!`] in
/// that crate's error module to get `.context()` / `.with_context()`.
pub trait FromMessage: Sized {
    fn from_message(message: String) -> Self;
}

/// Generate a crate-local `Context` trait for `Result` and `Option`.
///
/// The invoking module must define `Error: FromMessage` and
/// `type Result<T> = std::result::Result<T, Error>`.
///
/// ```ignore
/// // in crates/responder/src/error.rs
/// partdesk_common::impl_context!();
/// ```
#[macro_export]
macro_rules! impl_context {
    () => {
        pub trait Context<T> {
            fn context(self, context: impl Into<String>) -> Result<T>;
            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C;
        }

        impl<T, E: std::fmt::Display> Context<T> for std::result::Result<T, E> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                let ctx = context.into();
                self.map_err(|source| {
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.map_err(|source| {
                    let ctx = f().into();
                    <Error as $crate::FromMessage>::from_message(format!("{ctx}: {source}"))
                })
            }
        }

        impl<T> Context<T> for Option<T> {
            fn context(self, context: impl Into<String>) -> Result<T> {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(context.into()))
            }

            fn with_context<C, F>(self, f: F) -> Result<T>
            where
                C: Into<String>,
                F: FnOnce() -> C,
            {
                self.ok_or_else(|| <Error as $crate::FromMessage>::from_message(f().into()))
            }
        }
    };
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    mod scoped {
        use super::super::{Error, FromMessage};

        pub type Result<T> = std::result::Result<T, Error>;

        crate::impl_context!();

        pub fn parse(raw: &str) -> Result<u32> {
            raw.parse::<u32>().context("bad number")
        }

        pub fn first(items: &[u32]) -> Result<u32> {
            items.first().copied().with_context(|| "empty list")
        }

        #[allow(dead_code)]
        fn assert_from_message() -> Error {
            Error::from_message("x".into())
        }
    }

    #[test]
    fn context_prefixes_source_error() {
        let err = scoped::parse("abc").unwrap_err();
        assert!(err.to_string().starts_with("bad number: "));
    }

    #[test]
    fn option_context_uses_plain_message() {
        let err = scoped::first(&[]).unwrap_err();
        assert_eq!(err.to_string(), "empty list");
        assert_eq!(scoped::first(&[7]).unwrap(), 7);
    }

    #[test]
    fn delivery_error_keeps_source() {
        let io = std::io::Error::other("socket closed");
        let err = Error::delivery(io);
        assert_eq!(err.to_string(), "alert delivery failed");
        assert!(std::error::Error::source(&err).is_some());
    }
}
