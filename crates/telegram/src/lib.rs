//! Admin alerts over the Telegram Bot API.
//!
//! [`TelegramNotifier`] implements [`partdesk_common::AdminNotifier`]:
//! alerts are rendered as HTML and sent to one configured chat, waiting out
//! Telegram rate limits a bounded number of times.

pub mod error;
pub mod notifier;

pub use {
    error::{Error, Result},
    notifier::TelegramNotifier,
};
