//! Shared error plumbing and the admin alert contract used across partdesk crates.

pub mod alert;
pub mod error;

pub use {
    alert::{AdminAlert, AdminNotifier, LogNotifier, dispatch_alert},
    error::{Error, FromMessage, Result},
};
