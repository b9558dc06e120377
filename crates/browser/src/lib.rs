//! Chromium over CDP for driving the messaging web client.
//!
//! One persistent-profile session per process, a [`PageDriver`] for raw
//! input, and [`selectors::resolve`] for prioritized element lookup.

pub mod detect;
pub mod driver;
pub mod error;
pub mod selectors;
pub mod session;
pub mod types;

pub use {
    detect::{DetectionResult, DetectionSource, detect_browser, install_instructions},
    driver::PageDriver,
    error::BrowserError,
    selectors::{ElementRef, Pick},
    session::BrowserSession,
    types::{BrowserConfig, Key, Modifiers, Rect},
};
