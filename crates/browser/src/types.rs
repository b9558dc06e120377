//! Session options and input primitives.

use std::{ops::BitOr, path::PathBuf, time::Duration};

use serde::{Deserialize, Serialize};

use crate::error::BrowserError;

/// Options for launching the single browser session.
#[derive(Debug, Clone)]
pub struct BrowserConfig {
    /// Persistent profile directory (cookies, local storage, login).
    pub profile_dir: PathBuf,
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    pub headless: bool,
    /// Pause inserted after every input action.
    pub slow_mo: Duration,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// Page opened right after launch.
    pub start_url: String,
    pub navigation_timeout: Duration,
    pub user_agent: Option<String>,
    pub chrome_args: Vec<String>,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self::from(&partdesk_config::BrowserConfig::default())
    }
}

impl From<&partdesk_config::BrowserConfig> for BrowserConfig {
    fn from(cfg: &partdesk_config::BrowserConfig) -> Self {
        let profile_dir = cfg.profile_dir.clone().unwrap_or_else(default_profile_dir);
        Self {
            profile_dir,
            chrome_path: cfg.chrome_path.clone(),
            headless: cfg.headless,
            slow_mo: Duration::from_millis(cfg.slow_mo_ms),
            viewport_width: cfg.viewport_width,
            viewport_height: cfg.viewport_height,
            start_url: cfg.start_url.clone(),
            navigation_timeout: Duration::from_millis(cfg.navigation_timeout_ms),
            user_agent: cfg.user_agent.clone(),
            chrome_args: cfg.chrome_args.clone(),
        }
    }
}

fn default_profile_dir() -> PathBuf {
    partdesk_config::data_dir()
        .map(|d| d.join("profile"))
        .unwrap_or_else(|| PathBuf::from(".partdesk-profile"))
}

/// Validate the start URL before navigation.
pub fn validate_url(url: &str) -> Result<(), BrowserError> {
    if url.is_empty() {
        return Err(BrowserError::InvalidAction("URL cannot be empty".into()));
    }
    let parsed = url::Url::parse(url)
        .map_err(|e| BrowserError::InvalidAction(format!("invalid URL '{url}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(()),
        scheme => Err(BrowserError::InvalidAction(format!(
            "unsupported URL scheme '{scheme}', only http/https allowed"
        ))),
    }
}

/// Element bounding box in CSS pixels, relative to the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn center(&self) -> (f64, f64) {
        (self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// CDP key-event modifier mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Modifiers(i64);

impl Modifiers {
    pub const ALT: Self = Self(1);
    pub const CTRL: Self = Self(2);
    pub const META: Self = Self(4);
    pub const NONE: Self = Self(0);
    pub const SHIFT: Self = Self(8);

    pub fn bits(self) -> i64 {
        self.0
    }
}

impl BitOr for Modifiers {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// A key understood by [`crate::PageDriver::press_key`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    Backspace,
    /// A letter or digit key.
    Char(char),
}

impl Key {
    /// DOM `key` value.
    pub fn key(self) -> String {
        match self {
            Self::Enter => "Enter".into(),
            Self::Escape => "Escape".into(),
            Self::Backspace => "Backspace".into(),
            Self::Char(c) => c.to_string(),
        }
    }

    /// DOM `code` value (physical key).
    pub fn code(self) -> String {
        match self {
            Self::Enter | Self::Escape | Self::Backspace => self.key(),
            Self::Char(c) if c.is_ascii_digit() => format!("Digit{c}"),
            Self::Char(c) => format!("Key{}", c.to_ascii_uppercase()),
        }
    }

    pub fn virtual_key_code(self) -> i64 {
        match self {
            Self::Enter => 13,
            Self::Escape => 27,
            Self::Backspace => 8,
            Self::Char(c) => i64::from(u32::from(c.to_ascii_uppercase())),
        }
    }

    /// Text produced by the key when no command modifier is held.
    pub fn text(self, modifiers: Modifiers) -> Option<String> {
        let command = modifiers.bits() & (Modifiers::CTRL.bits() | Modifiers::META.bits()) != 0;
        match self {
            _ if command => None,
            Self::Enter => Some("\r".into()),
            Self::Char(c) => Some(c.to_string()),
            Self::Escape | Self::Backspace => None,
        }
    }
}
