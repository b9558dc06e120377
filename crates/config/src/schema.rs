//! Config schema types (browser, responder loop, business hours, alerting, resolver).
use std::path::PathBuf;

use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

/// Smallest scan interval the responder accepts, in seconds.
pub const MIN_SCAN_INTERVAL_SECS: f64 = 2.0;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PartdeskConfig {
    pub browser: BrowserConfig,
    pub responder: ResponderConfig,
    pub business: BusinessConfig,
    pub telegram: TelegramConfig,
    pub resolver: ResolverConfig,
}

/// Browser session settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    /// Persistent profile directory. Keeps the messaging login across restarts.
    /// Defaults to `<data dir>/profile` when unset.
    pub profile_dir: Option<PathBuf>,
    /// Path to Chrome/Chromium binary (auto-detected if not set).
    pub chrome_path: Option<String>,
    /// Run without a window. The first login needs a visible window for the QR scan.
    pub headless: bool,
    /// Pause after every input action, in milliseconds.
    pub slow_mo_ms: u64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    /// URL of the messaging web client.
    pub start_url: String,
    pub navigation_timeout_ms: u64,
    pub user_agent: Option<String>,
    /// Additional Chrome arguments.
    pub chrome_args: Vec<String>,
    /// How long to wait for the conversation list before looking for a login challenge.
    pub ready_timeout_secs: u64,
    /// How long to wait for the operator to complete the login challenge.
    pub auth_timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            profile_dir: None,
            chrome_path: None,
            headless: false,
            slow_mo_ms: 0,
            viewport_width: 1366,
            viewport_height: 900,
            start_url: "https://web.whatsapp.com/".into(),
            navigation_timeout_ms: 60_000,
            user_agent: None,
            chrome_args: Vec::new(),
            ready_timeout_secs: 120,
            auth_timeout_secs: 180,
        }
    }
}

/// Interaction used to open a conversation-list entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenStrategy {
    /// Synthetic pointer events dispatched on the element.
    DirectClick,
    /// `element.click()`, ignoring overlays.
    ForcedClick,
    DoubleClick,
    /// Real input events at the element's centre.
    CoordinateClick,
    /// Focus the entry and press Enter.
    KeyboardActivate,
}

impl OpenStrategy {
    /// Six attempts; the keyboard path gets a second try because focus is
    /// often stolen by a re-render during the first one.
    pub const DEFAULT_SEQUENCE: [OpenStrategy; 6] = [
        Self::DirectClick,
        Self::ForcedClick,
        Self::DoubleClick,
        Self::CoordinateClick,
        Self::KeyboardActivate,
        Self::KeyboardActivate,
    ];
}

impl std::fmt::Display for OpenStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::DirectClick => "direct_click",
            Self::ForcedClick => "forced_click",
            Self::DoubleClick => "double_click",
            Self::CoordinateClick => "coordinate_click",
            Self::KeyboardActivate => "keyboard_activate",
        };
        f.write_str(name)
    }
}

/// Unread-conversation loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Whether the loop may run at all.
    pub enabled: bool,
    /// Seconds between ticks, clamped to [`MIN_SCAN_INTERVAL_SECS`].
    pub scan_interval_secs: f64,
    /// Interaction strategies tried, in order, when opening a conversation.
    pub open_strategies: Vec<OpenStrategy>,
    /// Wait after each open attempt before checking whether it worked.
    pub open_settle_ms: u64,
    /// Wait before re-reading new messages, so multi-part messages are seen together.
    pub settle_read_ms: u64,
    /// How long to wait for the outgoing-bubble count to rise after a send.
    pub confirm_timeout_ms: u64,
    pub confirm_poll_ms: u64,
    /// Pause between consecutive replies (a random value in this range).
    pub send_pause_min_ms: u64,
    pub send_pause_max_ms: u64,
    /// Skip an escalated conversation for this long (0 disables).
    pub reopen_cooldown_secs: u64,
    /// Maximum number of conversations tracked on cooldown.
    pub cooldown_capacity: usize,
    /// Upper bound on a single resolver call.
    pub resolver_timeout_secs: u64,
    /// Maximum message nodes read from an open conversation.
    pub max_messages_scan: usize,
    /// Refuse to send when the open conversation title changed since it was read.
    pub ensure_title_on_send: bool,
    /// Sent once when the inventory resolver is unavailable.
    pub degraded_reply: String,
    /// Sent per code when the resolver returns nothing; `{code}` is replaced.
    pub not_found_template: String,
    /// Words that may accompany a code without making the message ambiguous.
    pub benign_words: Vec<String>,
    /// JSON object of business-hours overrides, re-read when it changes.
    pub settings_file: Option<PathBuf>,
}

impl Default for ResponderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            scan_interval_secs: 10.0,
            open_strategies: OpenStrategy::DEFAULT_SEQUENCE.to_vec(),
            open_settle_ms: 250,
            settle_read_ms: 3_000,
            confirm_timeout_ms: 3_000,
            confirm_poll_ms: 250,
            send_pause_min_ms: 250,
            send_pause_max_ms: 600,
            reopen_cooldown_secs: 210,
            cooldown_capacity: 512,
            resolver_timeout_secs: 15,
            max_messages_scan: 500,
            ensure_title_on_send: true,
            degraded_reply: DEFAULT_DEGRADED_REPLY.into(),
            not_found_template: DEFAULT_NOT_FOUND_TEMPLATE.into(),
            benign_words: default_benign_words(),
            settings_file: None,
        }
    }
}

impl ResponderConfig {
    /// Scan interval after clamping.
    pub fn effective_interval_secs(&self) -> f64 {
        clamp_interval(self.scan_interval_secs)
    }
}

/// Clamp a requested scan interval to the supported minimum.
pub fn clamp_interval(secs: f64) -> f64 {
    if secs.is_finite() {
        secs.max(MIN_SCAN_INTERVAL_SECS)
    } else {
        MIN_SCAN_INTERVAL_SECS
    }
}

pub const DEFAULT_DEGRADED_REPLY: &str = "Our inventory database is unavailable right now and \
                                          we are looking into it.\nThank you for your patience.";

pub const DEFAULT_NOT_FOUND_TEMPLATE: &str = "⚠️ {code} is currently not available.";

fn default_benign_words() -> Vec<String> {
    [
        "gen", "genuine", "asli", "oem", "original", "org", "fab", "factory", "new", "ok", "cn",
        "kr", "rh", "lh", "اصلی", "اورجینال", "فابریک", "جنیون", "اصل",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// Business hours and delivery wording used when composing replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BusinessConfig {
    /// IANA timezone the hours are expressed in.
    pub timezone: String,
    /// Skip ticks outside working hours.
    pub enforce_hours: bool,
    /// Saturday–Wednesday window, `HH:MM`.
    pub work_start: String,
    pub work_end: String,
    /// Thursday window; `None` closes Thursday.
    pub thursday_start: Option<String>,
    pub thursday_end: Option<String>,
    /// Lunch break closing every open day; both bounds or neither.
    pub lunch_start: Option<String>,
    pub lunch_end: Option<String>,
    /// Friday follows the weekday window when enabled, otherwise closed.
    pub friday_enabled: bool,
    /// Time of day at which delivery wording switches from `before` to `after`.
    pub changeover: String,
    pub delivery_before: String,
    pub delivery_after: String,
}

impl Default for BusinessConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Tehran".into(),
            enforce_hours: true,
            work_start: "08:00".into(),
            work_end: "18:00".into(),
            thursday_start: Some("08:00".into()),
            thursday_end: Some("12:30".into()),
            lunch_start: None,
            lunch_end: None,
            friday_enabled: false,
            changeover: "15:00".into(),
            delivery_before: "🚚 Pickup daily at 16:00 (Thursdays 12:30) at the market office".into(),
            delivery_after: "🛵 Direct dispatch from the warehouse (about 45-60 minutes)".into(),
        }
    }
}

/// Telegram bot used for admin alerts.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token from @BotFather. Empty disables Telegram alerts.
    #[serde(serialize_with = "serialize_secret")]
    pub token: Secret<String>,
    /// Chat that receives alerts.
    pub admin_chat_id: Option<i64>,
}

impl TelegramConfig {
    /// Both a token and a destination chat are configured.
    pub fn is_configured(&self) -> bool {
        !self.token.expose_secret().trim().is_empty() && self.admin_chat_id.is_some()
    }
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            token: Secret::new(String::new()),
            admin_chat_id: None,
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("token", &"[REDACTED]")
            .field("admin_chat_id", &self.admin_chat_id)
            .finish()
    }
}

/// Remote inventory resolver.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Endpoint that turns codes into reply texts. Unset means no resolver.
    pub url: Option<String>,
    /// Sent as a bearer token when set.
    #[serde(
        serialize_with = "serialize_optional_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
}

impl std::fmt::Debug for ResolverConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolverConfig")
            .field("url", &self.url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn serialize_secret<S: serde::Serializer>(
    secret: &Secret<String>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(secret.expose_secret())
}

fn serialize_optional_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn defaults_match_documented_values() {
        let cfg = PartdeskConfig::default();
        assert!(cfg.responder.enabled);
        assert_eq!(cfg.responder.scan_interval_secs, 10.0);
        assert_eq!(cfg.responder.open_strategies.len(), 6);
        assert_eq!(cfg.responder.confirm_timeout_ms, 3_000);
        assert_eq!(cfg.browser.start_url, "https://web.whatsapp.com/");
        assert!(!cfg.telegram.is_configured());
        assert!(cfg.resolver.url.is_none());
    }

    #[rstest]
    #[case(0.5, 2.0)]
    #[case(2.0, 2.0)]
    #[case(7.5, 7.5)]
    #[case(f64::NAN, 2.0)]
    #[case(-3.0, 2.0)]
    fn interval_is_clamped(#[case] requested: f64, #[case] expected: f64) {
        assert_eq!(clamp_interval(requested), expected);
    }

    #[test]
    fn deserialize_partial_toml() {
        let raw = r#"
            [responder]
            scan_interval_secs = 1.0
            open_strategies = ["keyboard_activate", "direct_click"]

            [business]
            friday_enabled = true
            thursday_start = "09:00"

            [telegram]
            token = "123:ABC"
            admin_chat_id = -100200
        "#;
        let cfg: PartdeskConfig = toml::from_str(raw).unwrap();
        assert_eq!(cfg.responder.effective_interval_secs(), 2.0);
        assert_eq!(
            cfg.responder.open_strategies,
            vec![OpenStrategy::KeyboardActivate, OpenStrategy::DirectClick]
        );
        assert!(cfg.business.friday_enabled);
        assert_eq!(cfg.business.thursday_start.as_deref(), Some("09:00"));
        assert_eq!(cfg.business.work_start, "08:00");
        assert!(cfg.telegram.is_configured());
        assert_eq!(cfg.telegram.token.expose_secret(), "123:ABC");
    }

    #[test]
    fn debug_output_redacts_secrets() {
        let cfg = TelegramConfig {
            token: Secret::new("very-secret".into()),
            admin_chat_id: Some(1),
        };
        let shown = format!("{cfg:?}");
        assert!(!shown.contains("very-secret"));
        assert!(shown.contains("REDACTED"));
    }

    #[test]
    fn serialize_roundtrip_keeps_token() {
        let mut cfg = PartdeskConfig::default();
        cfg.telegram.token = Secret::new("tok".into());
        cfg.resolver.api_key = Some(Secret::new("key".into()));
        let raw = toml::to_string_pretty(&cfg).unwrap();
        let back: PartdeskConfig = toml::from_str(&raw).unwrap();
        assert_eq!(back.telegram.token.expose_secret(), "tok");
        assert_eq!(
            back.resolver.api_key.as_ref().map(|k| k.expose_secret().as_str()),
            Some("key")
        );
    }
}
