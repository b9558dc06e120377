//! Configuration validation.
//!
//! Parses a config string and reports syntax errors, type errors, and
//! semantic problems (bad clock times, unknown timezones, unusable URLs).

use chrono::NaiveTime;

use crate::schema::{MIN_SCAN_INTERVAL_SECS, PartdeskConfig};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Category: "syntax", "type-error", "hours", "responder", "telegram", "resolver"
    pub category: &'static str,
    /// Dotted path, e.g. "business.work_start"
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(category: &'static str, path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            category,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warning(
        category: &'static str,
        path: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            category,
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Returns `true` if any diagnostic is an error.
#[must_use]
pub fn has_errors(diagnostics: &[Diagnostic]) -> bool {
    diagnostics.iter().any(|d| d.severity == Severity::Error)
}

/// Parse a `HH:MM` clock time. `24:00` is accepted as end of day.
pub fn parse_hhmm(s: &str) -> Option<NaiveTime> {
    let s = s.trim();
    if s == "24:00" {
        return NaiveTime::from_hms_opt(23, 59, 59);
    }
    NaiveTime::parse_from_str(s, "%H:%M").ok()
}

/// Validate a TOML string without file-system side effects.
#[must_use]
pub fn validate_toml_str(toml_str: &str) -> Vec<Diagnostic> {
    if let Err(e) = toml::from_str::<toml::Value>(toml_str) {
        return vec![Diagnostic::error(
            "syntax",
            "",
            format!("TOML syntax error: {e}"),
        )];
    }
    match toml::from_str::<PartdeskConfig>(toml_str) {
        Ok(config) => validate(&config),
        Err(e) => vec![Diagnostic::error(
            "type-error",
            "",
            format!("type error: {e}"),
        )],
    }
}

/// Semantic checks on an already-parsed config.
#[must_use]
pub fn validate(config: &PartdeskConfig) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    check_business(config, &mut diagnostics);
    check_responder(config, &mut diagnostics);
    check_integrations(config, &mut diagnostics);
    diagnostics
}

fn check_business(config: &PartdeskConfig, diagnostics: &mut Vec<Diagnostic>) {
    let business = &config.business;

    if business.timezone.parse::<chrono_tz::Tz>().is_err() {
        diagnostics.push(Diagnostic::error(
            "hours",
            "business.timezone",
            format!("unknown timezone '{}'", business.timezone),
        ));
    }

    let mut check_time = |path: &str, value: &str| -> Option<NaiveTime> {
        let parsed = parse_hhmm(value);
        if parsed.is_none() {
            diagnostics.push(Diagnostic::error(
                "hours",
                path.to_string(),
                format!("'{value}' is not a HH:MM time"),
            ));
        }
        parsed
    };

    let start = check_time("business.work_start", &business.work_start);
    let end = check_time("business.work_end", &business.work_end);
    check_time("business.changeover", &business.changeover);
    let thu_start = business
        .thursday_start
        .as_deref()
        .and_then(|v| check_time("business.thursday_start", v));
    let thu_end = business
        .thursday_end
        .as_deref()
        .and_then(|v| check_time("business.thursday_end", v));
    let lunch_start = business
        .lunch_start
        .as_deref()
        .and_then(|v| check_time("business.lunch_start", v));
    let lunch_end = business
        .lunch_end
        .as_deref()
        .and_then(|v| check_time("business.lunch_end", v));

    if let (Some(s), Some(e)) = (start, end)
        && s >= e
    {
        diagnostics.push(Diagnostic::error(
            "hours",
            "business.work_end",
            "work_end must be later than work_start",
        ));
    }
    if let (Some(s), Some(e)) = (thu_start, thu_end)
        && s >= e
    {
        diagnostics.push(Diagnostic::error(
            "hours",
            "business.thursday_end",
            "thursday_end must be later than thursday_start",
        ));
    }
    if let (Some(s), Some(e)) = (lunch_start, lunch_end)
        && s >= e
    {
        diagnostics.push(Diagnostic::error(
            "hours",
            "business.lunch_end",
            "lunch_end must be later than lunch_start",
        ));
    }
    if business.lunch_start.is_some() != business.lunch_end.is_some() {
        diagnostics.push(Diagnostic::warning(
            "hours",
            "business.lunch_start",
            "only one lunch bound is set; no lunch break is applied",
        ));
    }
    if business.thursday_start.is_some() != business.thursday_end.is_some() {
        diagnostics.push(Diagnostic::warning(
            "hours",
            "business.thursday_start",
            "only one Thursday bound is set; Thursday is treated as closed",
        ));
    }
}

fn check_responder(config: &PartdeskConfig, diagnostics: &mut Vec<Diagnostic>) {
    let responder = &config.responder;

    if responder.scan_interval_secs < MIN_SCAN_INTERVAL_SECS {
        diagnostics.push(Diagnostic::warning(
            "responder",
            "responder.scan_interval_secs",
            format!(
                "{} is below the minimum; {MIN_SCAN_INTERVAL_SECS} is used instead",
                responder.scan_interval_secs
            ),
        ));
    }
    if responder.open_strategies.is_empty() {
        diagnostics.push(Diagnostic::error(
            "responder",
            "responder.open_strategies",
            "at least one open strategy is required",
        ));
    }
    if responder.send_pause_min_ms > responder.send_pause_max_ms {
        diagnostics.push(Diagnostic::error(
            "responder",
            "responder.send_pause_min_ms",
            "send_pause_min_ms is larger than send_pause_max_ms",
        ));
    }
    if responder.confirm_poll_ms == 0 {
        diagnostics.push(Diagnostic::error(
            "responder",
            "responder.confirm_poll_ms",
            "confirm_poll_ms must be positive",
        ));
    }
    if !responder.not_found_template.contains("{code}") {
        diagnostics.push(Diagnostic::warning(
            "responder",
            "responder.not_found_template",
            "template has no {code} placeholder; every not-found reply will be identical",
        ));
    }
    if responder.reopen_cooldown_secs > 0 && responder.cooldown_capacity == 0 {
        diagnostics.push(Diagnostic::warning(
            "responder",
            "responder.cooldown_capacity",
            "capacity is 0, so the reopen cooldown has no effect",
        ));
    }
}

fn check_integrations(config: &PartdeskConfig, diagnostics: &mut Vec<Diagnostic>) {
    if let Some(raw) = config.resolver.url.as_deref() {
        match url::Url::parse(raw) {
            Ok(u) if matches!(u.scheme(), "http" | "https") => {},
            Ok(u) => diagnostics.push(Diagnostic::error(
                "resolver",
                "resolver.url",
                format!("unsupported scheme '{}'", u.scheme()),
            )),
            Err(e) => diagnostics.push(Diagnostic::error(
                "resolver",
                "resolver.url",
                format!("invalid URL: {e}"),
            )),
        }
    } else {
        diagnostics.push(Diagnostic::warning(
            "resolver",
            "resolver.url",
            "no resolver configured; every code request gets the degraded reply",
        ));
    }

    if !config.telegram.is_configured() {
        diagnostics.push(Diagnostic {
            severity: Severity::Info,
            category: "telegram",
            path: "telegram".into(),
            message: "telegram alerts are off; escalations are only logged".into(),
        });
    }
}
