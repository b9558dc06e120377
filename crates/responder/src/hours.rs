//! Business hours, delivery wording, and the per-tick settings snapshot.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
    time::SystemTime,
};

use {
    chrono::{DateTime, Datelike, NaiveTime, Utc, Weekday},
    chrono_tz::Tz,
    partdesk_config::{BusinessConfig, parse_hhmm},
    serde::Serialize,
    serde_json::Value,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Read-only key lookup for settings owned outside the responder.
///
/// Keys: `enforce_hours`, `work_start`, `work_end`, `thursday_start`,
/// `thursday_end`, `lunch_start`, `lunch_end`, `friday_enabled`, `changeover`,
/// `delivery_before`, `delivery_after`, `timezone`. A missing key falls back to controller state.
pub trait SettingsSource: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
}

impl SettingsSource for HashMap<String, String> {
    fn get(&self, key: &str) -> Option<String> {
        HashMap::get(self, key).cloned()
    }
}

/// Overrides kept in a flat JSON object on disk, e.g.
/// `{"lunch_start": "13:00", "lunch_end": "14:00", "friday_enabled": true}`.
///
/// The file is re-read whenever its modification time changes, so edits
/// apply from the next tick. A missing file means no overrides; a file that
/// fails to parse keeps the last good values.
pub struct FileSettings {
    path: PathBuf,
    cache: Mutex<Cached>,
}

#[derive(Default)]
struct Cached {
    modified: Option<SystemTime>,
    values: HashMap<String, String>,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: Mutex::new(Cached::default()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn refreshed(&self) -> MutexGuard<'_, Cached> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        let modified = std::fs::metadata(&self.path)
            .and_then(|m| m.modified())
            .ok();
        if modified == cache.modified {
            return cache;
        }
        cache.modified = modified;
        if modified.is_none() {
            debug!(path = %self.path.display(), "settings file gone, dropping overrides");
            cache.values.clear();
            return cache;
        }
        match read_overrides(&self.path) {
            Ok(values) => {
                debug!(path = %self.path.display(), keys = values.len(), "settings file reloaded");
                cache.values = values;
            },
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "settings file unreadable, keeping previous values");
            },
        }
        cache
    }
}

impl SettingsSource for FileSettings {
    fn get(&self, key: &str) -> Option<String> {
        self.refreshed().values.get(key).cloned()
    }
}

/// Scalars become strings; `null` becomes empty, which clears optional windows.
fn read_overrides(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path)?;
    let object: HashMap<String, Value> = serde_json::from_str(&raw)?;
    Ok(object
        .into_iter()
        .filter_map(|(key, value)| {
            let text = match value {
                Value::String(s) => s,
                Value::Bool(b) => b.to_string(),
                Value::Number(n) => n.to_string(),
                Value::Null => String::new(),
                Value::Array(_) | Value::Object(_) => return None,
            };
            Some((key, text))
        })
        .collect())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Window {
    start: NaiveTime,
    end: NaiveTime,
}

impl Window {
    fn contains(&self, t: NaiveTime) -> bool {
        self.start <= t && t < self.end
    }
}

/// Parsed business-hours rules.
#[derive(Debug, Clone)]
pub struct BusinessHours {
    tz: Tz,
    enforce: bool,
    weekday: Window,
    thursday: Option<Window>,
    lunch: Option<Window>,
    friday_enabled: bool,
    changeover: NaiveTime,
    delivery_before: String,
    delivery_after: String,
}

fn time(key: &str, value: &str) -> Result<NaiveTime> {
    parse_hhmm(value).ok_or_else(|| Error::invalid_setting(key, format!("'{value}' is not HH:MM")))
}

impl BusinessHours {
    pub fn from_config(cfg: &BusinessConfig) -> Result<Self> {
        let tz = cfg
            .timezone
            .parse::<Tz>()
            .map_err(|_| Error::invalid_setting("timezone", cfg.timezone.clone()))?;
        let thursday = match (&cfg.thursday_start, &cfg.thursday_end) {
            (Some(s), Some(e)) => Some(Window {
                start: time("thursday_start", s)?,
                end: time("thursday_end", e)?,
            }),
            _ => None,
        };
        let lunch = match (&cfg.lunch_start, &cfg.lunch_end) {
            (Some(s), Some(e)) => Some(Window {
                start: time("lunch_start", s)?,
                end: time("lunch_end", e)?,
            }),
            _ => None,
        };
        Ok(Self {
            tz,
            enforce: cfg.enforce_hours,
            weekday: Window {
                start: time("work_start", &cfg.work_start)?,
                end: time("work_end", &cfg.work_end)?,
            },
            thursday,
            lunch,
            friday_enabled: cfg.friday_enabled,
            changeover: time("changeover", &cfg.changeover)?,
            delivery_before: cfg.delivery_before.clone(),
            delivery_after: cfg.delivery_after.clone(),
        })
    }

    /// Whether the loop may process conversations at `now`.
    pub fn is_open(&self, now: DateTime<Utc>) -> bool {
        if !self.enforce {
            return true;
        }
        let local = now.with_timezone(&self.tz);
        if self.lunch.is_some_and(|l| l.contains(local.time())) {
            return false;
        }
        let window = match local.weekday() {
            Weekday::Thu => self.thursday,
            Weekday::Fri if !self.friday_enabled => None,
            _ => Some(self.weekday),
        };
        window.is_some_and(|w| w.contains(local.time()))
    }

    /// Delivery wording for replies composed at `now`.
    pub fn delivery_text(&self, now: DateTime<Utc>) -> &str {
        if now.with_timezone(&self.tz).time() < self.changeover {
            &self.delivery_before
        } else {
            &self.delivery_after
        }
    }
}

/// Settings consulted for one tick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickSettings {
    pub open: bool,
    pub delivery_text: String,
}

impl TickSettings {
    /// Merge `source` over `base` and evaluate at `now`.
    ///
    /// An override that does not parse is ignored with a warning.
    pub fn build(
        base: &BusinessConfig,
        source: Option<&dyn SettingsSource>,
        now: DateTime<Utc>,
    ) -> Self {
        let merged = source.map_or_else(|| base.clone(), |src| apply_overrides(base, src));
        let hours = BusinessHours::from_config(&merged).or_else(|e| {
            warn!(error = %e, "ignoring business-hours overrides");
            BusinessHours::from_config(base)
        });
        match hours {
            Ok(hours) => Self {
                open: hours.is_open(now),
                delivery_text: hours.delivery_text(now).to_string(),
            },
            Err(e) => {
                warn!(error = %e, "business hours misconfigured, treating as always open");
                Self {
                    open: true,
                    delivery_text: base.delivery_before.clone(),
                }
            },
        }
    }
}

fn apply_overrides(base: &BusinessConfig, src: &dyn SettingsSource) -> BusinessConfig {
    let mut cfg = base.clone();
    let text = |key: &str, slot: &mut String| {
        if let Some(v) = src.get(key) {
            *slot = v;
        }
    };
    text("timezone", &mut cfg.timezone);
    text("work_start", &mut cfg.work_start);
    text("work_end", &mut cfg.work_end);
    text("changeover", &mut cfg.changeover);
    text("delivery_before", &mut cfg.delivery_before);
    text("delivery_after", &mut cfg.delivery_after);
    if let Some(v) = src.get("thursday_start") {
        cfg.thursday_start = non_empty(v);
    }
    if let Some(v) = src.get("thursday_end") {
        cfg.thursday_end = non_empty(v);
    }
    if let Some(v) = src.get("lunch_start") {
        cfg.lunch_start = non_empty(v);
    }
    if let Some(v) = src.get("lunch_end") {
        cfg.lunch_end = non_empty(v);
    }
    if let Some(v) = src.get("friday_enabled").and_then(|v| parse_flag(&v)) {
        cfg.friday_enabled = v;
    }
    if let Some(v) = src.get("enforce_hours").and_then(|v| parse_flag(&v)) {
        cfg.enforce_hours = v;
    }
    cfg
}

fn non_empty(v: String) -> Option<String> {
    (!v.trim().is_empty()).then_some(v)
}

fn parse_flag(v: &str) -> Option<bool> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
