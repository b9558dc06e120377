//! Configuration loading, validation, and env substitution.
//!
//! Config files: `partdesk.toml`, `partdesk.yaml`, or `partdesk.json`
//! Searched in `./` then `~/.config/partdesk/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{
        config_dir, data_dir, default_config_path, discover_and_load, find_config_file,
        load_config, save_config,
    },
    schema::{
        BrowserConfig, BusinessConfig, MIN_SCAN_INTERVAL_SECS, OpenStrategy, PartdeskConfig,
        ResolverConfig, ResponderConfig, TelegramConfig, clamp_interval,
    },
    validate::{Diagnostic, Severity, has_errors, parse_hhmm, validate, validate_toml_str},
};
