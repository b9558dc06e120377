use std::path::{Path, PathBuf};

use {
    anyhow::{Result, bail},
    clap::Subcommand,
    partdesk_config::{Diagnostic, PartdeskConfig, Severity, env_subst::substitute_env},
    secrecy::{ExposeSecret, Secret},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration (secrets redacted).
    Show {
        /// Print as JSON instead of TOML.
        #[arg(long)]
        json: bool,
    },
    /// Print the path of the config file in use.
    Path,
    /// Validate the configuration file and report errors/warnings.
    Check {
        /// Show informational diagnostics in addition to errors and warnings.
        #[arg(long)]
        verbose: bool,
    },
    /// Write a config file with every default filled in.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

pub fn handle_config(action: ConfigAction, explicit: Option<&Path>) -> Result<()> {
    match action {
        ConfigAction::Show { json } => show(explicit, json),
        ConfigAction::Path => {
            println!("{}", config_path(explicit).display());
            Ok(())
        },
        ConfigAction::Check { verbose } => check(explicit, verbose),
        ConfigAction::Init { force } => init(&config_path(explicit), force),
    }
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const CYAN: &str = "\x1b[36m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

const REDACTED: &str = "[REDACTED]";

fn config_path(explicit: Option<&Path>) -> PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(partdesk_config::default_config_path)
}

fn redacted(mut config: PartdeskConfig) -> PartdeskConfig {
    if !config.telegram.token.expose_secret().is_empty() {
        config.telegram.token = Secret::new(REDACTED.into());
    }
    if config.resolver.api_key.is_some() {
        config.resolver.api_key = Some(Secret::new(REDACTED.into()));
    }
    config
}

fn show(explicit: Option<&Path>, json: bool) -> Result<()> {
    let config = match explicit {
        Some(path) => partdesk_config::load_config(path)?,
        None => partdesk_config::discover_and_load(),
    };
    let config = redacted(config);
    if json {
        println!("{}", serde_json::to_string_pretty(&config)?);
    } else {
        print!("{}", toml::to_string_pretty(&config)?);
    }
    Ok(())
}

/// Diagnostics for one config file, including parse failures.
fn diagnostics_for(path: &Path) -> Vec<Diagnostic> {
    let is_toml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_none_or(|e| e == "toml");
    if is_toml {
        return match std::fs::read_to_string(path) {
            Ok(raw) => partdesk_config::validate_toml_str(&substitute_env(&raw)),
            Err(e) => vec![read_error(path, e)],
        };
    }
    match partdesk_config::load_config(path) {
        Ok(config) => partdesk_config::validate(&config),
        Err(e) => vec![Diagnostic {
            severity: Severity::Error,
            category: "syntax",
            path: String::new(),
            message: e.to_string(),
        }],
    }
}

fn read_error(path: &Path, e: std::io::Error) -> Diagnostic {
    Diagnostic {
        severity: Severity::Error,
        category: "syntax",
        path: String::new(),
        message: format!("failed to read {}: {e}", path.display()),
    }
}

fn check(explicit: Option<&Path>, verbose: bool) -> Result<()> {
    let file = explicit
        .map(Path::to_path_buf)
        .or_else(partdesk_config::find_config_file);

    // Print which file we're checking
    let diagnostics = if let Some(ref path) = file {
        eprintln!("Checking {}\n", path.display());
        diagnostics_for(path)
    } else {
        eprintln!("No config file found; checking defaults.\n");
        partdesk_config::validate(&PartdeskConfig::default())
    };

    let mut shown = 0;
    for d in &diagnostics {
        if d.severity == Severity::Info && !verbose {
            continue;
        }

        let (color, label) = match d.severity {
            Severity::Error => (RED, "error"),
            Severity::Warning => (YELLOW, "warning"),
            Severity::Info => (CYAN, "info"),
        };

        if d.path.is_empty() {
            eprintln!("  {BOLD}{color}{label}{RESET} {}", d.message);
        } else {
            eprintln!("  {BOLD}{color}{label}{RESET} {}: {}", d.path, d.message);
        }
        shown += 1;
    }

    let count = |severity: Severity| {
        diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    if shown > 0 {
        eprintln!();
    }

    if errors == 0 && warnings == 0 {
        eprintln!("No issues found.");
    } else {
        eprintln!("{errors} error(s), {warnings} warning(s)");
    }

    if errors > 0 {
        std::process::exit(1);
    }

    Ok(())
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    partdesk_config::save_config(&PartdeskConfig::default(), path)?;
    println!("Wrote {}", path.display());
    Ok(())
}
