//! `partdesk run`: the long-running responder.

use std::{path::PathBuf, sync::Arc, time::Duration};

use {
    anyhow::{Context, Result, bail},
    clap::Args,
    partdesk_common::{AdminNotifier, LogNotifier},
    partdesk_config::{PartdeskConfig, Severity},
    partdesk_responder::{
        ChromiumLauncher, CodeResolver, Controller, ControllerDeps, FileSettings, HttpResolver,
        SettingsSource,
    },
    partdesk_telegram::TelegramNotifier,
    tracing::{error, info, warn},
};

const STATUS_POLL: Duration = Duration::from_secs(1);

/// Overrides for values normally read from the config file.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Run the browser without a window.
    #[arg(long)]
    headless: bool,
    /// Seconds between scans of the conversation list.
    #[arg(long)]
    interval: Option<f64>,
    /// Browser profile directory holding the messaging login.
    #[arg(long)]
    profile_dir: Option<PathBuf>,
    /// Path to the Chrome/Chromium binary.
    #[arg(long, env = "CHROME_PATH")]
    chrome_path: Option<String>,
    /// Inventory resolver endpoint.
    #[arg(long, env = "PARTDESK_RESOLVER_URL")]
    resolver_url: Option<String>,
    /// JSON file of business-hours overrides, re-read while running.
    #[arg(long, env = "PARTDESK_SETTINGS_FILE")]
    settings_file: Option<PathBuf>,
}

fn apply_overrides(config: &mut PartdeskConfig, args: RunArgs) {
    if args.headless {
        config.browser.headless = true;
    }
    if let Some(secs) = args.interval {
        config.responder.scan_interval_secs = secs;
    }
    if let Some(dir) = args.profile_dir {
        config.browser.profile_dir = Some(dir);
    }
    if let Some(path) = args.chrome_path {
        config.browser.chrome_path = Some(path);
    }
    if let Some(url) = args.resolver_url {
        config.resolver.url = Some(url);
    }
    if let Some(path) = args.settings_file {
        config.responder.settings_file = Some(path);
    }
}

async fn build_notifier(config: &PartdeskConfig) -> Arc<dyn AdminNotifier> {
    let Some(telegram) = TelegramNotifier::from_config(&config.telegram) else {
        info!("telegram not configured, admin alerts go to the log");
        return Arc::new(LogNotifier);
    };
    match telegram.verify().await {
        Ok(username) => info!(bot = %username, "telegram alerts enabled"),
        Err(e) => warn!(error = %e, "telegram bot check failed, alerts may not arrive"),
    }
    Arc::new(telegram)
}

fn build_resolver(config: &PartdeskConfig) -> Result<Option<Arc<dyn CodeResolver>>> {
    let timeout = Duration::from_secs(config.responder.resolver_timeout_secs.max(1));
    match HttpResolver::from_config(&config.resolver, timeout)? {
        Some(resolver) => {
            info!(url = resolver.url(), "inventory resolver configured");
            Ok(Some(Arc::new(resolver)))
        },
        None => {
            warn!("no inventory resolver configured, every code gets the degraded reply");
            Ok(None)
        },
    }
}

fn build_settings(config: &PartdeskConfig) -> Option<Arc<dyn SettingsSource>> {
    let source = FileSettings::new(config.responder.settings_file.as_ref()?);
    info!(path = %source.path().display(), "business-hours overrides read from file");
    Some(Arc::new(source))
}

async fn wait_until_stopped(controller: &Controller) {
    while controller.status().running {
        tokio::time::sleep(STATUS_POLL).await;
    }
}

pub async fn handle_run(mut config: PartdeskConfig, args: RunArgs) -> Result<()> {
    apply_overrides(&mut config, args);

    let diagnostics = partdesk_config::validate(&config);
    for d in &diagnostics {
        match d.severity {
            Severity::Error => error!(path = %d.path, "{}", d.message),
            Severity::Warning => warn!(path = %d.path, "{}", d.message),
            Severity::Info => {},
        }
    }
    if partdesk_config::has_errors(&diagnostics) {
        bail!("configuration has errors, run `partdesk config check` for details");
    }

    let detection = partdesk_browser::detect_browser(config.browser.chrome_path.as_deref());
    if !detection.found() {
        bail!("{}", detection.install_hint);
    }

    let launcher = ChromiumLauncher::new(partdesk_browser::BrowserConfig::from(&config.browser));
    let deps = ControllerDeps {
        launcher: Arc::new(launcher),
        notifier: build_notifier(&config).await,
        resolver: build_resolver(&config)?,
        settings: build_settings(&config),
    };
    let controller = Controller::new(config, deps);

    if !controller.start().await {
        warn!("responder is disabled in the config, nothing to do");
        return Ok(());
    }

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("listening for Ctrl-C")?;
            info!("shutting down");
        },
        () = wait_until_stopped(&controller) => {
            warn!("responder loop stopped on its own");
        },
    }

    controller.stop().await;
    let status = controller.status();
    info!(ticks = status.ticks, "partdesk stopped");
    Ok(())
}
