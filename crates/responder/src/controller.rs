//! Owns the browser session and the background loop task.

use std::sync::{Arc, Mutex, MutexGuard};

use {
    chrono::{DateTime, Utc},
    partdesk_common::AdminNotifier,
    partdesk_config::{BusinessConfig, PartdeskConfig, clamp_interval},
    serde::Serialize,
    tokio::task::JoinHandle,
    tokio_util::sync::CancellationToken,
    tracing::{error, info, warn},
};

use crate::{
    bridge::CodeResolver,
    cycle::{Cycle, CycleOutcome},
    error::Result,
    hours::{BusinessHours, SettingsSource, TickSettings},
    ready::{Readiness, ReadyTimeouts, wait_until_ready},
    surface::{ChatSurface, SessionLauncher},
};

/// Collaborators the controller is built with.
#[derive(Clone)]
pub struct ControllerDeps {
    pub launcher: Arc<dyn SessionLauncher>,
    pub notifier: Arc<dyn AdminNotifier>,
    pub resolver: Option<Arc<dyn CodeResolver>>,
    pub settings: Option<Arc<dyn SettingsSource>>,
}

/// Point-in-time view of the controller.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerStatus {
    pub enabled: bool,
    pub running: bool,
    pub interval_secs: f64,
    pub business: BusinessConfig,
    pub ticks: u64,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_outcome: Option<CycleOutcome>,
}

struct State {
    enabled: bool,
    running: bool,
    interval_secs: f64,
    business: BusinessConfig,
    ticks: u64,
    last_tick_at: Option<DateTime<Utc>>,
    last_outcome: Option<CycleOutcome>,
}

struct LoopTask {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

struct Inner {
    config: PartdeskConfig,
    deps: ControllerDeps,
    state: Mutex<State>,
    task: tokio::sync::Mutex<Option<LoopTask>>,
}

impl Inner {
    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_running(&self, running: bool) {
        self.state().running = running;
    }

    fn tick_settings(&self, now: DateTime<Utc>) -> TickSettings {
        let business = self.state().business.clone();
        TickSettings::build(&business, self.deps.settings.as_deref(), now)
    }

    fn record(&self, outcome: CycleOutcome) {
        let mut state = self.state();
        state.ticks += 1;
        state.last_tick_at = Some(Utc::now());
        state.last_outcome = Some(outcome);
    }
}

/// Start, stop, and tune the unread-conversation loop.
///
/// At most one loop task (and so one browser session) exists at a time.
/// Every method is safe to call while the loop is running; changes take
/// effect at the next tick.
#[derive(Clone)]
pub struct Controller {
    inner: Arc<Inner>,
}

impl Controller {
    pub fn new(config: PartdeskConfig, deps: ControllerDeps) -> Self {
        let state = State {
            enabled: config.responder.enabled,
            running: false,
            interval_secs: config.responder.effective_interval_secs(),
            business: config.business.clone(),
            ticks: 0,
            last_tick_at: None,
            last_outcome: None,
        };
        Self {
            inner: Arc::new(Inner {
                config,
                deps,
                state: Mutex::new(state),
                task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    pub fn enable(&self) {
        self.inner.state().enabled = true;
        info!("responder enabled");
    }

    /// The running loop exits at its next tick boundary.
    pub fn disable(&self) {
        self.inner.state().enabled = false;
        info!("responder disabled");
    }

    /// Spawn the loop task. Returns `false` when disabled or already running.
    pub async fn start(&self) -> bool {
        if !self.inner.state().enabled {
            info!("responder disabled, not starting");
            return false;
        }
        let mut slot = self.inner.task.lock().await;
        if slot.as_ref().is_some_and(|t| !t.handle.is_finished()) {
            info!("responder loop already running");
            return false;
        }
        let cancel = CancellationToken::new();
        self.inner.set_running(true);
        let handle = tokio::spawn(run_loop(Arc::clone(&self.inner), cancel.clone()));
        *slot = Some(LoopTask { cancel, handle });
        info!("responder loop started");
        true
    }

    /// Cancel the loop, wait for it, and release the session. Idempotent.
    ///
    /// The task slot stays locked until `running` is cleared, so a
    /// concurrent `start` always lands after the stop completes.
    pub async fn stop(&self) {
        let mut slot = self.inner.task.lock().await;
        if let Some(task) = slot.take() {
            task.cancel.cancel();
            if let Err(e) = task.handle.await {
                warn!(error = %e, "responder loop ended abnormally");
            }
            info!("responder loop stopped");
        }
        self.inner.set_running(false);
    }

    pub async fn restart(&self) -> bool {
        self.stop().await;
        self.start().await
    }

    /// Set the scan interval, clamped to the minimum. Returns the value used.
    pub fn set_interval(&self, secs: f64) -> f64 {
        let secs = clamp_interval(secs);
        self.inner.state().interval_secs = secs;
        info!(interval_secs = secs, "scan interval updated");
        secs
    }

    /// Replace the business-hours rules after checking they parse.
    pub fn set_business_hours(&self, business: BusinessConfig) -> Result<()> {
        BusinessHours::from_config(&business)?;
        self.inner.state().business = business;
        info!("business hours updated");
        Ok(())
    }

    pub fn status(&self) -> ControllerStatus {
        let state = self.inner.state();
        ControllerStatus {
            enabled: state.enabled,
            running: state.running,
            interval_secs: state.interval_secs,
            business: state.business.clone(),
            ticks: state.ticks,
            last_tick_at: state.last_tick_at,
            last_outcome: state.last_outcome.clone(),
        }
    }
}

async fn run_loop(inner: Arc<Inner>, cancel: CancellationToken) {
    let launched = tokio::select! {
        _ = cancel.cancelled() => None,
        res = inner.deps.launcher.launch() => Some(res),
    };
    let surface = match launched {
        Some(Ok(surface)) => surface,
        Some(Err(e)) => {
            error!(error = %e, "session launch failed, loop stopped");
            inner.set_running(false);
            return;
        },
        None => {
            inner.set_running(false);
            return;
        },
    };

    drive(&inner, surface.as_ref(), &cancel).await;
    surface.close().await;
    inner.set_running(false);
}

async fn drive(inner: &Inner, surface: &dyn ChatSurface, cancel: &CancellationToken) {
    let timeouts = ReadyTimeouts::from(&inner.config.browser);
    let readiness = tokio::select! {
        _ = cancel.cancelled() => return,
        r = wait_until_ready(surface, &timeouts) => r,
    };
    if readiness == Readiness::TimedOut {
        error!("messaging client never became ready, loop stopped");
        return;
    }

    let mut cycle = Cycle::new(
        &inner.config.responder,
        inner.deps.resolver.clone(),
        Arc::clone(&inner.deps.notifier),
    );
    loop {
        if !inner.state().enabled {
            info!("responder disabled, leaving loop");
            break;
        }
        let tick = inner.tick_settings(Utc::now());
        tokio::select! {
            _ = cancel.cancelled() => break,
            res = cycle.run(surface, &tick) => match res {
                Ok(outcome @ CycleOutcome::Disabled { .. }) => {
                    inner.state().enabled = false;
                    inner.record(outcome);
                    info!("responder disabled from a conversation, leaving loop");
                    break;
                },
                Ok(outcome) => inner.record(outcome),
                Err(e) => warn!(error = %e, "tick failed"),
            },
        }
        let interval = std::time::Duration::from_secs_f64(inner.state().interval_secs);
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(interval) => {},
        }
    }
}
