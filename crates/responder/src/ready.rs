//! Waiting for the messaging client to become usable after launch.

use std::time::Duration;

use {
    partdesk_config::BrowserConfig,
    serde::Serialize,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::surface::ChatSurface;

const POLL_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Readiness {
    Ready,
    /// Ready only after someone completed the login challenge.
    ReadyAfterAuth,
    TimedOut,
}

#[derive(Debug, Clone, Copy)]
pub struct ReadyTimeouts {
    pub ready: Duration,
    pub auth: Duration,
    pub poll: Duration,
}

impl From<&BrowserConfig> for ReadyTimeouts {
    fn from(cfg: &BrowserConfig) -> Self {
        Self {
            ready: Duration::from_secs(cfg.ready_timeout_secs),
            auth: Duration::from_secs(cfg.auth_timeout_secs),
            poll: POLL_INTERVAL,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Probe {
    ChatList,
    AuthChallenge,
}

impl Probe {
    async fn check(self, surface: &dyn ChatSurface) -> bool {
        let result = match self {
            Self::ChatList => surface.chat_list_visible().await,
            Self::AuthChallenge => surface.auth_challenge_visible().await,
        };
        result.unwrap_or_else(|e| {
            debug!(probe = ?self, error = %e, "readiness probe failed");
            false
        })
    }

    async fn wait(self, surface: &dyn ChatSurface, timeout: Duration, poll: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.check(surface).await {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(poll).await;
        }
    }
}

/// Wait for the conversation list; if it does not appear, wait for the
/// login challenge to be answered and poll again.
pub async fn wait_until_ready(surface: &dyn ChatSurface, timeouts: &ReadyTimeouts) -> Readiness {
    if Probe::ChatList.wait(surface, timeouts.ready, timeouts.poll).await {
        info!("conversation list ready");
        return Readiness::Ready;
    }

    if Probe::AuthChallenge
        .wait(surface, timeouts.auth, timeouts.poll)
        .await
    {
        info!("login required, scan the QR code in the browser window");
    } else {
        debug!("no login challenge visible");
    }

    if Probe::ChatList.wait(surface, timeouts.auth, timeouts.poll).await {
        info!("conversation list ready after login");
        return Readiness::ReadyAfterAuth;
    }

    warn!(
        ready_secs = timeouts.ready.as_secs(),
        auth_secs = timeouts.auth.as_secs(),
        "conversation list never became ready"
    );
    Readiness::TimedOut
}
