//! Typing a reply into the open conversation and confirming it left.

use std::time::Duration;

use {
    partdesk_config::ResponderConfig,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{error::Result, surface::ChatSurface};

#[derive(Debug, Clone)]
pub struct SendSettings {
    pub confirm_timeout: Duration,
    pub confirm_poll: Duration,
    /// Refuse to send when the open conversation's title changed.
    pub ensure_title: bool,
}

impl From<&ResponderConfig> for SendSettings {
    fn from(cfg: &ResponderConfig) -> Self {
        Self {
            confirm_timeout: Duration::from_millis(cfg.confirm_timeout_ms),
            confirm_poll: Duration::from_millis(cfg.confirm_poll_ms.max(1)),
            ensure_title: cfg.ensure_title_on_send,
        }
    }
}

/// Send `body` into the open conversation. Returns whether delivery was
/// confirmed; failures are logged, never returned.
pub async fn send_reply(
    surface: &dyn ChatSurface,
    body: &str,
    expected_title: &str,
    settings: &SendSettings,
) -> bool {
    match try_send(surface, body, expected_title, settings).await {
        Ok(confirmed) => confirmed,
        Err(e) => {
            warn!(title = expected_title, error = %e, "send failed");
            false
        },
    }
}

async fn try_send(
    surface: &dyn ChatSurface,
    body: &str,
    expected_title: &str,
    settings: &SendSettings,
) -> Result<bool> {
    if settings.ensure_title
        && !expected_title.trim().is_empty()
        && let Some(current) = surface.conversation_title().await?
        && current.trim() != expected_title.trim()
    {
        warn!(
            expected = expected_title,
            current = %current,
            "conversation changed under us, not sending"
        );
        return Ok(false);
    }

    if !surface.focus_composer().await? {
        warn!(title = expected_title, "composer not found");
        return Ok(false);
    }
    surface.clear_composer().await?;
    let baseline = surface.outgoing_count().await?;
    surface.type_text(body).await?;
    surface.press_enter().await?;

    if wait_for_outgoing(surface, baseline, settings).await? {
        debug!(title = expected_title, "reply confirmed after enter");
        return Ok(true);
    }

    info!(title = expected_title, "enter did not send, trying send button");
    if !surface.click_send_button().await? {
        warn!(title = expected_title, "send button not found");
    }
    if wait_for_outgoing(surface, baseline, settings).await? {
        debug!(title = expected_title, "reply confirmed after send button");
        return Ok(true);
    }

    warn!(
        title = expected_title,
        timeout_ms = settings.confirm_timeout.as_millis() as u64,
        "reply not confirmed"
    );
    Ok(false)
}

/// Poll the outgoing bubble count until it rises above `baseline`.
async fn wait_for_outgoing(
    surface: &dyn ChatSurface,
    baseline: usize,
    settings: &SendSettings,
) -> Result<bool> {
    let deadline = Instant::now() + settings.confirm_timeout;
    loop {
        if surface.outgoing_count().await? > baseline {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            return Ok(false);
        }
        tokio::time::sleep(settings.confirm_poll).await;
    }
}
