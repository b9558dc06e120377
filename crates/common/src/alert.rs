//! Admin alerts raised when a conversation cannot be fully automated.

use std::sync::Arc;

use {
    async_trait::async_trait,
    serde::Serialize,
    tracing::{debug, info, warn},
};

use crate::error::Result;

/// Maximum characters of the customer's message quoted in an alert.
pub const ALERT_PREVIEW_MAX_CHARS: usize = 200;

/// Short-form alert for a human operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminAlert {
    /// Display title of the conversation (empty when it could not be resolved).
    pub title: String,
    /// Last raw message text, truncated to [`ALERT_PREVIEW_MAX_CHARS`].
    pub text: String,
}

impl AdminAlert {
    pub fn new(title: impl Into<String>, text: &str) -> Self {
        Self {
            title: title.into(),
            text: truncate_chars(text, ALERT_PREVIEW_MAX_CHARS),
        }
    }

    /// Title to show, with a placeholder for untitled conversations.
    pub fn display_title(&self) -> &str {
        if self.title.trim().is_empty() {
            "(untitled)"
        } else {
            self.title.as_str()
        }
    }
}

/// Outbound channel that delivers alerts to an operator.
#[async_trait]
pub trait AdminNotifier: Send + Sync {
    async fn notify(&self, alert: &AdminAlert) -> Result<()>;
}

/// Notifier that only writes the alert to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl AdminNotifier for LogNotifier {
    async fn notify(&self, alert: &AdminAlert) -> Result<()> {
        info!(title = alert.display_title(), text = %alert.text, "admin alert");
        Ok(())
    }
}

/// Fire-and-forget delivery: spawn the send and log its failure.
///
/// The caller never waits on the notification channel.
pub fn dispatch_alert(
    notifier: Arc<dyn AdminNotifier>,
    alert: AdminAlert,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        match notifier.notify(&alert).await {
            Ok(()) => debug!(title = alert.display_title(), "admin alert delivered"),
            Err(e) => warn!(
                title = alert.display_title(),
                error = %e,
                "admin alert delivery failed"
            ),
        }
    })
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}
