//! Turns extracted codes into reply bodies through the resolver collaborator.

use std::{sync::Arc, time::Duration};

use {
    async_trait::async_trait,
    serde::Serialize,
    tracing::{debug, warn},
};

use crate::error::Result;

/// What the resolver is asked for one conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveRequest {
    /// Deduplicated codes, uppercased, in first-seen order.
    pub codes: Vec<String>,
    /// Conversation title.
    pub title: String,
    /// Delivery wording valid for this tick.
    pub delivery_text: String,
}

/// Inventory lookup. `Ok(None)` means "nothing to say".
#[async_trait]
pub trait CodeResolver: Send + Sync {
    async fn resolve(&self, request: &ResolveRequest) -> Result<Option<Vec<String>>>;
}

/// Wraps the resolver so callers always get a list of replies.
#[derive(Clone)]
pub struct ReplyBridge {
    resolver: Option<Arc<dyn CodeResolver>>,
    timeout: Duration,
    degraded_reply: String,
}

impl ReplyBridge {
    pub fn new(
        resolver: Option<Arc<dyn CodeResolver>>,
        timeout: Duration,
        degraded_reply: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            timeout,
            degraded_reply: degraded_reply.into(),
        }
    }

    /// Reply bodies for `request`.
    ///
    /// A missing, failing, panicking, or slow resolver yields exactly one
    /// degraded reply. An empty answer yields an empty list.
    pub async fn replies(&self, request: ResolveRequest) -> Vec<String> {
        let Some(resolver) = self.resolver.clone() else {
            warn!("no resolver configured, sending degraded reply");
            return vec![self.degraded_reply.clone()];
        };

        let codes = request.codes.len();
        let mut call = tokio::spawn(async move { resolver.resolve(&request).await });
        match tokio::time::timeout(self.timeout, &mut call).await {
            Ok(Ok(Ok(replies))) => {
                let replies: Vec<String> = replies
                    .unwrap_or_default()
                    .into_iter()
                    .filter(|r| !r.trim().is_empty())
                    .collect();
                debug!(codes, replies = replies.len(), "resolver answered");
                replies
            },
            Ok(Ok(Err(e))) => {
                warn!(codes, error = %e, "resolver failed, sending degraded reply");
                vec![self.degraded_reply.clone()]
            },
            Ok(Err(e)) => {
                warn!(codes, error = %e, "resolver task aborted, sending degraded reply");
                vec![self.degraded_reply.clone()]
            },
            Err(_) => {
                call.abort();
                warn!(
                    codes,
                    timeout_secs = self.timeout.as_secs(),
                    "resolver timed out, sending degraded reply"
                );
                vec![self.degraded_reply.clone()]
            },
        }
    }
}

/// Per-code "not found" replies from a `{code}` template.
pub fn not_found_replies(template: &str, codes: &[String]) -> Vec<String> {
    codes
        .iter()
        .map(|code| template.replace("{code}", code))
        .collect()
}
