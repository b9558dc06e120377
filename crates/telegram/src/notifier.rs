use std::{future::Future, time::Duration};

use {
    async_trait::async_trait,
    secrecy::ExposeSecret,
    teloxide::{
        RequestError,
        prelude::*,
        types::{ChatId, ParseMode},
    },
    tracing::{debug, warn},
};

use partdesk_common::{AdminAlert, AdminNotifier};

use crate::error::{Context, Result};

const TELEGRAM_RETRY_AFTER_MAX_RETRIES: usize = 4;

/// Sends admin alerts to a single Telegram chat.
pub struct TelegramNotifier {
    bot: Bot,
    chat_id: ChatId,
}

impl TelegramNotifier {
    pub fn new(token: &str, chat_id: i64) -> Self {
        Self {
            bot: Bot::new(token),
            chat_id: ChatId(chat_id),
        }
    }

    /// Build a notifier from config, or `None` when Telegram is not set up.
    pub fn from_config(cfg: &partdesk_config::TelegramConfig) -> Option<Self> {
        if !cfg.is_configured() {
            return None;
        }
        let chat_id = cfg.admin_chat_id?;
        Some(Self::new(cfg.token.expose_secret().trim(), chat_id))
    }

    /// Send an HTML message, waiting out rate limits.
    pub async fn send_html(&self, html: &str) -> Result<()> {
        let chat = self.chat_id.to_string();
        run_telegram_request_with_retry(&chat, "send alert", || {
            let req = self
                .bot
                .send_message(self.chat_id, html)
                .parse_mode(ParseMode::Html);
            async move { req.await }
        })
        .await?;
        debug!(chat_id = %chat, "telegram alert sent");
        Ok(())
    }

    /// Check the token by calling `getMe`.
    pub async fn verify(&self) -> Result<String> {
        let me = self.bot.get_me().await.context("telegram getMe")?;
        Ok(me.username().to_string())
    }
}

#[async_trait]
impl AdminNotifier for TelegramNotifier {
    async fn notify(&self, alert: &AdminAlert) -> partdesk_common::Result<()> {
        self.send_html(&format_alert(alert)).await?;
        Ok(())
    }
}

/// Render an alert as Telegram HTML.
pub fn format_alert(alert: &AdminAlert) -> String {
    format!(
        "🚨 <b>Needs attention</b>\n<b>Chat:</b> {}\n<b>Last message:</b> {}",
        escape_html(alert.display_title()),
        escape_html(&alert.text)
    )
}

/// Escape the characters Telegram's HTML parse mode treats specially.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

async fn run_telegram_request_with_retry<T, F, Fut>(
    chat_id: &str,
    operation: &'static str,
    mut request: F,
) -> std::result::Result<T, RequestError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<T, RequestError>>,
{
    let mut retries = 0usize;

    loop {
        match request().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                let Some(wait) = retry_after_duration(&err) else {
                    return Err(err);
                };

                if retries >= TELEGRAM_RETRY_AFTER_MAX_RETRIES {
                    warn!(
                        chat_id,
                        operation,
                        retries,
                        max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                        retry_after_secs = wait.as_secs(),
                        "telegram rate limit persisted after retries"
                    );
                    return Err(err);
                }

                retries += 1;
                warn!(
                    chat_id,
                    operation,
                    retries,
                    max_retries = TELEGRAM_RETRY_AFTER_MAX_RETRIES,
                    retry_after_secs = wait.as_secs(),
                    "telegram rate limited, waiting before retry"
                );
                tokio::time::sleep(wait).await;
            },
        }
    }
}

fn retry_after_duration(error: &RequestError) -> Option<Duration> {
    match error {
        RequestError::RetryAfter(wait) => Some(wait.duration()),
        _ => None,
    }
}
