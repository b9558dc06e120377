//! Low-level page interaction over CDP.

use std::time::Duration;

use {
    chromiumoxide::{
        Page,
        cdp::browser_protocol::input::{
            DispatchKeyEventParams, DispatchKeyEventType, DispatchMouseEventParams,
            DispatchMouseEventType, InsertTextParams, MouseButton,
        },
    },
    serde::de::DeserializeOwned,
    tracing::debug,
};

use crate::{
    error::BrowserError,
    types::{Key, Modifiers},
};

/// Drives the single page of a [`crate::BrowserSession`].
///
/// Every input action is followed by the configured slow-mo pause.
#[derive(Clone)]
pub struct PageDriver {
    page: Page,
    slow_mo: Duration,
}

impl PageDriver {
    pub fn new(page: Page, slow_mo: Duration) -> Self {
        Self { page, slow_mo }
    }

    /// Evaluate a JavaScript expression and deserialize its result.
    pub async fn evaluate<T: DeserializeOwned>(&self, js: &str) -> Result<T, BrowserError> {
        self.page
            .evaluate(js)
            .await
            .map_err(|e| BrowserError::JsEvalFailed(e.to_string()))?
            .into_value()
            .map_err(|e| BrowserError::JsEvalFailed(format!("failed to get result: {e:?}")))
    }

    /// Whether any element matches `selector`.
    pub async fn exists(&self, selector: &str) -> Result<bool, BrowserError> {
        let js = format!(
            "(() => {{ try {{ return document.querySelector({}) !== null; }} catch (e) {{ return false; }} }})()",
            js_string(selector)?
        );
        self.evaluate(&js).await
    }

    /// Navigate to `url` and wait for the load to settle.
    pub async fn goto(&self, url: &str) -> Result<(), BrowserError> {
        self.page
            .goto(url)
            .await
            .map_err(|e| BrowserError::NavigationFailed(e.to_string()))?;
        let _ = self.page.wait_for_navigation().await;
        debug!(url, "navigated");
        Ok(())
    }

    /// Press and release the left button `clicks` times at a viewport point.
    pub async fn click_at(&self, x: f64, y: f64, clicks: i64) -> Result<(), BrowserError> {
        let moved = DispatchMouseEventParams::builder()
            .r#type(DispatchMouseEventType::MouseMoved)
            .x(x)
            .y(y)
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.execute(moved).await?;

        for count in 1..=clicks.max(1) {
            for kind in [
                DispatchMouseEventType::MousePressed,
                DispatchMouseEventType::MouseReleased,
            ] {
                let cmd = DispatchMouseEventParams::builder()
                    .r#type(kind)
                    .x(x)
                    .y(y)
                    .button(MouseButton::Left)
                    .click_count(count)
                    .build()
                    .map_err(BrowserError::Cdp)?;
                self.page.execute(cmd).await?;
            }
        }

        debug!(x, y, clicks, "clicked");
        self.pace().await;
        Ok(())
    }

    /// Send a key down/up pair with the given modifiers.
    pub async fn press_key(&self, key: Key, modifiers: Modifiers) -> Result<(), BrowserError> {
        let text = key.text(modifiers);
        let down_type = if text.is_some() {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::RawKeyDown
        };

        let mut down = DispatchKeyEventParams::builder()
            .r#type(down_type)
            .modifiers(modifiers.bits())
            .key(key.key())
            .code(key.code())
            .windows_virtual_key_code(key.virtual_key_code());
        if let Some(text) = text {
            down = down.text(text);
        }
        self.page
            .execute(down.build().map_err(BrowserError::Cdp)?)
            .await?;

        let up = DispatchKeyEventParams::builder()
            .r#type(DispatchKeyEventType::KeyUp)
            .modifiers(modifiers.bits())
            .key(key.key())
            .code(key.code())
            .windows_virtual_key_code(key.virtual_key_code())
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.execute(up).await?;

        debug!(key = %key.key(), modifiers = modifiers.bits(), "pressed key");
        self.pace().await;
        Ok(())
    }

    /// Insert text into the focused element as a single input event.
    pub async fn insert_text(&self, text: &str) -> Result<(), BrowserError> {
        let cmd = InsertTextParams::builder()
            .text(text)
            .build()
            .map_err(BrowserError::Cdp)?;
        self.page.execute(cmd).await?;
        debug!(chars = text.chars().count(), "inserted text");
        self.pace().await;
        Ok(())
    }

    async fn pace(&self) {
        if !self.slow_mo.is_zero() {
            tokio::time::sleep(self.slow_mo).await;
        }
    }
}

/// Encode a string as a JavaScript string literal.
pub fn js_string(value: &str) -> Result<String, BrowserError> {
    serde_json::to_string(value).map_err(|e| BrowserError::InvalidAction(e.to_string()))
}
