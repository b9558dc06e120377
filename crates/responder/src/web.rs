//! [`ChatSurface`] over a live Chromium session.

use std::time::Duration;

use {
    async_trait::async_trait,
    partdesk_browser::{
        BrowserConfig, BrowserSession, ElementRef, Key, Modifiers, PageDriver, Pick, selectors,
    },
    tracing::{debug, info},
};

use crate::{
    error::Result,
    surface::{
        ChatSurface, ConversationHandle, Direction, MessageRecord, OpenStrategy, SessionLauncher,
    },
    ui::{self, RawMessage, RowInfo, Viewport},
};

const MENU_OPEN_DELAY: Duration = Duration::from_millis(150);
const UNREAD_CONFIRM_POLLS: usize = 12;
const UNREAD_CONFIRM_INTERVAL: Duration = Duration::from_millis(200);

/// The messaging web client in a [`BrowserSession`].
pub struct WebChatSurface {
    session: BrowserSession,
}

impl WebChatSurface {
    pub fn new(session: BrowserSession) -> Self {
        Self { session }
    }

    fn driver(&self) -> &PageDriver {
        self.session.driver()
    }

    async fn find(&self, candidates: &[&str], pick: Pick) -> Result<Option<ElementRef>> {
        Ok(selectors::resolve(self.driver(), candidates, pick).await?)
    }

    async fn eval<T: serde::de::DeserializeOwned>(&self, js: &str) -> Result<T> {
        Ok(self.driver().evaluate(js).await?)
    }

    async fn row_unread(&self, row: u32) -> Result<bool> {
        self.eval(&ui::row_unread_script(row)?).await
    }
}

#[async_trait]
impl ChatSurface for WebChatSurface {
    async fn chat_list_visible(&self) -> Result<bool> {
        Ok(self.find(ui::CHAT_LIST, Pick::First).await?.is_some())
    }

    async fn auth_challenge_visible(&self) -> Result<bool> {
        Ok(self.find(ui::AUTH_CHALLENGE, Pick::First).await?.is_some())
    }

    async fn unread_conversations(&self) -> Result<Vec<ConversationHandle>> {
        let rows: Vec<RowInfo> = self.eval(&ui::unread_rows_script()?).await?;
        let total = rows.len();
        let handles: Vec<ConversationHandle> = rows
            .into_iter()
            .filter(|row| {
                if row.muted {
                    debug!(title = %row.title, "skipping muted conversation");
                } else if row.typing {
                    debug!(title = %row.title, "skipping conversation while contact is typing");
                }
                !row.muted && !row.typing
            })
            .map(|row| ConversationHandle {
                key: row.ref_,
                title: row.title,
            })
            .collect();
        debug!(unread = total, eligible = handles.len(), "scanned conversation list");
        Ok(handles)
    }

    async fn open_with(&self, entry: &ConversationHandle, strategy: OpenStrategy) -> Result<()> {
        let driver = self.driver();
        let rect = selectors::scroll_into_view(driver, entry.key).await?;
        let (x, y) = rect.center();
        match strategy {
            OpenStrategy::DirectClick => selectors::dispatch_click(driver, entry.key).await?,
            OpenStrategy::ForcedClick => selectors::js_click(driver, entry.key).await?,
            OpenStrategy::DoubleClick => driver.click_at(x, y, 2).await?,
            OpenStrategy::CoordinateClick => {
                let fresh = selectors::bounds(driver, entry.key).await?;
                let (x, y) = fresh.center();
                driver.click_at(x, y, 1).await?;
            },
            OpenStrategy::KeyboardActivate => {
                selectors::focus(driver, entry.key).await?;
                driver.press_key(Key::Enter, Modifiers::NONE).await?;
            },
        }
        Ok(())
    }

    async fn conversation_open(&self) -> Result<bool> {
        if self.eval::<bool>(&ui::overlay_script()?).await? {
            debug!("overlay covers the conversation");
            return Ok(false);
        }
        if self.driver().exists(ui::MESSAGE_NODE).await? {
            return Ok(true);
        }
        Ok(self.find(ui::COMPOSER, Pick::Lowest).await?.is_some())
    }

    async fn conversation_title(&self) -> Result<Option<String>> {
        self.eval(&ui::header_title_script()?).await
    }

    async fn messages(&self, limit: usize) -> Result<Vec<MessageRecord>> {
        let raw: Vec<RawMessage> = self.eval(&ui::messages_script(limit)?).await?;
        Ok(raw
            .into_iter()
            .map(|m| MessageRecord {
                text: m.text,
                direction: if m.outgoing {
                    Direction::Outgoing
                } else {
                    Direction::Incoming
                },
            })
            .collect())
    }

    async fn focus_composer(&self) -> Result<bool> {
        let driver = self.driver();
        let composer = match self.find(ui::COMPOSER, Pick::Lowest).await? {
            Some(el) => Some(el),
            None => {
                let viewport: Viewport = self.eval(ui::VIEWPORT_SCRIPT).await?;
                let (x, y) = ui::composer_fallback_point(viewport)?;
                debug!(x, y, "composer not found, clicking where it usually is");
                driver.click_at(x, y, 1).await?;
                self.find(ui::COMPOSER, Pick::Lowest).await?
            },
        };
        let Some(el) = composer else {
            return Ok(false);
        };
        debug!(selector = %el.selector, "composer found");
        selectors::focus(driver, el.ref_).await?;
        let (x, y) = el.bounds.center();
        driver.click_at(x, y, 1).await?;
        Ok(true)
    }

    async fn clear_composer(&self) -> Result<()> {
        let driver = self.driver();
        driver.press_key(Key::Char('a'), Modifiers::CTRL).await?;
        driver.press_key(Key::Backspace, Modifiers::NONE).await?;
        Ok(())
    }

    /// Lines are joined with Shift+Enter so Enter still means "send".
    async fn type_text(&self, text: &str) -> Result<()> {
        let driver = self.driver();
        for (i, line) in text.lines().enumerate() {
            if i > 0 {
                driver.press_key(Key::Enter, Modifiers::SHIFT).await?;
            }
            if !line.is_empty() {
                driver.insert_text(line).await?;
            }
        }
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        Ok(self.driver().press_key(Key::Enter, Modifiers::NONE).await?)
    }

    async fn outgoing_count(&self) -> Result<usize> {
        self.eval(&ui::outgoing_count_script()?).await
    }

    async fn click_send_button(&self) -> Result<bool> {
        let Some(button) = self.find(ui::SEND_BUTTON, Pick::First).await? else {
            return Ok(false);
        };
        selectors::js_click(self.driver(), button.ref_).await?;
        Ok(true)
    }

    async fn mark_unread_via_menu(&self, title: &str) -> Result<bool> {
        let driver = self.driver();
        let Some(row) = self
            .eval::<Option<u32>>(&ui::row_for_title_script(title)?)
            .await?
        else {
            debug!(title, "conversation row not found");
            return Ok(false);
        };

        if !self.eval::<bool>(&ui::row_menu_button_script(row)?).await? {
            selectors::context_menu(driver, row).await?;
        }
        tokio::time::sleep(MENU_OPEN_DELAY).await;

        if !self.eval::<bool>(&ui::click_mark_unread_script()?).await? {
            debug!(title, "mark-unread menu item not found");
            driver.press_key(Key::Escape, Modifiers::NONE).await?;
            return Ok(false);
        }

        for _ in 0..UNREAD_CONFIRM_POLLS {
            if self.row_unread(row).await? {
                info!(title, "conversation marked unread");
                return Ok(true);
            }
            tokio::time::sleep(UNREAD_CONFIRM_INTERVAL).await;
        }
        debug!(title, "unread marker did not appear");
        Ok(false)
    }

    async fn mark_unread_via_shortcut(&self) -> Result<()> {
        Ok(self
            .driver()
            .press_key(Key::Char('u'), Modifiers::CTRL | Modifiers::SHIFT)
            .await?)
    }

    async fn focus_chat_list(&self) -> Result<bool> {
        let driver = self.driver();
        driver.press_key(Key::Escape, Modifiers::NONE).await?;
        let Some(search) = self.find(ui::SEARCH_BOX, Pick::First).await? else {
            return Ok(false);
        };
        selectors::focus(driver, search.ref_).await?;
        Ok(true)
    }

    async fn press_escape(&self) -> Result<()> {
        Ok(self.driver().press_key(Key::Escape, Modifiers::NONE).await?)
    }

    async fn close(&self) {
        self.session.close().await;
    }
}

/// Launches Chromium with the persistent profile and wraps it.
pub struct ChromiumLauncher {
    config: BrowserConfig,
}

impl ChromiumLauncher {
    pub fn new(config: BrowserConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SessionLauncher for ChromiumLauncher {
    async fn launch(&self) -> Result<Box<dyn ChatSurface>> {
        info!(
            profile = %self.config.profile_dir.display(),
            headless = self.config.headless,
            "launching browser"
        );
        let session = BrowserSession::launch(&self.config).await?;
        Ok(Box::new(WebChatSurface::new(session)))
    }
}
