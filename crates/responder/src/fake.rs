//! Scripted in-memory surface for exercising the loop without a browser.

use std::{
    collections::VecDeque,
    sync::{
        Arc, Mutex, MutexGuard,
        atomic::{AtomicUsize, Ordering},
    },
};

use {
    async_trait::async_trait,
    partdesk_common::{AdminAlert, AdminNotifier},
};

use crate::{
    error::{Error, Result},
    surface::{
        ChatSurface, ConversationHandle, MessageRecord, OpenStrategy, SessionLauncher,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Open(OpenStrategy),
    FocusComposer,
    Clear,
    Type(String),
    Enter,
    SendButton,
    MarkMenu(String),
    MarkShortcut,
    FocusList,
    Escape,
    Close,
}

pub(crate) struct FakeState {
    /// Chat-list probes answered `false` before it shows up; `None` never.
    pub chat_list_after: Option<usize>,
    pub chat_list_polls: usize,
    pub auth_challenge: bool,
    pub unread: Vec<ConversationHandle>,
    /// Strategy that actually opens the conversation; `None` never opens.
    pub opens_with: Option<OpenStrategy>,
    pub open_errors: bool,
    pub opened: bool,
    pub title: Option<String>,
    /// Successive `messages()` answers; the last one repeats.
    pub reads: VecDeque<Vec<MessageRecord>>,
    pub composer: bool,
    pub enter_sends: bool,
    pub button_sends: bool,
    pub outgoing: usize,
    pub draft: String,
    pub sent: Vec<String>,
    pub menu_marks: bool,
    pub marked_unread: bool,
    pub list_focusable: bool,
    pub calls: Vec<Call>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            chat_list_after: Some(0),
            chat_list_polls: 0,
            auth_challenge: false,
            unread: Vec::new(),
            opens_with: Some(OpenStrategy::DirectClick),
            open_errors: false,
            opened: false,
            title: None,
            reads: VecDeque::new(),
            composer: true,
            enter_sends: true,
            button_sends: true,
            outgoing: 0,
            draft: String::new(),
            sent: Vec::new(),
            menu_marks: true,
            marked_unread: false,
            list_focusable: true,
            calls: Vec::new(),
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct FakeSurface {
    state: Arc<Mutex<FakeState>>,
}

impl FakeSurface {
    /// One unread conversation titled `title` whose history is `messages`.
    pub fn with_conversation(title: &str, messages: Vec<MessageRecord>) -> Self {
        let fake = Self::default();
        {
            let mut s = fake.state();
            s.unread = vec![ConversationHandle {
                key: 1,
                title: title.to_string(),
            }];
            s.title = Some(title.to_string());
            s.reads = VecDeque::from([messages]);
        }
        fake
    }

    pub fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.state().calls.iter().filter(|c| pred(c)).count()
    }

    pub fn sent(&self) -> Vec<String> {
        self.state().sent.clone()
    }

    fn record(&self, call: Call) {
        self.state().calls.push(call);
    }

    fn deliver(s: &mut FakeState) {
        let body = std::mem::take(&mut s.draft);
        s.outgoing += 1;
        s.sent.push(body);
    }
}

#[async_trait]
impl ChatSurface for FakeSurface {
    async fn chat_list_visible(&self) -> Result<bool> {
        let mut s = self.state();
        s.chat_list_polls += 1;
        Ok(s.chat_list_after.is_some_and(|n| s.chat_list_polls > n))
    }

    async fn auth_challenge_visible(&self) -> Result<bool> {
        Ok(self.state().auth_challenge)
    }

    async fn unread_conversations(&self) -> Result<Vec<ConversationHandle>> {
        Ok(self.state().unread.clone())
    }

    async fn open_with(&self, _entry: &ConversationHandle, strategy: OpenStrategy) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::Open(strategy));
        if s.open_errors {
            return Err(Error::message("element detached"));
        }
        if s.opens_with == Some(strategy) {
            s.opened = true;
        }
        Ok(())
    }

    async fn conversation_open(&self) -> Result<bool> {
        Ok(self.state().opened)
    }

    async fn conversation_title(&self) -> Result<Option<String>> {
        Ok(self.state().title.clone())
    }

    async fn messages(&self, limit: usize) -> Result<Vec<MessageRecord>> {
        let mut s = self.state();
        let batch = if s.reads.len() > 1 {
            s.reads.pop_front().unwrap_or_default()
        } else {
            s.reads.front().cloned().unwrap_or_default()
        };
        let skip = batch.len().saturating_sub(limit);
        Ok(batch.into_iter().skip(skip).collect())
    }

    async fn focus_composer(&self) -> Result<bool> {
        let mut s = self.state();
        s.calls.push(Call::FocusComposer);
        Ok(s.composer)
    }

    async fn clear_composer(&self) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::Clear);
        s.draft.clear();
        Ok(())
    }

    async fn type_text(&self, text: &str) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::Type(text.to_string()));
        s.draft.push_str(text);
        Ok(())
    }

    async fn press_enter(&self) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::Enter);
        if s.enter_sends && !s.draft.is_empty() {
            Self::deliver(&mut s);
        }
        Ok(())
    }

    async fn outgoing_count(&self) -> Result<usize> {
        Ok(self.state().outgoing)
    }

    async fn click_send_button(&self) -> Result<bool> {
        let mut s = self.state();
        s.calls.push(Call::SendButton);
        if s.button_sends && !s.draft.is_empty() {
            Self::deliver(&mut s);
            return Ok(true);
        }
        Ok(false)
    }

    async fn mark_unread_via_menu(&self, title: &str) -> Result<bool> {
        let mut s = self.state();
        s.calls.push(Call::MarkMenu(title.to_string()));
        if s.menu_marks {
            s.marked_unread = true;
        }
        Ok(s.menu_marks)
    }

    async fn mark_unread_via_shortcut(&self) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::MarkShortcut);
        s.marked_unread = true;
        Ok(())
    }

    async fn focus_chat_list(&self) -> Result<bool> {
        let mut s = self.state();
        s.calls.push(Call::FocusList);
        s.opened = false;
        Ok(s.list_focusable)
    }

    async fn press_escape(&self) -> Result<()> {
        let mut s = self.state();
        s.calls.push(Call::Escape);
        s.opened = false;
        Ok(())
    }

    async fn close(&self) {
        self.record(Call::Close);
    }
}

/// Hands out clones of one [`FakeSurface`], or fails every launch.
#[derive(Clone, Default)]
pub(crate) struct FakeLauncher {
    pub surface: FakeSurface,
    pub fail: bool,
    launches: Arc<AtomicUsize>,
}

impl FakeLauncher {
    pub fn new(surface: FakeSurface) -> Self {
        Self {
            surface,
            ..Default::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn launches(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    async fn launch(&self) -> Result<Box<dyn ChatSurface>> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::NotReady("chromium exited".into()));
        }
        Ok(Box::new(self.surface.clone()))
    }
}

/// Collects alerts instead of delivering them.
#[derive(Clone, Default)]
pub(crate) struct RecordingNotifier {
    alerts: Arc<Mutex<Vec<AdminAlert>>>,
}

impl RecordingNotifier {
    pub fn alerts(&self) -> Vec<AdminAlert> {
        self.alerts.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl AdminNotifier for RecordingNotifier {
    async fn notify(&self, alert: &AdminAlert) -> partdesk_common::Result<()> {
        self.alerts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(alert.clone());
        Ok(())
    }
}

/// Let spawned alert dispatches run to completion.
pub(crate) async fn settle_tasks() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}
