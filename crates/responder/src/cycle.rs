//! One pass of the unread-conversation loop.
//!
//! A tick scans the conversation list, opens the first unread entry not on
//! cooldown, reads what arrived after our last reply, answers every code it
//! finds, and hands the conversation back to a human when something could
//! not be answered automatically. Focus always returns to the list.

use std::{sync::Arc, time::Duration};

use {
    partdesk_common::AdminNotifier,
    partdesk_config::ResponderConfig,
    rand::Rng,
    serde::Serialize,
    tokio::time::Instant,
    tracing::{debug, info, warn},
};

use crate::{
    bridge::{CodeResolver, ReplyBridge, ResolveRequest, not_found_replies},
    codes::{CodeExtractor, CodeToken, Extraction, dedup_tokens},
    cooldown::ReopenCooldown,
    error::Result,
    escalate::{mark_unread, notify_admin},
    hours::TickSettings,
    send::{SendSettings, send_reply},
    surface::{ChatSurface, ConversationHandle, OpenStrategy, new_incoming},
};

/// Typed into a conversation to switch the responder off.
pub const DISABLE_COMMAND: &str = "/disable_bot";

/// Delivery counts for the replies of one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SendReport {
    pub codes: usize,
    pub attempted: usize,
    pub confirmed: usize,
}

/// What a tick did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum CycleOutcome {
    OutsideHours,
    NoUnread,
    /// Every open strategy failed; nothing was touched.
    OpenFailed { title: String },
    NothingNew { title: String },
    /// No codes at all: marked unread and alerted.
    Escalated { title: String },
    Replied { title: String, report: SendReport },
    RepliedAndEscalated { title: String, report: SendReport },
    /// The conversation asked the responder to switch off.
    Disabled { title: String },
}

impl CycleOutcome {
    pub fn escalated(&self) -> bool {
        matches!(
            self,
            Self::Escalated { .. } | Self::RepliedAndEscalated { .. }
        )
    }
}

/// Timing and wording for a tick.
#[derive(Debug, Clone)]
pub struct CycleSettings {
    pub open_strategies: Vec<OpenStrategy>,
    pub open_settle: Duration,
    pub settle_read: Duration,
    pub max_messages: usize,
    pub send_pause: (Duration, Duration),
    pub not_found_template: String,
    pub send: SendSettings,
}

impl From<&ResponderConfig> for CycleSettings {
    fn from(cfg: &ResponderConfig) -> Self {
        let (lo, hi) = (
            cfg.send_pause_min_ms.min(cfg.send_pause_max_ms),
            cfg.send_pause_min_ms.max(cfg.send_pause_max_ms),
        );
        Self {
            open_strategies: cfg.open_strategies.clone(),
            open_settle: Duration::from_millis(cfg.open_settle_ms),
            settle_read: Duration::from_millis(cfg.settle_read_ms),
            max_messages: cfg.max_messages_scan.max(1),
            send_pause: (Duration::from_millis(lo), Duration::from_millis(hi)),
            not_found_template: cfg.not_found_template.clone(),
            send: SendSettings::from(cfg),
        }
    }
}

/// Per-controller loop state: the only memory carried across ticks is the
/// reopen cooldown.
pub struct Cycle {
    settings: CycleSettings,
    extractor: CodeExtractor,
    bridge: ReplyBridge,
    notifier: Arc<dyn AdminNotifier>,
    cooldown: ReopenCooldown,
}

impl Cycle {
    pub fn new(
        cfg: &ResponderConfig,
        resolver: Option<Arc<dyn CodeResolver>>,
        notifier: Arc<dyn AdminNotifier>,
    ) -> Self {
        Self {
            settings: CycleSettings::from(cfg),
            extractor: CodeExtractor::new(&cfg.benign_words),
            bridge: ReplyBridge::new(
                resolver,
                Duration::from_secs(cfg.resolver_timeout_secs.max(1)),
                cfg.degraded_reply.clone(),
            ),
            notifier,
            cooldown: ReopenCooldown::new(
                Duration::from_secs(cfg.reopen_cooldown_secs),
                cfg.cooldown_capacity,
            ),
        }
    }

    pub fn cooldown(&self) -> &ReopenCooldown {
        &self.cooldown
    }

    /// Run one tick against `surface`.
    ///
    /// Errors only escape when the conversation list itself could not be
    /// read; once a conversation was touched the tick always closes it.
    pub async fn run(&mut self, surface: &dyn ChatSurface, tick: &TickSettings) -> Result<CycleOutcome> {
        if !tick.open {
            debug!("outside business hours, skipping tick");
            return Ok(CycleOutcome::OutsideHours);
        }

        let now = Instant::now().into_std();
        self.cooldown.evict_expired(now);

        let unread = surface.unread_conversations().await?;
        let total = unread.len();
        let Some(entry) = unread
            .into_iter()
            .find(|c| !self.cooldown.contains(&c.title, now))
        else {
            debug!(unread = total, "nothing to process");
            return Ok(CycleOutcome::NoUnread);
        };
        debug!(unread = total, title = %entry.title, "processing conversation");

        let outcome = self.process(surface, &entry, tick).await;
        return_to_list(surface).await;
        if let Ok(outcome) = &outcome {
            info!(?outcome, "tick finished");
        }
        outcome
    }

    async fn process(
        &mut self,
        surface: &dyn ChatSurface,
        entry: &ConversationHandle,
        tick: &TickSettings,
    ) -> Result<CycleOutcome> {
        if !self.open(surface, entry).await {
            warn!(title = %entry.title, "could not open conversation, retrying next tick");
            return Ok(CycleOutcome::OpenFailed {
                title: entry.title.clone(),
            });
        }

        let title = match surface.conversation_title().await {
            Ok(Some(t)) if !t.trim().is_empty() => t.trim().to_string(),
            Ok(_) => entry.title.clone(),
            Err(e) => {
                debug!(error = %e, "header title unavailable, using list title");
                entry.title.clone()
            },
        };

        let texts = self.read_new_incoming(surface).await?;
        if texts.is_empty() {
            debug!(title = %title, "no new incoming messages");
            return Ok(CycleOutcome::NothingNew { title });
        }

        if texts.iter().any(|t| is_disable_command(t)) {
            info!(title = %title, "disable command received, leaving conversation");
            return Ok(CycleOutcome::Disabled { title });
        }

        let analyses: Vec<Extraction> = texts.iter().map(|t| self.extractor.analyze(t)).collect();
        let needs_escalation = analyses.iter().any(Extraction::needs_escalation);
        let tokens = dedup_tokens(analyses.into_iter().flat_map(|a| a.tokens));
        let last_text = texts.last().map(String::as_str).unwrap_or_default();
        debug!(
            title = %title,
            messages = texts.len(),
            codes = tokens.len(),
            needs_escalation,
            "classified new messages"
        );

        if tokens.is_empty() {
            self.escalate(surface, entry, &title, last_text).await;
            return Ok(CycleOutcome::Escalated { title });
        }

        let report = self.respond(surface, &title, &tokens, tick).await;
        if needs_escalation {
            self.escalate(surface, entry, &title, last_text).await;
            Ok(CycleOutcome::RepliedAndEscalated { title, report })
        } else {
            Ok(CycleOutcome::Replied { title, report })
        }
    }

    async fn open(&self, surface: &dyn ChatSurface, entry: &ConversationHandle) -> bool {
        for (attempt, strategy) in self.settings.open_strategies.iter().enumerate() {
            if let Err(e) = surface.open_with(entry, *strategy).await {
                debug!(attempt, %strategy, error = %e, "open attempt failed");
                continue;
            }
            tokio::time::sleep(self.settings.open_settle).await;
            match surface.conversation_open().await {
                Ok(true) => {
                    debug!(attempt, %strategy, "conversation opened");
                    return true;
                },
                Ok(false) => debug!(attempt, %strategy, "conversation did not open"),
                Err(e) => debug!(attempt, %strategy, error = %e, "open check failed"),
            }
        }
        false
    }

    /// Incoming texts after our last reply, re-read once after a settle
    /// delay so a burst of bubbles is handled together.
    async fn read_new_incoming(&self, surface: &dyn ChatSurface) -> Result<Vec<String>> {
        let mut texts = new_incoming(&surface.messages(self.settings.max_messages).await?);
        if texts.is_empty() || self.settings.settle_read.is_zero() {
            return Ok(texts);
        }
        tokio::time::sleep(self.settings.settle_read).await;
        match surface.messages(self.settings.max_messages).await {
            Ok(messages) => {
                let again = new_incoming(&messages);
                if again.len() > texts.len() {
                    debug!(before = texts.len(), after = again.len(), "more messages arrived while settling");
                    texts = again;
                }
            },
            Err(e) => debug!(error = %e, "settle re-read failed, keeping first read"),
        }
        Ok(texts)
    }

    async fn respond(
        &self,
        surface: &dyn ChatSurface,
        title: &str,
        tokens: &[CodeToken],
        tick: &TickSettings,
    ) -> SendReport {
        let codes: Vec<String> = tokens.iter().map(|t| t.text.clone()).collect();
        let request = ResolveRequest {
            codes: codes.clone(),
            title: title.to_string(),
            delivery_text: tick.delivery_text.clone(),
        };
        let mut bodies = self.bridge.replies(request).await;
        if bodies.is_empty() {
            debug!(title, "resolver had nothing, sending not-found replies");
            bodies = not_found_replies(&self.settings.not_found_template, &codes);
        }

        let mut report = SendReport {
            codes: codes.len(),
            ..Default::default()
        };
        for (i, body) in bodies.iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.pause()).await;
            }
            report.attempted += 1;
            if send_reply(surface, body, title, &self.settings.send).await {
                report.confirmed += 1;
            }
        }
        info!(
            title,
            codes = report.codes,
            sent = report.confirmed,
            attempted = report.attempted,
            "replies sent"
        );
        report
    }

    /// Hand the conversation back. Both the header title and the list-row
    /// title the scan matches on go on cooldown.
    async fn escalate(
        &mut self,
        surface: &dyn ChatSurface,
        entry: &ConversationHandle,
        title: &str,
        last_text: &str,
    ) {
        mark_unread(surface, title).await;
        notify_admin(&self.notifier, title, last_text);
        let now = Instant::now().into_std();
        self.cooldown.insert(title, now);
        if entry.title != title {
            self.cooldown.insert(&entry.title, now);
        }
    }

    fn pause(&self) -> Duration {
        let (lo, hi) = self.settings.send_pause;
        if lo >= hi {
            return lo;
        }
        rand::rng().random_range(lo..=hi)
    }
}

fn is_disable_command(text: &str) -> bool {
    text.trim().to_lowercase().starts_with(DISABLE_COMMAND)
}

/// Leave the conversation so the next tick starts from the list.
async fn return_to_list(surface: &dyn ChatSurface) {
    match surface.focus_chat_list().await {
        Ok(true) => return,
        Ok(false) => debug!("conversation list not focusable, pressing escape"),
        Err(e) => debug!(error = %e, "focusing conversation list failed, pressing escape"),
    }
    if let Err(e) = surface.press_escape().await {
        warn!(error = %e, "could not return to conversation list");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {
        super::*,
        crate::{
            error::Error,
            fake::{Call, FakeSurface, RecordingNotifier, settle_tasks},
            surface::MessageRecord,
        },
        async_trait::async_trait,
        rstest::rstest,
        std::sync::Mutex,
    };

    struct Catalog;

    #[async_trait]
    impl CodeResolver for Catalog {
        async fn resolve(&self, request: &ResolveRequest) -> Result<Option<Vec<String>>> {
            Ok(Some(
                request
                    .codes
                    .iter()
                    .map(|c| format!("{c}: in stock, {}", request.delivery_text))
                    .collect(),
            ))
        }
    }

    struct Down;

    #[async_trait]
    impl CodeResolver for Down {
        async fn resolve(&self, _request: &ResolveRequest) -> Result<Option<Vec<String>>> {
            Err(Error::message("connection refused"))
        }
    }

    struct Empty;

    #[async_trait]
    impl CodeResolver for Empty {
        async fn resolve(&self, _request: &ResolveRequest) -> Result<Option<Vec<String>>> {
            Ok(Some(Vec::new()))
        }
    }

    /// Remembers every request it saw.
    #[derive(Default)]
    struct Spy(Mutex<Vec<ResolveRequest>>);

    #[async_trait]
    impl CodeResolver for Spy {
        async fn resolve(&self, request: &ResolveRequest) -> Result<Option<Vec<String>>> {
            self.0.lock().unwrap().push(request.clone());
            Ok(Some(vec!["ok".into()]))
        }
    }

    fn open_tick() -> TickSettings {
        TickSettings {
            open: true,
            delivery_text: "ships today".into(),
        }
    }

    fn cycle(resolver: Option<Arc<dyn CodeResolver>>) -> (Cycle, RecordingNotifier) {
        let recorder = RecordingNotifier::default();
        let cfg = ResponderConfig {
            degraded_reply: "DEGRADED".into(),
            not_found_template: "{code} not found".into(),
            ..Default::default()
        };
        (Cycle::new(&cfg, resolver, Arc::new(recorder.clone())), recorder)
    }

    fn conversation(messages: Vec<MessageRecord>) -> FakeSurface {
        FakeSurface::with_conversation("Ali", messages)
    }

    async fn run(cycle: &mut Cycle, fake: &FakeSurface) -> CycleOutcome {
        let outcome = cycle.run(fake, &open_tick()).await.unwrap();
        settle_tasks().await;
        outcome
    }

    fn typed(fake: &FakeSurface) -> usize {
        fake.count(|c| matches!(c, Call::Type(_)))
    }

    fn marks(fake: &FakeSurface) -> usize {
        fake.count(|c| matches!(c, Call::MarkMenu(_) | Call::MarkShortcut))
    }

    #[tokio::test(start_paused = true)]
    async fn nothing_after_last_outgoing_is_a_no_op() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![
            MessageRecord::incoming("1234567890"),
            MessageRecord::outgoing("1234567890: in stock"),
        ]);
        let outcome = run(&mut cycle, &fake).await;
        assert_eq!(outcome, CycleOutcome::NothingNew {
            title: "Ali".into()
        });
        assert_eq!(typed(&fake), 0);
        assert_eq!(marks(&fake), 0);
        assert!(alerts.alerts().is_empty());
        assert_eq!(fake.count(|c| *c == Call::FocusList), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pure_code_is_answered_without_escalation() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::Replied { report, .. } if report.confirmed == 1));
        assert_eq!(fake.sent(), vec!["1234567890: in stock, ships today"]);
        assert_eq!(marks(&fake), 0);
        assert!(alerts.alerts().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_mode_sends_exactly_one_reply() {
        let (mut cycle, _) = cycle(Some(Arc::new(Down)));
        let fake = conversation(vec![
            MessageRecord::incoming("1234567890"),
            MessageRecord::incoming("58101-2SA00"),
            MessageRecord::incoming("A1B2C3D4"),
        ]);
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::Replied { report, .. } if report.codes == 3));
        assert_eq!(fake.sent(), vec!["DEGRADED"]);
    }

    #[tokio::test(start_paused = true)]
    async fn missing_resolver_is_degraded_mode() {
        let (mut cycle, _) = cycle(None);
        let fake = conversation(vec![MessageRecord::incoming("1234567890 and 987654321")]);
        run(&mut cycle, &fake).await;
        assert_eq!(fake.sent(), vec!["DEGRADED"]);
    }

    #[tokio::test(start_paused = true)]
    async fn no_codes_escalates_without_sending() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("hello, do you have brake pads?")]);
        let outcome = run(&mut cycle, &fake).await;
        assert_eq!(outcome, CycleOutcome::Escalated {
            title: "Ali".into()
        });
        assert_eq!(fake.count(|c| *c == Call::FocusComposer), 0);
        assert_eq!(typed(&fake), 0);
        assert_eq!(marks(&fake), 1);
        let alerts = alerts.alerts();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].title, "Ali");
        assert_eq!(alerts[0].text, "hello, do you have brake pads?");
    }

    #[tokio::test(start_paused = true)]
    async fn mixed_message_replies_and_escalates() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming(
            "12345-67890 please confirm the price",
        )]);
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::RepliedAndEscalated { .. }));
        assert_eq!(fake.sent(), vec!["12345-67890: in stock, ships today"]);
        assert_eq!(marks(&fake), 1);
        assert_eq!(alerts.alerts().len(), 1);

        // Escalation happens after every reply went out.
        let calls = fake.calls();
        let last_type = calls.iter().rposition(|c| matches!(c, Call::Type(_))).unwrap();
        let mark = calls.iter().position(|c| matches!(c, Call::MarkMenu(_))).unwrap();
        assert!(mark > last_type);
    }

    #[tokio::test(start_paused = true)]
    async fn open_failure_touches_nothing() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        fake.state().opens_with = None;
        let outcome = run(&mut cycle, &fake).await;
        assert_eq!(outcome, CycleOutcome::OpenFailed {
            title: "Ali".into()
        });
        assert_eq!(fake.count(|c| matches!(c, Call::Open(_))), 6);
        assert_eq!(typed(&fake), 0);
        assert_eq!(marks(&fake), 0);
        assert!(alerts.alerts().is_empty());
        assert!(cycle.cooldown().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn open_errors_fall_through_every_strategy() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        fake.state().open_errors = true;
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::OpenFailed { .. }));
        assert_eq!(fake.count(|c| *c == Call::FocusList), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn later_strategy_opens_conversation() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        fake.state().opens_with = Some(OpenStrategy::CoordinateClick);
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::Replied { .. }));
        assert_eq!(fake.count(|c| matches!(c, Call::Open(_))), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn codes_are_deduplicated_across_messages() {
        let spy = Arc::new(Spy::default());
        let (mut cycle, _) = cycle(Some(spy.clone()));
        let fake = conversation(vec![
            MessageRecord::incoming("58101-2SA00"),
            MessageRecord::incoming("5810 12SA00"),
            MessageRecord::incoming("1234567890"),
        ]);
        run(&mut cycle, &fake).await;
        let requests = spy.0.lock().unwrap().clone();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].codes, vec!["58101-2SA00", "1234567890"]);
        assert_eq!(requests[0].delivery_text, "ships today");
    }

    #[tokio::test(start_paused = true)]
    async fn empty_resolution_sends_not_found_per_code() {
        let (mut cycle, _) = cycle(Some(Arc::new(Empty)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890, 987654321")]);
        run(&mut cycle, &fake).await;
        assert_eq!(fake.sent(), vec!["1234567890 not found", "987654321 not found"]);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_send_does_not_abort_batch() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890, 987654321")]);
        {
            let mut s = fake.state();
            s.enter_sends = false;
            s.button_sends = false;
        }
        let outcome = run(&mut cycle, &fake).await;
        let CycleOutcome::Replied { report, .. } = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(report.attempted, 2);
        assert_eq!(report.confirmed, 0);
        assert_eq!(typed(&fake), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn settle_read_picks_up_late_bubbles() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        fake.state().reads.push_back(vec![
            MessageRecord::incoming("1234567890"),
            MessageRecord::incoming("and is it genuine?"),
        ]);
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::RepliedAndEscalated { .. }));
        assert_eq!(alerts.alerts()[0].text, "and is it genuine?");
    }

    #[tokio::test(start_paused = true)]
    async fn escalated_conversation_cools_down() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("what are your hours")]);
        run(&mut cycle, &fake).await;
        assert_eq!(run(&mut cycle, &fake).await, CycleOutcome::NoUnread);
        assert_eq!(alerts.alerts().len(), 1);

        tokio::time::advance(Duration::from_secs(211)).await;
        assert!(matches!(
            run(&mut cycle, &fake).await,
            CycleOutcome::Escalated { .. }
        ));
        assert_eq!(alerts.alerts().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn cooldown_holds_when_header_differs_from_list_row() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("what are your hours")]);
        fake.state().title = Some("Ali Parts Shop".into());
        assert_eq!(run(&mut cycle, &fake).await, CycleOutcome::Escalated {
            title: "Ali Parts Shop".into()
        });
        assert_eq!(run(&mut cycle, &fake).await, CycleOutcome::NoUnread);
        assert_eq!(alerts.alerts().len(), 1);
        assert_eq!(marks(&fake), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn disable_command_leaves_without_replying() {
        let spy = Arc::new(Spy::default());
        let (mut cycle, alerts) = cycle(Some(spy.clone()));
        let fake = conversation(vec![
            MessageRecord::incoming("1234567890"),
            MessageRecord::incoming("  /Disable_Bot please"),
        ]);
        let outcome = run(&mut cycle, &fake).await;
        assert_eq!(outcome, CycleOutcome::Disabled {
            title: "Ali".into()
        });
        assert!(spy.0.lock().unwrap().is_empty());
        assert_eq!(typed(&fake), 0);
        assert_eq!(marks(&fake), 0);
        assert!(alerts.alerts().is_empty());
        assert!(cycle.cooldown().is_empty());
        assert_eq!(fake.count(|c| *c == Call::FocusList), 1);
    }

    #[rstest]
    #[case("/disable_bot", true)]
    #[case("  /DISABLE_BOT now", true)]
    #[case("please /disable_bot", false)]
    #[case("/disable", false)]
    fn disable_command_detection(#[case] text: &str, #[case] expected: bool) {
        assert_eq!(is_disable_command(text), expected);
    }

    #[tokio::test(start_paused = true)]
    async fn cooled_down_entry_is_skipped_for_next_unread() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("what are your hours")]);
        run(&mut cycle, &fake).await;
        {
            let mut s = fake.state();
            s.unread.push(ConversationHandle {
                key: 2,
                title: "Reza".into(),
            });
            s.title = Some("Reza".into());
            s.reads = [vec![MessageRecord::incoming("1234567890")]].into();
        }
        let outcome = run(&mut cycle, &fake).await;
        assert!(matches!(outcome, CycleOutcome::Replied { ref title, .. } if title == "Reza"));
    }

    #[tokio::test(start_paused = true)]
    async fn outside_hours_does_nothing() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        let tick = TickSettings {
            open: false,
            delivery_text: String::new(),
        };
        assert_eq!(
            cycle.run(&fake, &tick).await.unwrap(),
            CycleOutcome::OutsideHours
        );
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn no_unread_does_not_touch_ui() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = FakeSurface::default();
        assert_eq!(run(&mut cycle, &fake).await, CycleOutcome::NoUnread);
        assert!(fake.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn escape_when_list_not_focusable() {
        let (mut cycle, _) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("1234567890")]);
        fake.state().list_focusable = false;
        run(&mut cycle, &fake).await;
        assert_eq!(fake.calls().last(), Some(&Call::Escape));
    }

    #[tokio::test(start_paused = true)]
    async fn list_title_used_when_header_missing() {
        let (mut cycle, alerts) = cycle(Some(Arc::new(Catalog)));
        let fake = conversation(vec![MessageRecord::incoming("hi")]);
        fake.state().title = None;
        run(&mut cycle, &fake).await;
        assert_eq!(alerts.alerts()[0].title, "Ali");
    }
}
