//! Composer runtime executor

use super::traits::{Broadcaster, RecordStore, Transport};
use super::{Clock, Inbound};
use crate::finalize::FinalizeService;
use crate::prompts;
use crate::session::{MessageRef, Session, SessionStore, UserId};
use crate::state_machine::{
    transition, ComposeContext, ComposeState, ContentPayload, Effect, Event, RenderMode,
};
use crate::ui::{Action, Prompt};
use std::sync::Arc;

/// What became of one inbound event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Handled {
    /// A transition ran; the user is now in this state
    Applied(ComposeState),
    /// Unknown command, inert button, stale or out-of-order event
    Ignored,
    /// A callback that was already handled
    Duplicate,
}

/// Generic composer runtime that can work with any transport and sinks
pub struct ComposerRuntime<T, S, B>
where
    T: Transport + 'static,
    S: RecordStore + 'static,
    B: Broadcaster + 'static,
{
    context: ComposeContext,
    sessions: Arc<SessionStore>,
    transport: T,
    finalizer: FinalizeService<S, B>,
    clock: Clock,
}

impl<T, S, B> ComposerRuntime<T, S, B>
where
    T: Transport + 'static,
    S: RecordStore + 'static,
    B: Broadcaster + 'static,
{
    pub fn new(
        context: ComposeContext,
        sessions: Arc<SessionStore>,
        transport: T,
        finalizer: FinalizeService<S, B>,
        clock: Clock,
    ) -> Self {
        Self {
            context,
            sessions,
            transport,
            finalizer,
            clock,
        }
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    /// Handle one inbound event to completion.
    ///
    /// The user's slot stays locked for the whole call, so events of one
    /// user never interleave, including their transport and sink I/O.
    pub async fn handle(&self, inbound: Inbound) -> Handled {
        let user = inbound.user();
        let mut slot = self.sessions.lock(user).await;

        let (event, origin) = match inbound {
            Inbound::Command { name, .. } => {
                let Some(event) = Event::from_command(&name) else {
                    tracing::debug!(%user, command = %name, "Unknown command");
                    return Handled::Ignored;
                };
                (event, None)
            }
            Inbound::Content {
                text, photo, video, ..
            } => (Event::Content(ContentPayload { text, photo, video }), None),
            Inbound::Callback {
                id, message, token, ..
            } => {
                if let Err(e) = self.transport.acknowledge(&id).await {
                    tracing::warn!(%user, error = %e, "Failed to acknowledge callback");
                }
                if !slot.remember_callback(&id) {
                    tracing::debug!(%user, callback = %id, "Duplicate callback");
                    return Handled::Duplicate;
                }
                let Some(event) = Action::decode(&token).and_then(Event::from_action) else {
                    tracing::debug!(%user, %token, "Inert or unknown button");
                    return Handled::Ignored;
                };
                (event, message)
            }
        };

        let now = (self.clock)();
        let current = slot
            .get()
            .cloned()
            .unwrap_or_else(|| Session::idle(user, now));
        let kind = event.kind();

        let result = match transition(&current, &self.context, event, now) {
            Ok(result) => result,
            Err(e) => {
                tracing::debug!(%user, error = %e, "Event dropped");
                return Handled::Ignored;
            }
        };

        let mut next = result.session;
        next.touched_at = now;
        tracing::info!(
            %user,
            event = kind,
            from = current.state.as_str(),
            to = next.state.as_str(),
            "Transition"
        );

        for effect in result.effects {
            self.execute_effect(&mut next, origin, effect).await;
        }

        let state = next.state;
        if state.is_composing() {
            slot.upsert(next);
        } else {
            slot.delete();
            self.sessions.release(user, slot).await;
        }
        Handled::Applied(state)
    }

    /// Execute an effect. Transport failures are logged, never fatal.
    async fn execute_effect(&self, session: &mut Session, origin: Option<MessageRef>, effect: Effect) {
        let user = session.user_id;
        match effect {
            Effect::Render { prompt, mode } => {
                let target = match mode {
                    RenderMode::Replace => origin.or(session.prompt),
                    RenderMode::Send => None,
                };
                if let Some(message) = target {
                    match self.transport.edit_prompt(&message, &prompt).await {
                        Ok(()) => {
                            session.prompt = Some(message);
                            return;
                        }
                        Err(e) => {
                            tracing::warn!(%user, error = %e, "Edit failed, sending instead");
                        }
                    }
                }
                if let Some(message) = self.send(user, &prompt).await {
                    session.prompt = Some(message);
                }
            }

            Effect::Finalize { record } => {
                let report = self.finalizer.finalize(&record).await;
                tracing::info!(
                    %user,
                    submission = %report.submission,
                    store = ?report.store,
                    broadcast = ?report.broadcast,
                    "Post finalized"
                );
                for text in prompts::finalize_report(&report) {
                    self.send(user, &Prompt::plain(text)).await;
                }
                self.send(user, &prompts::finished()).await;
            }
        }
    }

    async fn send(&self, user: UserId, prompt: &Prompt) -> Option<MessageRef> {
        match self.transport.send_prompt(user, prompt).await {
            Ok(message) => Some(message),
            Err(e) => {
                tracing::warn!(%user, error = %e, kind = ?e.kind, "Failed to send message");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::finalize::PostRecord;
    use crate::runtime::testing::{fixed_clock, MockBroadcaster, MockRecordStore, MockTransport, Sent};
    use crate::session::{MediaKind, MediaRef};
    use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

    type TestRuntime = ComposerRuntime<Arc<MockTransport>, Arc<MockRecordStore>, Arc<MockBroadcaster>>;

    const USER: UserId = UserId(42);

    struct Harness {
        runtime: TestRuntime,
        transport: Arc<MockTransport>,
        store: Arc<MockRecordStore>,
        broadcaster: Arc<MockBroadcaster>,
        callbacks: std::sync::atomic::AtomicU32,
    }

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 10)
            .unwrap()
            .and_hms_opt(9, 15, 0)
            .unwrap()
    }

    fn harness() -> Harness {
        let transport = Arc::new(MockTransport::new());
        let store = Arc::new(MockRecordStore::new());
        let broadcaster = Arc::new(MockBroadcaster::new());
        let runtime = ComposerRuntime::new(
            ComposeContext::default(),
            Arc::new(SessionStore::new()),
            transport.clone(),
            FinalizeService::new(Some(store.clone()), Some(broadcaster.clone()), "Telegram"),
            fixed_clock(now()),
        );
        Harness {
            runtime,
            transport,
            store,
            broadcaster,
            callbacks: std::sync::atomic::AtomicU32::new(0),
        }
    }

    impl Harness {
        async fn command(&self, name: &str) -> Handled {
            self.runtime
                .handle(Inbound::Command {
                    user: USER,
                    name: name.to_string(),
                })
                .await
        }

        async fn text(&self, text: &str) -> Handled {
            self.runtime
                .handle(Inbound::Content {
                    user: USER,
                    text: Some(text.to_string()),
                    photo: None,
                    video: None,
                })
                .await
        }

        /// Press a button with a fresh callback id, on the current prompt
        async fn press(&self, action: Action) -> Handled {
            let n = self
                .callbacks
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.press_with_id(&format!("cb-{n}"), action).await
        }

        async fn press_with_id(&self, id: &str, action: Action) -> Handled {
            let message = self.session().await.and_then(|s| s.prompt);
            self.runtime
                .handle(Inbound::Callback {
                    user: USER,
                    id: id.to_string(),
                    message,
                    token: action.encode(),
                })
                .await
        }

        async fn session(&self) -> Option<Session> {
            self.runtime.sessions().get(USER).await
        }

        fn texts(&self) -> Vec<String> {
            self.transport
                .sent()
                .iter()
                .map(|s| s.text().to_string())
                .collect()
        }
    }

    fn only_record(store: &MockRecordStore) -> PostRecord {
        let records = store.records();
        assert_eq!(records.len(), 1, "expected exactly one stored record");
        records.into_iter().next().unwrap()
    }

    #[tokio::test]
    async fn test_launch_post_scenario() {
        let h = harness();
        let target = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();

        assert_eq!(h.command("/start").await, Handled::Applied(ComposeState::AwaitingContent));
        assert_eq!(h.text("Launch post").await, Handled::Applied(ComposeState::AwaitingDate));
        assert!(h.transport.last_keyboard().unwrap().find(&Action::PickDate(target)).is_some());

        assert_eq!(
            h.press(Action::PickDate(target)).await,
            Handled::Applied(ComposeState::AwaitingTime)
        );
        h.press(Action::PickHour(18)).await;
        h.press(Action::PickMinute(30)).await;
        assert_eq!(h.press(Action::TimeDone).await, Handled::Applied(ComposeState::AwaitingPlatforms));

        h.press(Action::TogglePlatform("Telegram".to_string())).await;
        h.press(Action::TogglePlatform("VK".to_string())).await;
        assert!(h.texts().iter().any(|t| t == "✅ Выбрано: Telegram, VK"));

        assert_eq!(h.press(Action::Confirm).await, Handled::Applied(ComposeState::Idle));
        assert_eq!(h.session().await, None);

        let record = only_record(&h.store);
        assert_eq!(record.text.as_deref(), Some("Launch post"));
        assert_eq!(record.scheduled_date, target);
        assert_eq!(record.scheduled_time, NaiveTime::from_hms_opt(18, 30, 0));
        assert_eq!(record.platforms, vec!["Telegram", "VK"]);

        assert_eq!(
            h.broadcaster.sent(),
            vec![(MediaKind::Text, None, "Launch post".to_string())]
        );
        let texts = h.texts();
        assert!(texts.contains(&"✅ Пост добавлен в Airtable!".to_string()));
        assert!(texts.contains(&"📢 Пост опубликован в канале.".to_string()));
        assert!(texts.last().unwrap().starts_with("🟢"));
    }

    #[tokio::test]
    async fn test_in_place_rerenders_edit_the_prompt() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::PublishNow).await;
        let prompt = h.session().await.unwrap().prompt.unwrap();

        h.transport.clear();
        h.press(Action::TogglePlatform("Instagram".to_string())).await;

        match &h.transport.sent()[..] {
            [Sent::Edit { message, text, .. }] => {
                assert_eq!(*message, prompt);
                assert_eq!(text, "✅ Выбрано: Instagram");
            }
            other => panic!("expected one edit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_store_failure_does_not_block_broadcast() {
        let h = harness();
        h.store.fail_with("{\"error\":\"INVALID_PERMISSIONS\"}");

        h.command("/start").await;
        h.runtime
            .handle(Inbound::Content {
                user: USER,
                text: None,
                photo: Some(MediaRef::new("photo-1")),
                video: None,
            })
            .await;
        h.press(Action::PublishNow).await;
        h.press(Action::TogglePlatform("Telegram".to_string())).await;
        h.press(Action::Confirm).await;

        assert!(h.store.records().is_empty());
        assert_eq!(
            h.broadcaster.sent(),
            vec![(
                MediaKind::Photo,
                Some(MediaRef::new("photo-1")),
                "📝 Пост без текста.".to_string()
            )]
        );
        let texts = h.texts();
        assert!(texts.iter().any(|t| t.starts_with("❌ Ошибка: HTTP 422")));
        assert!(texts.contains(&"📢 Пост опубликован в канале.".to_string()));
        assert_eq!(h.session().await, None);
    }

    #[tokio::test]
    async fn test_duplicate_callback_is_processed_once() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::PublishNow).await;

        let toggle = Action::TogglePlatform("VK".to_string());
        assert!(matches!(h.press_with_id("same", toggle.clone()).await, Handled::Applied(_)));
        assert_eq!(h.press_with_id("same", toggle).await, Handled::Duplicate);

        assert!(h.session().await.unwrap().platforms.contains("VK"));
        // Both deliveries were acknowledged so the client stops spinning
        assert_eq!(
            h.transport.acknowledged().iter().filter(|id| *id == "same").count(),
            2
        );
    }

    #[tokio::test]
    async fn test_double_tap_confirm_finalizes_once() {
        let h = Arc::new(harness());
        h.command("/start").await;
        h.text("Launch post").await;
        h.press(Action::PublishNow).await;
        h.press(Action::TogglePlatform("Instagram".to_string())).await;

        let first = {
            let h = h.clone();
            tokio::spawn(async move { h.press_with_id("tap-1", Action::Confirm).await })
        };
        let second = {
            let h = h.clone();
            tokio::spawn(async move { h.press_with_id("tap-2", Action::Confirm).await })
        };
        let mut outcomes = vec![first.await.unwrap(), second.await.unwrap()];
        outcomes.sort_by_key(|o| matches!(o, Handled::Ignored));

        assert_eq!(outcomes, vec![Handled::Applied(ComposeState::Idle), Handled::Ignored]);
        assert_eq!(h.store.records().len(), 1);
    }

    #[tokio::test]
    async fn test_confirm_without_platforms_stays_put() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::PublishNow).await;

        assert_eq!(h.press(Action::Confirm).await, Handled::Applied(ComposeState::AwaitingPlatforms));
        assert!(h.store.records().is_empty());
        assert!(h.texts().last().unwrap().starts_with(prompts::EMPTY_PLATFORMS_NOTICE));
    }

    #[tokio::test]
    async fn test_cancel_discards_session() {
        let h = harness();
        h.command("/start").await;
        h.text("draft").await;
        assert_eq!(h.command("/cancel").await, Handled::Applied(ComposeState::Idle));
        assert_eq!(h.session().await, None);

        // The next content starts over with nothing carried across
        h.text("fresh").await;
        let session = h.session().await.unwrap();
        assert_eq!(session.text.as_deref(), Some("fresh"));
        assert!(session.platforms.is_empty());
    }

    #[tokio::test]
    async fn test_stale_buttons_are_ignored() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::PublishNow).await;
        let before = h.session().await;

        let stale_date = NaiveDate::from_ymd_opt(2025, 5, 20).unwrap();
        assert_eq!(h.press(Action::PickDate(stale_date)).await, Handled::Ignored);
        assert_eq!(h.press(Action::PickHour(7)).await, Handled::Ignored);
        assert_eq!(h.press(Action::Noop).await, Handled::Ignored);
        assert_eq!(h.command("/help").await, Handled::Ignored);
        assert_eq!(
            h.runtime
                .handle(Inbound::Callback {
                    user: USER,
                    id: "garbage".to_string(),
                    message: None,
                    token: "date:not-a-date".to_string(),
                })
                .await,
            Handled::Ignored
        );

        assert_eq!(h.session().await, before);
    }

    #[tokio::test]
    async fn test_manual_date_error_reprompts() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::ManualEntry).await;

        assert_eq!(h.text("32.13.2025").await, Handled::Applied(ComposeState::AwaitingDate));
        assert_eq!(h.texts().last().unwrap(), "❌ Неверный формат. Пример: 17.05.2025");

        assert_eq!(h.text("17.05.2025").await, Handled::Applied(ComposeState::AwaitingTime));
        assert_eq!(
            h.session().await.unwrap().scheduled_date,
            NaiveDate::from_ymd_opt(2025, 5, 17)
        );
    }

    #[tokio::test]
    async fn test_failed_edit_falls_back_to_send() {
        let h = harness();
        h.command("/start").await;
        h.press(Action::SkipContent).await;
        h.press(Action::PublishNow).await;

        h.transport.clear();
        h.transport.fail_next("Bad Request: message to edit not found");
        h.press(Action::TogglePlatform("VK".to_string())).await;

        match &h.transport.sent()[..] {
            [Sent::Prompt { message_id, .. }] => {
                assert_eq!(h.session().await.unwrap().prompt.unwrap().message_id, *message_id);
            }
            other => panic!("expected a fresh prompt, got {other:?}"),
        }
    }
}
