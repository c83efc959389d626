//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::TransitionError;
use super::*;
use crate::calendar::MANUAL_DATE_FORMAT;
use crate::session::{MediaRef, Session, UserId};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use proptest::prelude::*;

// ============================================================================
// Test Helpers
// ============================================================================

fn test_context() -> ComposeContext {
    ComposeContext::default()
}

fn test_now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2025, 5, 10)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

fn session_in(state: ComposeState) -> Session {
    Session {
        state,
        ..Session::new(UserId(1), test_now())
    }
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_state() -> impl Strategy<Value = ComposeState> {
    prop_oneof![
        Just(ComposeState::Idle),
        Just(ComposeState::AwaitingContent),
        Just(ComposeState::AwaitingDate),
        Just(ComposeState::AwaitingTime),
        Just(ComposeState::AwaitingPlatforms),
    ]
}

fn arb_platform_id() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("Telegram".to_string()),
        Just("Instagram".to_string()),
        Just("VK".to_string()),
        Just("Unknown".to_string()),
    ]
}

fn arb_date() -> impl Strategy<Value = NaiveDate> {
    (0i64..400).prop_map(|offset| test_now().date() + Duration::days(offset))
}

fn arb_content() -> impl Strategy<Value = ContentPayload> {
    (
        proptest::option::of("[a-zA-Z0-9 .:]{0,20}"),
        proptest::option::of("[a-z]{4}".prop_map(MediaRef)),
        proptest::option::of("[a-z]{4}".prop_map(MediaRef)),
    )
        .prop_map(|(text, photo, video)| ContentPayload { text, photo, video })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        Just(Event::Start),
        Just(Event::NewPost),
        Just(Event::Cancel),
        arb_content().prop_map(Event::Content),
        Just(Event::SkipContent),
        arb_date().prop_map(Event::PickDate),
        Just(Event::ManualEntry),
        Just(Event::PublishNow),
        (0u32..24).prop_map(Event::PickHour),
        (0u32..12).prop_map(|m| Event::PickMinute(m * 5)),
        Just(Event::TimeDone),
        arb_platform_id().prop_map(Event::TogglePlatform),
        Just(Event::Confirm),
    ]
}

// ============================================================================
// State Validity Checkers
// ============================================================================

fn is_valid_session(session: &Session, context: &ComposeContext) -> bool {
    let platforms_known = context
        .platforms
        .ordered(&session.platforms)
        .len()
        == session.platforms.len();

    // A time is only ever set together with a date
    let time_has_date = session.scheduled_time.is_none() || session.scheduled_date.is_some();

    let phase_ok = match session.state {
        ComposeState::AwaitingContent | ComposeState::AwaitingDate => {
            session.scheduled_date.is_none() && session.platforms.is_empty()
        }
        ComposeState::AwaitingTime => session.scheduled_date.is_some(),
        ComposeState::Idle | ComposeState::AwaitingPlatforms => true,
    };

    platforms_known && time_has_date && phase_ok
}

fn effects_are_valid(effects: &[Effect], session: &Session) -> bool {
    let renders = effects.iter().filter(|e| e.is_render()).count();
    let finalizes = effects
        .iter()
        .filter(|e| matches!(e, Effect::Finalize { .. }))
        .count();

    // Finalize only ever accompanies the return to Idle
    if finalizes > 0 && session.state != ComposeState::Idle {
        return false;
    }

    renders + finalizes == 1
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1000))]

    // Invariant 1: Valid session after any sequence of events
    #[test]
    fn prop_transitions_preserve_validity(events in proptest::collection::vec(arb_event(), 0..30)) {
        let context = test_context();
        let mut session = Session::idle(UserId(1), test_now());

        for event in events {
            match transition(&session, &context, event, test_now()) {
                Ok(result) => {
                    session = result.session;
                    prop_assert!(is_valid_session(&session, &context), "Invalid session: {:?}", session);
                    prop_assert!(
                        effects_are_valid(&result.effects, &session),
                        "Invalid effects for {:?}: {:?}",
                        session.state,
                        result.effects
                    );
                }
                Err(_) => { /* Stale or out-of-order events are dropped */ }
            }
        }
    }

    // Invariant 2: Toggling a platform an even number of times leaves it unselected
    #[test]
    fn prop_toggle_parity(id in arb_platform_id(), times in 1usize..8) {
        let context = test_context();
        let mut session = session_in(ComposeState::AwaitingPlatforms);

        for _ in 0..times {
            if let Ok(result) = transition(&session, &context, Event::TogglePlatform(id.clone()), test_now()) {
                session = result.session;
            }
        }

        let expected = context.platforms.contains(&id) && times % 2 == 1;
        prop_assert_eq!(session.platforms.contains(&id), expected);
    }

    // Invariant 3: Confirm is meaningless outside the platform step
    #[test]
    fn prop_confirm_only_in_platform_step(state in arb_state()) {
        prop_assume!(state != ComposeState::AwaitingPlatforms);
        let result = transition(&session_in(state), &test_context(), Event::Confirm, test_now());
        prop_assert!(
            matches!(result, Err(TransitionError::NoTransition { .. })),
            "Confirm accepted in {:?}",
            state
        );
    }

    // Invariant 4: A well-formed manual date is taken exactly
    #[test]
    fn prop_manual_date_round_trip(date in arb_date()) {
        let text = date.format(MANUAL_DATE_FORMAT).to_string();
        let result = transition(
            &session_in(ComposeState::AwaitingDate),
            &test_context(),
            Event::Content(ContentPayload::text(text)),
            test_now(),
        );
        let result = result.unwrap();
        prop_assert_eq!(result.session.scheduled_date, Some(date));
        prop_assert_eq!(result.session.state, ComposeState::AwaitingTime);
    }

    // Invariant 5: Malformed manual input never changes the session
    #[test]
    fn prop_malformed_manual_date_keeps_session(text in "[a-zA-Z ]{1,20}") {
        let session = session_in(ComposeState::AwaitingDate);
        let result = transition(
            &session,
            &test_context(),
            Event::Content(ContentPayload::text(text)),
            test_now(),
        )
        .unwrap();
        prop_assert_eq!(result.session, session);
        prop_assert_eq!(result.effects.len(), 1);
    }

    // Invariant 6: Cancel from any state ends composition
    #[test]
    fn prop_cancel_always_idles(state in arb_state()) {
        let result = transition(&session_in(state), &test_context(), Event::Cancel, test_now()).unwrap();
        prop_assert_eq!(result.session.state, ComposeState::Idle);
        prop_assert!(result.effects.iter().all(Effect::is_render));
    }

    // Invariant 7: Nothing leaks from a finalized post into the next one
    #[test]
    fn prop_finalize_leaves_no_residue(
        content in arb_content(),
        id in prop_oneof![Just("Telegram"), Just("Instagram"), Just("VK")],
    ) {
        let context = test_context();
        let mut session = session_in(ComposeState::AwaitingPlatforms);
        session.merge_content(content);
        session.scheduled_date = Some(test_now().date());
        session.platforms.toggle(id);

        let done = transition(&session, &context, Event::Confirm, test_now()).unwrap();
        prop_assert_eq!(done.session.state, ComposeState::Idle);

        let next = transition(
            &done.session,
            &context,
            Event::Content(ContentPayload::text("next")),
            test_now(),
        )
        .unwrap();
        prop_assert!(next.session.platforms.is_empty());
        prop_assert_eq!(next.session.photo, None);
        prop_assert_eq!(next.session.video, None);
        prop_assert_eq!(next.session.scheduled_date, None);
    }
}

// ============================================================================
// Scenario Tests
// ============================================================================

#[test]
fn test_launch_post_walkthrough() {
    let context = test_context();
    let now = test_now();
    let target = NaiveDate::from_ymd_opt(2025, 5, 17).unwrap();

    let steps = [
        Event::Start,
        Event::Content(ContentPayload::text("Launch post")),
        Event::Content(ContentPayload::text("17.05.2025")),
        Event::PickHour(18),
        Event::PickMinute(30),
        Event::TimeDone,
        Event::TogglePlatform("Telegram".to_string()),
        Event::TogglePlatform("VK".to_string()),
        Event::TogglePlatform("Telegram".to_string()),
    ];

    let mut session = Session::idle(UserId(1), now);
    for event in steps {
        session = transition(&session, &context, event, now).unwrap().session;
    }
    assert_eq!(session.state, ComposeState::AwaitingPlatforms);

    let result = transition(&session, &context, Event::Confirm, now).unwrap();
    assert_eq!(result.session.state, ComposeState::Idle);
    match &result.effects[..] {
        [Effect::Finalize { record }] => {
            assert_eq!(record.text.as_deref(), Some("Launch post"));
            assert_eq!(record.scheduled_date, target);
            assert_eq!(
                record.scheduled_time,
                chrono::NaiveTime::from_hms_opt(18, 30, 0)
            );
            assert_eq!(record.platforms, vec!["VK".to_string()]);
        }
        other => panic!("expected a single finalize, got {other:?}"),
    }
}

#[test]
fn test_double_confirm_finalizes_once() {
    let context = test_context();
    let mut session = session_in(ComposeState::AwaitingPlatforms);
    session.platforms.toggle("Instagram");

    let first = transition(&session, &context, Event::Confirm, test_now()).unwrap();
    let second = transition(&first.session, &context, Event::Confirm, test_now());
    assert!(matches!(second, Err(TransitionError::NoTransition { .. })));
}
