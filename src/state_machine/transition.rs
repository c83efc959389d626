//! Pure state transition function
//!
//! Every (state, event) pair has exactly one outcome: a next session with
//! effects, or `NoTransition`, which the runtime drops silently.

use super::{ComposeContext, ComposeState, ContentPayload, Effect, Event};
use crate::calendar::{parse_manual_date, parse_manual_time};
use crate::finalize::PostRecord;
use crate::prompts;
use crate::session::Session;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("No transition from {state} on {event}")]
    NoTransition {
        state: &'static str,
        event: &'static str,
    },
}

/// Pure transition function
///
/// Given the same inputs it always produces the same outputs. `now` is the
/// instant the event is handled at; it stamps new sessions and resolves
/// "publish now".
#[allow(clippy::too_many_lines)]
pub fn transition(
    session: &Session,
    context: &ComposeContext,
    event: Event,
    now: NaiveDateTime,
) -> Result<TransitionResult, TransitionError> {
    let today = now.date();

    match (session.state, event) {
        // ============================================================
        // Session lifecycle (any state)
        // ============================================================
        (_, Event::Start | Event::NewPost) => Ok(TransitionResult::new(Session::new(
            session.user_id,
            now,
        ))
        .with_effect(Effect::send(prompts::content()))),

        (_, Event::Cancel) => Ok(TransitionResult::new(Session::idle(session.user_id, now))
            .with_effect(Effect::send(prompts::cancelled()))),

        // ============================================================
        // Content
        // ============================================================

        // First content without an open session opens one
        (ComposeState::Idle, Event::Content(content)) => {
            let mut next = Session::new(session.user_id, now);
            next.merge_content(content);
            Ok(enter_date_step(next, context, today))
        }

        (ComposeState::AwaitingContent, Event::Content(content)) => {
            let mut next = session.clone();
            next.merge_content(content);
            Ok(enter_date_step(next, context, today))
        }

        (ComposeState::AwaitingContent, Event::SkipContent) => {
            Ok(enter_date_step(session.clone(), context, today))
        }

        // ============================================================
        // Date
        // ============================================================
        (ComposeState::AwaitingDate, Event::PickDate(date)) => {
            Ok(date_chosen(session.clone(), context, date, None))
        }

        (ComposeState::AwaitingDate, Event::ManualEntry) => Ok(TransitionResult::new(
            session.clone(),
        )
        .with_effect(Effect::send(prompts::manual_entry()))),

        (
            ComposeState::AwaitingDate,
            Event::Content(ContentPayload {
                text: Some(text), ..
            }),
        ) => match parse_manual_date(&text) {
            // The grid never offers past days; typed dates follow suit
            Ok(schedule) if schedule.date < today => Ok(TransitionResult::new(session.clone())
                .with_effect(Effect::send(prompts::date_in_past(today)))),
            Ok(schedule) => Ok(date_chosen(
                session.clone(),
                context,
                schedule.date,
                schedule.time,
            )),
            // Rejected input leaves the session untouched
            Err(_) => Ok(TransitionResult::new(session.clone())
                .with_effect(Effect::send(prompts::date_error()))),
        },

        (ComposeState::AwaitingDate, Event::PublishNow) => {
            let mut next = session.clone();
            next.scheduled_date = Some(today);
            next.scheduled_time = Some(truncate_to_minute(now.time()));
            Ok(enter_platform_step(next, context))
        }

        // ============================================================
        // Time
        // ============================================================
        (ComposeState::AwaitingTime, Event::PickHour(hour)) => {
            let minute = session.scheduled_time.map_or(0, |t| t.minute());
            pick_time(session, hour, minute)
        }

        (ComposeState::AwaitingTime, Event::PickMinute(minute)) => {
            let hour = session.scheduled_time.map_or(0, |t| t.hour());
            pick_time(session, hour, minute)
        }

        (
            ComposeState::AwaitingTime,
            Event::Content(ContentPayload {
                text: Some(text), ..
            }),
        ) => match parse_manual_time(&text) {
            Ok(time) => {
                let mut next = session.clone();
                next.scheduled_time = Some(time);
                Ok(enter_platform_step(next, context))
            }
            Err(_) => Ok(TransitionResult::new(session.clone())
                .with_effect(Effect::send(prompts::time_error()))),
        },

        (ComposeState::AwaitingTime, Event::TimeDone) => {
            Ok(enter_platform_step(session.clone(), context))
        }

        // ============================================================
        // Platforms
        // ============================================================
        (ComposeState::AwaitingPlatforms, Event::TogglePlatform(id))
            if context.platforms.contains(&id) =>
        {
            let mut next = session.clone();
            next.platforms.toggle(&id);
            let prompt = context.platforms.prompt(&next.platforms, None);
            Ok(TransitionResult::new(next).with_effect(Effect::replace(prompt)))
        }

        // Confirming an empty selection is blocked, whatever the flow
        (ComposeState::AwaitingPlatforms, Event::Confirm) if session.platforms.is_empty() => {
            let prompt = context
                .platforms
                .prompt(&session.platforms, Some(prompts::EMPTY_PLATFORMS_NOTICE));
            Ok(TransitionResult::new(session.clone()).with_effect(Effect::replace(prompt)))
        }

        (ComposeState::AwaitingPlatforms, Event::Confirm) => {
            let record = PostRecord::from_session(session, &context.platforms, now);
            Ok(TransitionResult::new(Session::idle(session.user_id, now))
                .with_effect(Effect::Finalize { record }))
        }

        // ============================================================
        // Anything else is stale or out of order
        // ============================================================
        (state, event) => Err(TransitionError::NoTransition {
            state: state.as_str(),
            event: event.kind(),
        }),
    }
}

fn enter_date_step(mut next: Session, context: &ComposeContext, today: NaiveDate) -> TransitionResult {
    next.state = ComposeState::AwaitingDate;
    TransitionResult::new(next).with_effect(Effect::send(prompts::date(context, today)))
}

fn date_chosen(
    mut next: Session,
    context: &ComposeContext,
    date: NaiveDate,
    time: Option<NaiveTime>,
) -> TransitionResult {
    next.scheduled_date = Some(date);
    next.scheduled_time = time;

    if context.pick_time && time.is_none() {
        next.state = ComposeState::AwaitingTime;
        let prompt = prompts::time(next.scheduled_date, None);
        TransitionResult::new(next).with_effect(Effect::send(prompt))
    } else {
        enter_platform_step(next, context)
    }
}

fn pick_time(session: &Session, hour: u32, minute: u32) -> Result<TransitionResult, TransitionError> {
    let Some(time) = NaiveTime::from_hms_opt(hour, minute, 0) else {
        return Err(TransitionError::NoTransition {
            state: session.state.as_str(),
            event: "pick_time",
        });
    };
    let mut next = session.clone();
    next.scheduled_time = Some(time);
    let prompt = prompts::time(next.scheduled_date, next.scheduled_time);
    Ok(TransitionResult::new(next).with_effect(Effect::replace(prompt)))
}

fn enter_platform_step(mut next: Session, context: &ComposeContext) -> TransitionResult {
    next.state = ComposeState::AwaitingPlatforms;
    let prompt = context.platforms.prompt(&next.platforms, None);
    TransitionResult::new(next).with_effect(Effect::send(prompt))
}

fn truncate_to_minute(time: NaiveTime) -> NaiveTime {
    NaiveTime::from_hms_opt(time.hour(), time.minute(), 0).unwrap_or(time)
}
