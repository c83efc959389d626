//! Post composition state machine
//!
//! Implements the Elm Architecture pattern with pure state transitions:
//! `transition` reads a session and an event and returns the next session
//! plus the effects the runtime must carry out. No I/O happens here.

mod effect;
pub mod event;
pub mod state;
pub(crate) mod transition;

#[cfg(test)]
mod proptests;

pub use effect::{Effect, RenderMode};
pub use event::{ContentPayload, Event};
pub use state::{ComposeContext, ComposeState};
pub use transition::transition;
