//! Effects produced by state transitions

use crate::finalize::PostRecord;
use crate::ui::Prompt;

/// Where a rendered prompt goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Send as a new message
    Send,
    /// Edit the prompt the event came from, in place
    Replace,
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Show a prompt to the user
    Render { prompt: Prompt, mode: RenderMode },

    /// Submit the assembled record to the sinks
    Finalize { record: PostRecord },
}

impl Effect {
    pub fn send(prompt: Prompt) -> Self {
        Effect::Render {
            prompt,
            mode: RenderMode::Send,
        }
    }

    pub fn replace(prompt: Prompt) -> Self {
        Effect::Render {
            prompt,
            mode: RenderMode::Replace,
        }
    }

    pub fn is_render(&self) -> bool {
        matches!(self, Effect::Render { .. })
    }
}
