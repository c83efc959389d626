//! Keep-alive HTTP listener
//!
//! Hosting platforms ping the bot to keep it awake; `/health` also reports
//! how many posts are being composed.

mod handlers;
mod types;

pub use handlers::create_router;

use crate::session::SessionStore;
use std::sync::Arc;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(sessions: Arc<SessionStore>) -> Self {
        Self { sessions }
    }
}
