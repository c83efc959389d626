//! Long-polling loop feeding inbound events to the dispatcher

use super::types::Update;
use super::{TelegramClient, TelegramError};
use crate::runtime::Inbound;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Server-side wait per `getUpdates` call
const POLL_TIMEOUT: Duration = Duration::from_secs(25);
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(60);

/// Source of raw updates
#[async_trait]
pub trait UpdateSource: Send + Sync {
    async fn fetch(&self, offset: i64) -> Result<Vec<Update>, TelegramError>;
}

#[async_trait]
impl UpdateSource for TelegramClient {
    async fn fetch(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
        self.get_updates(offset, POLL_TIMEOUT).await
    }
}

/// Poll until cancelled or until the receiving side goes away
pub async fn run<U: UpdateSource>(source: &U, tx: &mpsc::Sender<Inbound>, cancel: &CancellationToken) {
    let mut offset = 0;
    let mut backoff = INITIAL_BACKOFF;
    tracing::info!("Update poller started");

    loop {
        let fetched = tokio::select! {
            () = cancel.cancelled() => break,
            fetched = source.fetch(offset) => fetched,
        };

        match fetched {
            Ok(updates) => {
                backoff = INITIAL_BACKOFF;
                for update in updates {
                    // Acknowledge every update, even ones we drop
                    offset = offset.max(update.update_id + 1);
                    let update_id = update.update_id;
                    let Some(inbound) = update.into_inbound() else {
                        tracing::debug!(update_id, "Ignoring update");
                        continue;
                    };
                    if tx.send(inbound).await.is_err() {
                        tracing::info!("Dispatcher gone, stopping poller");
                        return;
                    }
                }
            }
            Err(e) => {
                let delay = e.retry_after.unwrap_or(backoff);
                if e.kind.is_retryable() {
                    tracing::warn!(error = %e, kind = ?e.kind, delay_secs = delay.as_secs(), "getUpdates failed");
                } else {
                    // Usually a revoked token or a second poller on the same bot
                    tracing::error!(error = %e, kind = ?e.kind, delay_secs = delay.as_secs(), "getUpdates rejected");
                }
                if e.retry_after.is_none() {
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    tracing::info!("Update poller stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::UserId;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedSource {
        batches: Mutex<VecDeque<Result<Vec<Update>, TelegramError>>>,
        offsets: Mutex<Vec<i64>>,
        done: CancellationToken,
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch(&self, offset: i64) -> Result<Vec<Update>, TelegramError> {
            self.offsets.lock().unwrap().push(offset);
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => batch,
                None => {
                    self.done.cancel();
                    std::future::pending().await
                }
            }
        }
    }

    fn text_update(update_id: i64, text: &str) -> Update {
        serde_json::from_value(serde_json::json!({
            "update_id": update_id,
            "message": {"message_id": update_id, "chat": {"id": 7, "type": "private"}, "text": text}
        }))
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_offsets_advance_and_errors_back_off() {
        let cancel = CancellationToken::new();
        let source = ScriptedSource {
            batches: Mutex::new(VecDeque::from([
                Ok(vec![text_update(10, "hello"), text_update(11, "/start")]),
                Err(TelegramError::network("connection reset")),
                Ok(vec![text_update(12, "again")]),
            ])),
            offsets: Mutex::new(Vec::new()),
            done: cancel.clone(),
        };
        let (tx, mut rx) = mpsc::channel(8);

        run(&source, &tx, &cancel).await;
        drop(tx);

        assert_eq!(*source.offsets.lock().unwrap(), vec![0, 12, 12, 13]);
        let mut received = Vec::new();
        while let Ok(inbound) = rx.try_recv() {
            received.push(inbound);
        }
        assert_eq!(received.len(), 3);
        assert_eq!(
            received[1],
            Inbound::Command {
                user: UserId(7),
                name: "/start".to_string()
            }
        );
    }
}
