//! Per-user ordered workers
//!
//! Each user gets a worker task with its own queue, created on first use and
//! retired after a quiet period. Users are handled concurrently; one user's
//! events are handled strictly in arrival order. Routing never waits on a
//! worker, so a user stuck in slow I/O cannot hold up anyone else.

use super::executor::ComposerRuntime;
use super::traits::{Broadcaster, RecordStore, Transport};
use super::Inbound;
use crate::session::UserId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

const WORKER_QUEUE: usize = 32;
const WORKER_IDLE: Duration = Duration::from_secs(600);

pub struct Dispatcher<T, S, B>
where
    T: Transport + 'static,
    S: RecordStore + 'static,
    B: Broadcaster + 'static,
{
    runtime: Arc<ComposerRuntime<T, S, B>>,
    workers: RwLock<HashMap<UserId, mpsc::Sender<Inbound>>>,
    tracker: TaskTracker,
    idle_after: Duration,
}

impl<T, S, B> Dispatcher<T, S, B>
where
    T: Transport + 'static,
    S: RecordStore + 'static,
    B: Broadcaster + 'static,
{
    pub fn new(runtime: Arc<ComposerRuntime<T, S, B>>) -> Self {
        Self::with_idle_timeout(runtime, WORKER_IDLE)
    }

    pub fn with_idle_timeout(runtime: Arc<ComposerRuntime<T, S, B>>, idle_after: Duration) -> Self {
        Self {
            runtime,
            workers: RwLock::new(HashMap::new()),
            tracker: TaskTracker::new(),
            idle_after,
        }
    }

    /// Route inbound events until cancelled or the source closes, then
    /// wait for the workers to finish what they already accepted
    pub async fn run(&self, mut rx: mpsc::Receiver<Inbound>, cancel: &CancellationToken) {
        tracing::info!("Dispatcher started");
        loop {
            tokio::select! {
                () = cancel.cancelled() => break,
                inbound = rx.recv() => match inbound {
                    Some(inbound) => self.dispatch(inbound).await,
                    None => break,
                },
            }
        }
        self.shutdown().await;
        tracing::info!("Dispatcher stopped");
    }

    /// Queue an event on its user's worker. A full queue drops the event.
    pub async fn dispatch(&self, mut inbound: Inbound) {
        let user = inbound.user();
        // A worker may retire between lookup and send; retry once on a fresh one
        for _ in 0..2 {
            let tx = self.get_or_create(user).await;
            match tx.try_send(inbound) {
                Ok(()) => return,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::warn!(%user, queued = WORKER_QUEUE, "Worker queue full, dropping event");
                    return;
                }
                Err(mpsc::error::TrySendError::Closed(returned)) => inbound = returned,
            }
        }
        tracing::error!(%user, "No worker accepted the event");
    }

    /// Close every queue and wait until the workers have drained them
    pub async fn shutdown(&self) {
        let workers = std::mem::take(&mut *self.workers.write().await);
        tracing::info!(workers = workers.len(), "Draining workers");
        drop(workers);
        self.tracker.close();
        self.tracker.wait().await;
    }

    #[allow(dead_code)] // Used for debugging
    pub async fn active_workers(&self) -> usize {
        self.workers
            .read()
            .await
            .values()
            .filter(|tx| !tx.is_closed())
            .count()
    }

    async fn get_or_create(&self, user: UserId) -> mpsc::Sender<Inbound> {
        // Check if already running
        {
            let workers = self.workers.read().await;
            if let Some(tx) = workers.get(&user).filter(|tx| !tx.is_closed()) {
                return tx.clone();
            }
        }

        let mut workers = self.workers.write().await;
        workers.retain(|_, tx| !tx.is_closed());
        if let Some(tx) = workers.get(&user) {
            return tx.clone();
        }

        let (tx, rx) = mpsc::channel(WORKER_QUEUE);
        let runtime = Arc::clone(&self.runtime);
        let idle_after = self.idle_after;
        self.tracker.spawn(async move {
            worker(&runtime, user, rx, idle_after).await;
        });
        workers.insert(user, tx.clone());
        tx
    }
}

async fn worker<T, S, B>(
    runtime: &ComposerRuntime<T, S, B>,
    user: UserId,
    mut rx: mpsc::Receiver<Inbound>,
    idle_after: Duration,
) where
    T: Transport + 'static,
    S: RecordStore + 'static,
    B: Broadcaster + 'static,
{
    tracing::debug!(%user, "Worker started");
    loop {
        match tokio::time::timeout(idle_after, rx.recv()).await {
            Ok(Some(inbound)) => {
                runtime.handle(inbound).await;
            }
            Ok(None) => break,
            Err(_) => {
                // Refuse new events, then finish what is already queued
                rx.close();
                while let Some(inbound) = rx.recv().await {
                    runtime.handle(inbound).await;
                }
                break;
            }
        }
    }
    tracing::debug!(%user, "Worker retired");
}
