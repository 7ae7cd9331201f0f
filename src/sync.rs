//! Background polling of the ledger service.
//!
//! The worker fetches once immediately, then on every tick of the poll
//! interval, and additionally whenever a [`SyncCommand::FetchNow`] arrives.
//! Each fetch runs as its own task so a slow poll never holds back a
//! refresh requested after a submission. Every fetch is stamped with a
//! generation; only a snapshot carrying the latest issued generation may be
//! shown.

use std::{
    sync::{
        Arc,
        atomic::{
            AtomicU64,
            Ordering,
        },
    },
    time::Duration,
};

use tokio::{
    sync::mpsc,
    time::{
        self,
        MissedTickBehavior,
    },
};
use tracing::{
    debug,
    warn,
};

use crate::{
    ledger_client::LedgerApi,
    snapshot::Snapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncCommand {
    FetchNow,
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    Snapshot { generation: u64, snapshot: Snapshot },
}

/// Monotonic counter shared by the worker (which issues generations) and
/// the view (which checks them).
#[derive(Debug, Clone, Default)]
pub struct FetchGenerations {
    latest: Arc<AtomicU64>,
}

impl FetchGenerations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new fetch. The first generation issued is 1.
    pub fn issue(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }

    pub fn is_latest(&self, generation: u64) -> bool {
        generation == self.latest()
    }
}

/// Sending side of the worker's command channel.
#[derive(Debug, Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<SyncCommand>,
}

impl SyncHandle {
    pub fn new(commands: mpsc::UnboundedSender<SyncCommand>) -> Self {
        Self { commands }
    }

    pub fn request_fetch(&self) {
        if self.commands.send(SyncCommand::FetchNow).is_err() {
            warn!("snapshot worker is gone; refresh request dropped");
        }
    }

    pub fn shutdown(&self) {
        let _ = self.commands.send(SyncCommand::Shutdown);
    }
}

pub async fn snapshot_worker<A: LedgerApi>(
    poll_interval: Duration,
    api: A,
    generations: FetchGenerations,
    mut cmd_rx: mpsc::UnboundedReceiver<SyncCommand>,
    event_tx: mpsc::UnboundedSender<SyncEvent>,
) {
    // The first tick completes immediately, which gives the start-up fetch.
    let mut ticker = time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                spawn_fetch(&api, &generations, &event_tx);
            }
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SyncCommand::FetchNow) => {
                        spawn_fetch(&api, &generations, &event_tx);
                    }
                    Some(SyncCommand::Shutdown) | None => break,
                }
            }
        }
    }
    debug!("snapshot worker stopped");
}

fn spawn_fetch<A: LedgerApi>(
    api: &A,
    generations: &FetchGenerations,
    event_tx: &mpsc::UnboundedSender<SyncEvent>,
) {
    let generation = generations.issue();
    let api = api.clone();
    let event_tx = event_tx.clone();
    tokio::spawn(async move {
        match api.fetch_snapshot().await {
            Ok(snapshot) => {
                if event_tx
                    .send(SyncEvent::Snapshot {
                        generation,
                        snapshot,
                    })
                    .is_err()
                {
                    debug!(generation, "snapshot receiver dropped");
                }
            }
            // Polling heals itself on the next tick; nothing is shown to the user.
            Err(err) => warn!(generation, ?err, "snapshot fetch failed"),
        }
    });
}
