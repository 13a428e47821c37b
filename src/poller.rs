// src/poller.rs
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use tokio::sync::watch;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::query::QueryClient;
use crate::registry::Registry;

// Control handle for one server's refresh task. Owned by the registry; the
// task also exits on its own if the handle is dropped.
pub struct PollerHandle {
    interval_tx: watch::Sender<Duration>,
    cancel_tx: watch::Sender<bool>,
}

impl PollerHandle {
    pub fn set_interval(&self, period: Duration) {
        let _ = self.interval_tx.send(period);
    }

    pub fn stop(&self) {
        let _ = self.cancel_tx.send(true);
    }
}

pub(crate) fn spawn(
    registry: Arc<Registry>,
    id: String,
    client: Arc<dyn QueryClient>,
    interval_secs: u64,
) -> PollerHandle {
    let (interval_tx, interval_rx) = watch::channel(Duration::from_secs(interval_secs));
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(run(registry, id, client, interval_rx, cancel_rx));
    PollerHandle {
        interval_tx,
        cancel_tx,
    }
}

async fn run(
    registry: Arc<Registry>,
    id: String,
    client: Arc<dyn QueryClient>,
    mut interval_rx: watch::Receiver<Duration>,
    mut cancel_rx: watch::Receiver<bool>,
) {
    // The first tick fires immediately, so new servers show data right away
    // instead of after a full interval.
    let mut ticker = time::interval(*interval_rx.borrow());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if *cancel_rx.borrow() {
                    break;
                }
                let (host, port) = match registry.poll_target(&id) {
                    Some(target) => target,
                    None => break,
                };
                match client.query(&host, port).await {
                    Ok(snapshot) => {
                        // A stop requested during the round trip means the
                        // result is discarded, not applied.
                        if *cancel_rx.borrow() {
                            break;
                        }
                        if !registry.apply_snapshot(&id, snapshot) {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("refresh of {}:{} failed: {}", host, port, e);
                    }
                }
            }
            changed = interval_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let period = *interval_rx.borrow();
                ticker = time::interval_at(Instant::now() + period, period);
                ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            }
            changed = cancel_rx.changed() => {
                if changed.is_err() || *cancel_rx.borrow() {
                    break;
                }
            }
        }
    }
    debug!("poller for server {} stopped", id);
}
