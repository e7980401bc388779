#![forbid(unsafe_code)]

use crate::clock::Clock;
use crate::domain::{Link, SwitchId};
use crate::error::Error;
use crate::protocol::LinkDiscovery;
use crate::stores::{Adjacency, TopologyStore};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Notification that the discovered topology may have changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshReason {
    SwitchConnected(SwitchId),
    SwitchDisconnected(SwitchId),
    LinkAdded(Link),
    LinkDeleted(Link),
}

/// Rebuilds the [`TopologyStore`] from the discovery service.
pub struct TopologyRefresher {
    discovery: Arc<dyn LinkDiscovery>,
    store: Arc<TopologyStore>,
    clock: Arc<dyn Clock>,
    bootstrap_delay: Duration,
    debounce: Duration,
}

impl TopologyRefresher {
    pub fn new(
        discovery: Arc<dyn LinkDiscovery>,
        store: Arc<TopologyStore>,
        clock: Arc<dyn Clock>,
        settings: &config::Topology,
    ) -> Self {
        Self {
            discovery,
            store,
            clock,
            bootstrap_delay: settings.bootstrap_delay,
            debounce: settings.debounce,
        }
    }

    /// Fetch the link set and swap in the derived graph. A failed fetch
    /// leaves the previous graph in place.
    pub async fn refresh(&self) -> Result<Arc<Adjacency>, Error> {
        let started = self.clock.now();
        match self.discovery.fetch_links().await {
            Ok(links) => {
                let adjacency = self.store.rebuild(&links);
                info!(
                    switches = adjacency.switch_count(),
                    links = adjacency.edge_count(),
                    elapsed = ?self.clock.now().saturating_duration_since(started),
                    "topology rebuilt"
                );
                Ok(adjacency)
            }
            Err(err) => {
                warn!(%err, "link discovery failed, keeping previous topology");
                Err(err)
            }
        }
    }

    /// Wait for the bootstrap delay, rebuild once, then rebuild after every
    /// burst of triggers. Triggers arriving within the debounce window of the
    /// first one share a single rebuild. While discovery keeps failing, a
    /// rebuild is retried every debounce period even without triggers.
    #[tracing::instrument(skip_all)]
    pub async fn run(self, mut triggers: mpsc::UnboundedReceiver<RefreshReason>, cancel: CancellationToken) {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = self.clock.sleep(self.bootstrap_delay) => {}
        }
        let mut retry = self.refresh().await.is_err();

        loop {
            let reason = tokio::select! {
                _ = cancel.cancelled() => break,
                reason = triggers.recv() => match reason {
                    Some(reason) => Some(reason),
                    None => break,
                },
                _ = self.clock.sleep(self.debounce), if retry => None,
            };

            match reason {
                Some(reason) => {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        _ = self.clock.sleep(self.debounce) => {}
                    }
                    let mut collapsed = 1usize;
                    while triggers.try_recv().is_ok() {
                        collapsed += 1;
                    }
                    debug!(?reason, collapsed, "topology refresh triggered");
                }
                None => debug!("retrying failed topology refresh"),
            }
            retry = self.refresh().await.is_err();
        }
    }
}

impl std::fmt::Debug for TopologyRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TopologyRefresher")
            .field("bootstrap_delay", &self.bootstrap_delay)
            .field("debounce", &self.debounce)
            .finish_non_exhaustive()
    }
}
