#![forbid(unsafe_code)]

use crate::monitor::TrafficMonitor;
use crate::stores::SwitchRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Periodically requests port statistics from every connected switch.
#[derive(Debug)]
pub struct StatsPoller {
    monitor: Arc<TrafficMonitor>,
    switches: Arc<SwitchRegistry>,
    interval: Duration,
}

impl StatsPoller {
    pub fn new(monitor: Arc<TrafficMonitor>, switches: Arc<SwitchRegistry>, interval: Duration) -> Self {
        Self {
            monitor,
            switches,
            interval,
        }
    }

    /// Issue one request per connected switch. Returns how many were accepted
    /// by the protocol layer.
    pub fn poll_once(&self) -> usize {
        self.switches
            .connected()
            .into_iter()
            .filter(|switch| self.monitor.poll(*switch).is_ok())
            .count()
    }

    /// Poll immediately, then once per interval until cancelled.
    #[tracing::instrument(skip_all)]
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let requested = self.poll_once();
                    debug!(requested, "port stats poll issued");
                }
            }
        }
    }
}
