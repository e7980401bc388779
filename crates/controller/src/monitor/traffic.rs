#![forbid(unsafe_code)]

use crate::domain::{PortNo, SwitchId};
use crate::error::Error;
use crate::protocol::SwitchChannel;
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{trace, warn};

/// Port → cumulative transmitted bytes.
pub type PortCounters = FxHashMap<PortNo, u64>;

/// The two most recent counter readings of one switch.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PortSnapshots {
    pub previous: PortCounters,
    pub current: PortCounters,
}

impl PortSnapshots {
    /// Bytes sent through `port` between the two readings. Missing counters
    /// count as zero and a counter reset never yields a negative delta.
    pub fn delta(&self, port: PortNo) -> u64 {
        let current = self.current.get(&port).copied().unwrap_or(0);
        let previous = self.previous.get(&port).copied().unwrap_or(0);
        current.saturating_sub(previous)
    }
}

/// Reward for sending through a port that carried `delta` bytes during the
/// last poll window. Always in `(0, 1]`, exactly `1` for an idle port.
pub fn reward_from_delta(delta: u64) -> f64 {
    1.0 / (1.0 + delta as f64)
}

/// Tracks per-port load of every switch from periodic statistics replies.
pub struct TrafficMonitor {
    channel: Arc<dyn SwitchChannel>,
    snapshots: RwLock<FxHashMap<SwitchId, Arc<PortSnapshots>>>,
}

impl TrafficMonitor {
    pub fn new(channel: Arc<dyn SwitchChannel>) -> Self {
        Self {
            channel,
            snapshots: RwLock::new(FxHashMap::default()),
        }
    }

    /// Ask `switch` for fresh counters. The reply arrives later through
    /// [`TrafficMonitor::on_stats_reply`]; a lost reply is superseded by the
    /// next poll.
    pub fn poll(&self, switch: SwitchId) -> Result<(), Error> {
        self.channel.request_port_stats(switch).inspect_err(|err| {
            warn!(%switch, %err, "port stats request failed");
        })
    }

    /// Install a new reading for the whole switch, shifting the current one
    /// to previous. Ports absent from the reply read as zero afterwards.
    pub fn on_stats_reply(&self, switch: SwitchId, counters: impl IntoIterator<Item = (PortNo, u64)>) {
        let current: PortCounters = counters.into_iter().collect();
        let mut snapshots = self.snapshots.write();
        let previous = snapshots
            .get(&switch)
            .map(|snapshot| snapshot.current.clone())
            .unwrap_or_default();
        trace!(%switch, ?current, "port stats updated");
        snapshots.insert(switch, Arc::new(PortSnapshots { previous, current }));
    }

    pub fn snapshot(&self, switch: SwitchId) -> Option<Arc<PortSnapshots>> {
        self.snapshots.read().get(&switch).cloned()
    }

    pub fn delta_for(&self, switch: SwitchId, port: PortNo) -> u64 {
        self.snapshot(switch)
            .map(|snapshot| snapshot.delta(port))
            .unwrap_or(0)
    }

    pub fn reward_for(&self, switch: SwitchId, port: PortNo) -> f64 {
        reward_from_delta(self.delta_for(switch, port))
    }

    /// Drop the readings of a disconnected switch.
    pub fn forget_switch(&self, switch: SwitchId) {
        self.snapshots.write().remove(&switch);
    }

    pub fn tracked_switches(&self) -> usize {
        self.snapshots.read().len()
    }
}

impl std::fmt::Debug for TrafficMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrafficMonitor")
            .field("snapshots", &self.snapshots)
            .finish_non_exhaustive()
    }
}
