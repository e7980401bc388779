#![forbid(unsafe_code)]

use crate::domain::{MacAddr, PortNo, SwitchId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;

/// Where a host was last seen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HostLocation {
    pub switch: SwitchId,
    pub port: PortNo,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct HostTables {
    locations: FxHashMap<MacAddr, HostLocation>,
    local: FxHashMap<SwitchId, FxHashMap<MacAddr, PortNo>>,
}

/// Host locations and per-switch forwarding tables learned from traffic.
///
/// Entries never expire; the most recent observation of an address wins.
#[derive(Debug, Default)]
pub struct HostDirectory {
    tables: RwLock<HostTables>,
}

impl HostDirectory {
    /// Record that `host` sent a frame into `switch` through `port`.
    /// Returns the previous global location when the host moved.
    pub fn learn(&self, switch: SwitchId, port: PortNo, host: MacAddr) -> Option<HostLocation> {
        let location = HostLocation { switch, port };
        let mut tables = self.tables.write();
        tables.local.entry(switch).or_default().insert(host, port);
        tables
            .locations
            .insert(host, location)
            .filter(|previous| *previous != location)
    }

    pub fn locate(&self, host: MacAddr) -> Option<HostLocation> {
        self.tables.read().locations.get(&host).copied()
    }

    pub fn local_port_for(&self, switch: SwitchId, host: MacAddr) -> Option<PortNo> {
        self.tables.read().local.get(&switch)?.get(&host).copied()
    }

    /// Drop the forwarding table of a disconnected switch.
    pub fn forget_switch(&self, switch: SwitchId) -> usize {
        self.tables
            .write()
            .local
            .remove(&switch)
            .map(|table| table.len())
            .unwrap_or(0)
    }

    pub fn host_count(&self) -> usize {
        self.tables.read().locations.len()
    }
}
