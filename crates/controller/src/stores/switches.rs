#![forbid(unsafe_code)]

use crate::domain::SwitchId;
use parking_lot::RwLock;
use rustc_hash::FxHashSet;

/// Switches currently connected to the controller.
#[derive(Debug, Default)]
pub struct SwitchRegistry {
    connected: RwLock<FxHashSet<SwitchId>>,
}

impl SwitchRegistry {
    /// Returns `false` if the switch was already registered.
    pub fn connect(&self, switch: SwitchId) -> bool {
        self.connected.write().insert(switch)
    }

    /// Returns `false` if the switch was not registered.
    pub fn disconnect(&self, switch: SwitchId) -> bool {
        self.connected.write().remove(&switch)
    }

    pub fn contains(&self, switch: SwitchId) -> bool {
        self.connected.read().contains(&switch)
    }

    /// Connected switches in ascending id order.
    pub fn connected(&self) -> Vec<SwitchId> {
        let mut switches: Vec<_> = self.connected.read().iter().copied().collect();
        switches.sort_unstable();
        switches
    }

    pub fn len(&self) -> usize {
        self.connected.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.connected.read().is_empty()
    }
}
