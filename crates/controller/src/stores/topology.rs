#![forbid(unsafe_code)]

use crate::domain::{Link, PortNo, SwitchId};
use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::trace;

/// Neighbor switch → local egress port towards it.
pub type Neighbors = FxHashMap<SwitchId, PortNo>;

/// Immutable neighbor graph derived from one discovery result.
///
/// Every link is recorded in both directions, so if `a` lists `b` then `b`
/// lists `a`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Adjacency {
    by_switch: FxHashMap<SwitchId, Neighbors>,
}

impl Adjacency {
    pub fn from_links<'a>(links: impl IntoIterator<Item = &'a Link>) -> Self {
        let mut by_switch: FxHashMap<SwitchId, Neighbors> = FxHashMap::default();
        for link in links {
            if link.src == link.dst {
                trace!(?link, "ignoring self link");
                continue;
            }
            by_switch
                .entry(link.src)
                .or_default()
                .insert(link.dst, link.src_port);
            by_switch
                .entry(link.dst)
                .or_default()
                .insert(link.src, link.dst_port);
        }
        Self { by_switch }
    }

    pub fn neighbors_of(&self, switch: SwitchId) -> Option<&Neighbors> {
        self.by_switch.get(&switch)
    }

    pub fn port_towards(&self, switch: SwitchId, neighbor: SwitchId) -> Option<PortNo> {
        self.by_switch.get(&switch)?.get(&neighbor).copied()
    }

    pub fn switch_count(&self) -> usize {
        self.by_switch.len()
    }

    /// Number of undirected neighbor relations.
    pub fn edge_count(&self) -> usize {
        self.by_switch.values().map(|n| n.len()).sum::<usize>() / 2
    }

    pub fn iter(&self) -> impl Iterator<Item = (SwitchId, &Neighbors)> {
        self.by_switch.iter().map(|(id, n)| (*id, n))
    }
}

/// Holds the current [`Adjacency`]. A rebuild swaps in a whole new graph,
/// readers keep whichever version they already hold.
#[derive(Debug, Default)]
pub struct TopologyStore {
    current: RwLock<Arc<Adjacency>>,
}

impl TopologyStore {
    /// Replace the neighbor graph with the one derived from `links`.
    /// Neighbors absent from `links` disappear, even if they were known before.
    pub fn rebuild(&self, links: &[Link]) -> Arc<Adjacency> {
        let adjacency = Arc::new(Adjacency::from_links(links));
        *self.current.write() = Arc::clone(&adjacency);
        adjacency
    }

    pub fn snapshot(&self) -> Arc<Adjacency> {
        Arc::clone(&self.current.read())
    }

    /// Neighbors of `switch`; empty when the switch is unknown or isolated.
    pub fn neighbors_of(&self, switch: SwitchId) -> Neighbors {
        self.current
            .read()
            .neighbors_of(switch)
            .cloned()
            .unwrap_or_default()
    }

    pub fn port_towards(&self, switch: SwitchId, neighbor: SwitchId) -> Option<PortNo> {
        self.current.read().port_towards(switch, neighbor)
    }
}
