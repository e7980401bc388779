#![forbid(unsafe_code)]

mod hosts;
mod switches;
mod topology;

pub use hosts::{HostDirectory, HostLocation};
pub use switches::SwitchRegistry;
pub use topology::{Adjacency, Neighbors, TopologyStore};

use std::sync::Arc;

/// Shared handles to the controller's network view.
///
/// Each store guards its own state; cloning `Stores` clones the handles.
#[derive(Debug, Default, Clone)]
pub struct Stores {
    pub topology: Arc<TopologyStore>,
    pub hosts: Arc<HostDirectory>,
    pub switches: Arc<SwitchRegistry>,
}
