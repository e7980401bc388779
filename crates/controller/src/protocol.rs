#![forbid(unsafe_code)]

//! Contracts of the collaborators that talk to the network.
//!
//! The core never waits on a switch: every [`SwitchChannel`] call only
//! enqueues a request, and replies come back later as separate
//! [`ControllerEvent`](crate::ControllerEvent)s.

use crate::domain::{FlowSpec, Link, PacketOut, SwitchId};
use crate::error::Error;
use async_trait::async_trait;
use parking_lot::RwLock;

pub trait SwitchChannel: Send + Sync {
    /// Emit a frame from `packet.switch` through the given actions.
    fn send_packet_out(&self, packet: PacketOut) -> Result<(), Error>;

    /// Install a flow rule on `switch`.
    fn install_flow(&self, switch: SwitchId, flow: FlowSpec) -> Result<(), Error>;

    /// Ask `switch` for its per-port transmitted byte counters. The reply
    /// arrives as a [`ControllerEvent::PortStatsReply`](crate::ControllerEvent::PortStatsReply).
    fn request_port_stats(&self, switch: SwitchId) -> Result<(), Error>;
}

#[async_trait]
pub trait LinkDiscovery: Send + Sync {
    /// Fetch the complete set of currently known links.
    async fn fetch_links(&self) -> Result<Vec<Link>, Error>;
}

/// Channel that drops every request.
#[derive(Debug, Default)]
pub struct NoopChannel;

impl SwitchChannel for NoopChannel {
    fn send_packet_out(&self, _packet: PacketOut) -> Result<(), Error> {
        Ok(())
    }

    fn install_flow(&self, _switch: SwitchId, _flow: FlowSpec) -> Result<(), Error> {
        Ok(())
    }

    fn request_port_stats(&self, _switch: SwitchId) -> Result<(), Error> {
        Ok(())
    }
}

/// Discovery backed by a link list that can be swapped at runtime.
#[derive(Debug, Default)]
pub struct StaticDiscovery {
    links: RwLock<Option<Vec<Link>>>,
}

impl StaticDiscovery {
    pub fn new(links: Vec<Link>) -> Self {
        Self {
            links: RwLock::new(Some(links)),
        }
    }

    pub fn set_links(&self, links: Vec<Link>) {
        *self.links.write() = Some(links);
    }

    /// Make subsequent fetches fail until links are set again.
    pub fn set_unavailable(&self) {
        *self.links.write() = None;
    }
}

#[async_trait]
impl LinkDiscovery for StaticDiscovery {
    async fn fetch_links(&self) -> Result<Vec<Link>, Error> {
        self.links
            .read()
            .clone()
            .ok_or_else(|| Error::Discovery("no discovery data".into()))
    }
}
