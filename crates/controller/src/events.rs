#![forbid(unsafe_code)]

use crate::domain::{Link, PacketIn, PortNo, SwitchId};
use config::Config;

/// Notifications delivered by the protocol layer and the discovery service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControllerEvent {
    SwitchConnected {
        switch: SwitchId,
    },
    SwitchDisconnected {
        switch: SwitchId,
    },
    LinkAdded(Link),
    LinkDeleted(Link),
    PacketIn(PacketIn),
    /// Reply to an earlier port statistics request.
    PortStatsReply {
        switch: SwitchId,
        counters: Vec<(PortNo, u64)>,
    },
}

/// Operator requests, usually triggered by signals.
#[derive(Debug, Clone)]
pub enum ControlEvent {
    Reload(Box<Config>),
    DumpStatus,
}
