#![forbid(unsafe_code)]

use crate::domain::{MacAddr, Payload, PortNo, SwitchId};
use std::time::Duration;

/// Where a switch should emit a frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutputTarget {
    Port(PortNo),
    /// Every port except the ingress port.
    Flood,
    /// Back to the controller as a frame-arrival event.
    Controller,
}

/// Match fields of a flow rule. `None` fields are wildcards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlowMatch {
    pub in_port: Option<PortNo>,
    pub eth_src: Option<MacAddr>,
    pub eth_dst: Option<MacAddr>,
}

impl FlowMatch {
    /// Matches every frame.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn exact(in_port: PortNo, eth_src: MacAddr, eth_dst: MacAddr) -> Self {
        Self {
            in_port: Some(in_port),
            eth_src: Some(eth_src),
            eth_dst: Some(eth_dst),
        }
    }
}

/// Flow rule installation request handed to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowSpec {
    pub priority: u16,
    pub matching: FlowMatch,
    pub actions: Vec<OutputTarget>,
    /// Zero disables the idle timeout.
    pub idle_timeout: Duration,
    /// Zero disables the hard timeout.
    pub hard_timeout: Duration,
}

impl FlowSpec {
    /// Priority 0 catch-all that sends unmatched frames to the controller.
    pub fn table_miss() -> Self {
        Self {
            priority: 0,
            matching: FlowMatch::any(),
            actions: vec![OutputTarget::Controller],
            idle_timeout: Duration::ZERO,
            hard_timeout: Duration::ZERO,
        }
    }
}

/// Frame emission request handed to the protocol layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketOut {
    pub switch: SwitchId,
    pub in_port: PortNo,
    pub actions: Vec<OutputTarget>,
    pub payload: Payload,
}
