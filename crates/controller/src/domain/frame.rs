#![forbid(unsafe_code)]

use crate::domain::{MacAddr, PortNo, SwitchId};
use std::sync::Arc;

/// Frame contents as delivered by the switch.
///
/// A switch that buffered the frame only sends its buffer id and the
/// packet-out refers back to it; otherwise the raw bytes travel both ways.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Buffered(u32),
    Unbuffered(Arc<[u8]>),
}

/// Addresses extracted from the ethernet header by the protocol layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthAddrs {
    pub src: MacAddr,
    pub dst: MacAddr,
}

/// A frame the switch had no rule for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketIn {
    pub switch: SwitchId,
    pub in_port: PortNo,
    /// `None` when the frame carried no parseable ethernet header.
    pub eth: Option<EthAddrs>,
    pub payload: Payload,
}

impl PacketIn {
    pub fn new(switch: SwitchId, in_port: PortNo, src: MacAddr, dst: MacAddr) -> Self {
        Self {
            switch,
            in_port,
            eth: Some(EthAddrs { src, dst }),
            payload: Payload::Unbuffered(Arc::from(Vec::new())),
        }
    }

    pub fn with_payload(mut self, payload: Payload) -> Self {
        self.payload = payload;
        self
    }
}
