#![forbid(unsafe_code)]

use crate::domain::{PortNo, SwitchId};
use serde::{Deserialize, Serialize};

/// A discovered link between two switch ports. Links are undirected for
/// forwarding purposes: both ends learn about each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub src: SwitchId,
    pub src_port: PortNo,
    pub dst: SwitchId,
    pub dst_port: PortNo,
}

impl Link {
    pub fn new(src: SwitchId, src_port: PortNo, dst: SwitchId, dst_port: PortNo) -> Self {
        Self {
            src,
            src_port,
            dst,
            dst_port,
        }
    }

    /// Shorthand for `(switchA, portA, switchB, portB)` tuples.
    pub fn from_raw(src: u64, src_port: u32, dst: u64, dst_port: u32) -> Self {
        Self::new(SwitchId(src), PortNo(src_port), SwitchId(dst), PortNo(dst_port))
    }
}
