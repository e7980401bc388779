#![forbid(unsafe_code)]

use crate::domain::{OutputTarget, PortNo, StateToken, SwitchId};

/// Why a frame had to be flooded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloodReason {
    /// No host with the destination address has been seen yet.
    UnknownDestination,
    /// The destination sits behind another switch but the ingress switch has
    /// no discovered neighbors.
    NoNeighbors,
    /// The chosen neighbor vanished from the topology before its egress port
    /// could be resolved.
    MissingPortMapping { neighbor: SwitchId },
}

/// Mutually exclusive outcomes of classifying a frame's destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The ingress switch learned a port for the destination.
    LocalHit { port: PortNo },
    /// The destination was last seen on the ingress switch, which has no
    /// local table entry for it.
    RemoteSameSwitch { port: PortNo },
    /// Forward towards a neighbor chosen by the learning engine.
    NextHop { neighbor: SwitchId, port: PortNo },
    Flood(FloodReason),
}

impl Classification {
    pub fn output(&self) -> OutputTarget {
        match self {
            Classification::LocalHit { port }
            | Classification::RemoteSameSwitch { port }
            | Classification::NextHop { port, .. } => OutputTarget::Port(*port),
            Classification::Flood(_) => OutputTarget::Flood,
        }
    }
}

/// Q-value revision applied after a next-hop decision.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RewardUpdate {
    pub action: SwitchId,
    pub port: PortNo,
    pub reward: f64,
    pub value: f64,
}

/// Everything the pipeline did for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Decision {
    pub state: StateToken,
    pub classification: Classification,
    pub output: OutputTarget,
    pub flow_installed: bool,
    pub reward: Option<RewardUpdate>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Outcome {
    /// The frame carried no usable addresses; nothing happened.
    Dropped,
    Forwarded(Decision),
}

impl Outcome {
    pub fn decision(&self) -> Option<&Decision> {
        match self {
            Outcome::Dropped => None,
            Outcome::Forwarded(decision) => Some(decision),
        }
    }
}
