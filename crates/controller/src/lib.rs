#![forbid(unsafe_code)]

pub mod clock;
pub mod controller;
pub mod domain;
pub mod error;
pub mod events;
pub mod learning;
pub mod monitor;
pub mod pipeline;
pub mod protocol;
pub mod stores;
pub mod topology;

pub use controller::{Controller, Services, StatusReport};
pub use events::{ControlEvent, ControllerEvent};
pub use learning::{QLearningEngine, QTable};
pub use monitor::{PortSnapshots, StatsPoller, TrafficMonitor, reward_from_delta};
pub use pipeline::{Classification, Decision, FloodReason, ForwardingPipeline, Outcome, RewardUpdate};
pub use protocol::{LinkDiscovery, NoopChannel, StaticDiscovery, SwitchChannel};
pub use stores::{Adjacency, HostDirectory, HostLocation, Neighbors, Stores, SwitchRegistry, TopologyStore};
pub use topology::{RefreshReason, TopologyRefresher};

pub use clock::{Clock, SystemClock};
pub use domain::{
    EthAddrs, FlowMatch, FlowSpec, Link, MacAddr, OutputTarget, PacketIn, PacketOut, Payload,
    PortNo, StateToken, SwitchId,
};
pub use error::Error;
