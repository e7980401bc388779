#![forbid(unsafe_code)]

mod poller;
mod traffic;

pub use poller::StatsPoller;
pub use traffic::{PortCounters, PortSnapshots, TrafficMonitor, reward_from_delta};
