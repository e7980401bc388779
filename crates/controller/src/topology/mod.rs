#![forbid(unsafe_code)]

mod refresher;

pub use refresher::{RefreshReason, TopologyRefresher};
