use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Topology {
    /// Delay before the first link discovery after start-up, giving switches
    /// time to connect. **Measured in seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub bootstrap_delay: Duration,

    /// Window over which bursts of topology notifications collapse into a
    /// single rebuild. **Measured in milliseconds**.
    #[serde_as(as = "serde_with::DurationMilliSeconds")]
    pub debounce: Duration,
}

impl Default for Topology {
    fn default() -> Self {
        Self {
            bootstrap_delay: Duration::from_secs(1),
            debounce: Duration::from_millis(200),
        }
    }
}
