use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Monitor {
    /// Interval between two port statistics requests to every connected
    /// switch. The load delta used as reward is measured over this window.
    /// **Measured in seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub poll_interval: Duration,
}

impl Default for Monitor {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
        }
    }
}
