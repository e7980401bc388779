use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use std::time::Duration;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Forwarding {
    /// Idle timeout of the flow rules installed for local deliveries. The
    /// rule expires once no matching traffic was seen for this long, which
    /// bounds how long a stale route survives. **Measured in seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub idle_timeout: Duration,

    /// Hard timeout of installed flow rules. Zero means the rule only
    /// expires through the idle timeout. **Measured in seconds**.
    #[serde_as(as = "serde_with::DurationSeconds")]
    pub hard_timeout: Duration,

    /// Priority of the exact-match flow rules installed for local deliveries.
    pub flow_priority: u16,

    /// Whether a priority 0 match-all rule sending frames to the controller
    /// is installed when a switch connects.
    pub install_table_miss: bool,
}

impl Default for Forwarding {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::from_secs(30),
            hard_timeout: Duration::ZERO,
            flow_priority: 10,
            install_table_miss: true,
        }
    }
}
