#![forbid(unsafe_code)]

use crate::Error;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Learning {
    /// Learning rate of the temporal-difference update. How far a single
    /// observed reward moves the stored value towards the new estimate.
    /// Must lie in `(0, 1]`.
    pub alpha: f64,

    /// Discount applied to the best value reachable from the next state.
    /// Must lie in `[0, 1]`.
    pub gamma: f64,

    /// Probability of picking a random next hop instead of the best known
    /// one. `0` always exploits, `1` always explores.
    pub epsilon: f64,
}

impl Default for Learning {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.9,
            epsilon: 0.2,
        }
    }
}

impl Learning {
    pub fn validate(&self) -> Result<(), Error> {
        if !(self.alpha > 0.0 && self.alpha <= 1.0) {
            return Err(Error::Invalid {
                field: "learning.alpha",
                reason: format!("{} is outside (0, 1]", self.alpha),
            });
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(Error::Invalid {
                field: "learning.gamma",
                reason: format!("{} is outside [0, 1]", self.gamma),
            });
        }
        if !(0.0..=1.0).contains(&self.epsilon) {
            return Err(Error::Invalid {
                field: "learning.epsilon",
                reason: format!("{} is outside [0, 1]", self.epsilon),
            });
        }
        Ok(())
    }
}
