#![forbid(unsafe_code)]

use crate::domain::{StateToken, SwitchId};
use rustc_hash::FxHashMap;

/// Learned value of forwarding towards a neighbor switch from a state.
/// Unseen pairs are worth `0.0`.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct QTable {
    values: FxHashMap<(StateToken, SwitchId), f64>,
}

impl QTable {
    pub fn get(&self, state: StateToken, action: SwitchId) -> f64 {
        self.values.get(&(state, action)).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, state: StateToken, action: SwitchId, value: f64) {
        self.values.insert((state, action), value);
    }

    /// Highest value among `actions` in `state`, `None` without actions.
    pub fn best_value(&self, state: StateToken, actions: impl IntoIterator<Item = SwitchId>) -> Option<f64> {
        actions
            .into_iter()
            .map(|action| self.get(state, action))
            .reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StateToken, SwitchId, f64)> + '_ {
        self.values
            .iter()
            .map(|((state, action), value)| (*state, *action, *value))
    }
}
