#![forbid(unsafe_code)]

use crate::domain::{StateToken, SwitchId};
use crate::learning::QTable;
use crate::stores::TopologyStore;
use config::Learning;
use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use tracing::{debug, trace};

/// Epsilon-greedy Q-learning over next-hop switches.
///
/// All updates go through one write lock, so concurrent updates of the same
/// pair apply one after the other and none is lost.
pub struct QLearningEngine {
    topology: Arc<TopologyStore>,
    params: RwLock<Learning>,
    table: RwLock<QTable>,
    rng: Mutex<StdRng>,
}

impl QLearningEngine {
    pub fn new(params: Learning, topology: Arc<TopologyStore>) -> Self {
        Self::with_rng(params, topology, StdRng::from_entropy())
    }

    /// Engine with a reproducible exploration sequence.
    pub fn with_seed(params: Learning, topology: Arc<TopologyStore>, seed: u64) -> Self {
        Self::with_rng(params, topology, StdRng::seed_from_u64(seed))
    }

    fn with_rng(params: Learning, topology: Arc<TopologyStore>, rng: StdRng) -> Self {
        Self {
            topology,
            params: RwLock::new(params),
            table: RwLock::new(QTable::default()),
            rng: Mutex::new(rng),
        }
    }

    pub fn params(&self) -> Learning {
        *self.params.read()
    }

    /// Swap learning rate, discount and exploration rate. Learned values stay.
    pub fn set_params(&self, params: Learning) {
        *self.params.write() = params;
    }

    pub fn value(&self, state: StateToken, action: SwitchId) -> f64 {
        self.table.read().get(state, action)
    }

    /// Pick a next hop among `candidates`.
    ///
    /// With probability epsilon any candidate is returned uniformly. Otherwise
    /// the choice is uniform among the candidates sharing the highest value,
    /// so equal paths all get traffic. `None` when there is no candidate.
    pub fn select_action(&self, state: StateToken, candidates: &[SwitchId]) -> Option<SwitchId> {
        if candidates.is_empty() {
            return None;
        }
        let epsilon = self.params.read().epsilon;
        let mut rng = self.rng.lock();

        if rng.r#gen::<f64>() < epsilon {
            let choice = candidates.choose(&mut *rng).copied();
            debug!(%state, ?choice, "exploration");
            return choice;
        }

        let table = self.table.read();
        let values: Vec<f64> = candidates.iter().map(|a| table.get(state, *a)).collect();
        let best_value = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let best: Vec<SwitchId> = candidates
            .iter()
            .zip(&values)
            .filter(|(_, value)| **value == best_value)
            .map(|(action, _)| *action)
            .collect();
        let choice = best.choose(&mut *rng).copied();
        debug!(%state, ?choice, q = best_value, "exploitation");
        choice
    }

    /// Temporal-difference update of `(state, action)`:
    /// `Q += alpha * (reward + gamma * max_a Q(next_state, a) - Q)`, where `a`
    /// ranges over the current neighbors of `next_state`'s switch (0 without
    /// neighbors). Returns the new value.
    pub fn update(&self, state: StateToken, action: SwitchId, reward: f64, next_state: StateToken) -> f64 {
        let Learning { alpha, gamma, .. } = self.params();
        let next_actions = self.topology.neighbors_of(next_state.switch());

        let mut table = self.table.write();
        let best_next = table
            .best_value(next_state, next_actions.keys().copied())
            .unwrap_or(0.0);
        let old = table.get(state, action);
        let new = old + alpha * (reward + gamma * best_next - old);
        table.set(state, action, new);

        trace!(%state, %action, reward, old, new, "q value updated");
        new
    }

    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.read().is_empty()
    }

    /// Copy of the table, for status reports.
    pub fn table(&self) -> QTable {
        self.table.read().clone()
    }
}

impl std::fmt::Debug for QLearningEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QLearningEngine")
            .field("params", &*self.params.read())
            .field("entries", &self.len())
            .finish_non_exhaustive()
    }
}
