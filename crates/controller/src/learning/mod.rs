#![forbid(unsafe_code)]

mod engine;
mod q_table;

pub use engine::QLearningEngine;
pub use q_table::QTable;
