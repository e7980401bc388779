#![forbid(unsafe_code)]

mod decision;
mod forwarder;

pub use decision::{Classification, Decision, FloodReason, Outcome, RewardUpdate};
pub use forwarder::ForwardingPipeline;
