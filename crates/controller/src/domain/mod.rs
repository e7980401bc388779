#![forbid(unsafe_code)]

mod flow;
mod frame;
mod ids;
mod link;

pub use flow::{FlowMatch, FlowSpec, OutputTarget, PacketOut};
pub use frame::{EthAddrs, PacketIn, Payload};
pub use ids::{MacAddr, ParseMacError, PortNo, StateToken, SwitchId};
pub use link::Link;
