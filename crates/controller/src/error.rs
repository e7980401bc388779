#![forbid(unsafe_code)]

use crate::domain::SwitchId;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("link discovery unavailable: {0}")]
    Discovery(String),

    #[error("channel to switch {switch} is closed")]
    ChannelClosed { switch: SwitchId },

    #[error("invalid configuration: {0}")]
    Config(#[from] config::Error),

    #[error("background task failed: {0}")]
    TaskJoin(#[from] tokio::task::JoinError),
}
