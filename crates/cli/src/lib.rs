#![forbid(unsafe_code)]

pub mod cli;
pub mod replay;
pub mod signals;
