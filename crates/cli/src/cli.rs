use clap::Parser;
use clap_verbosity_flag::{Verbosity, WarnLevel};
use std::path::{Path, PathBuf};

/// qflow: reactive SDN controller with Q-learning load balancing
///
/// qflow learns host locations from unmatched frames and picks next hops
/// between switches with a Q-learning agent rewarded by port utilization.
/// This binary drives the controller core from a recorded event script.
#[derive(Debug, Parser, Clone)]
#[command(about, long_about, version)]
pub struct Cli {
    /// Path to configuration file.
    ///
    /// If not provided, the default locations are checked. They are
    /// `/etc/qflow/config.toml` and `/etc/qflow/config.d/*.toml`, where the
    /// latter being a glob pattern. If they don't exist, the default
    /// configuration is used.
    #[arg(short, long, value_parser = validate_file)]
    pub config: Option<PathBuf>,

    /// Event script to replay against the controller.
    #[arg(short, long, value_parser = validate_file)]
    pub script: PathBuf,

    /// Milliseconds to keep running after the last scripted event, so
    /// pending topology refreshes can settle.
    #[arg(long, default_value_t = 500, value_parser = validate_linger)]
    pub linger_ms: u64,

    #[command(flatten)]
    pub verbosity: Verbosity<WarnLevel>,
}

/// Check if the file exists.
#[inline(always)]
fn validate_file(file: &str) -> Result<PathBuf, String> {
    let path = Path::new(file);
    if path.exists() {
        Ok(path.to_owned())
    } else {
        Err(format!("File not found: {:?}", path))
    }
}

/// Linger must stay below one minute.
#[inline(always)]
fn validate_linger(linger: &str) -> Result<u64, String> {
    let linger: u64 = linger
        .parse()
        .map_err(|_| format!("`{linger}` is not a valid number of milliseconds"))?;
    if linger <= 60_000 {
        Ok(linger)
    } else {
        Err("Linger must not exceed 60000 ms".to_string())
    }
}
