#![forbid(unsafe_code)]

use flume::Sender;
use tokio::signal::unix::{SignalKind, signal};
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// SIGUSR1
    DumpStatus,
    /// SIGHUP
    ReloadConfig,
    /// SIGINT or SIGTERM
    Shutdown,
}

/// Forward process signals as [`SignalEvent`]s until the receiving side goes
/// away.
pub async fn wait_for_signal(tx: Sender<SignalEvent>) -> anyhow::Result<()> {
    let mut usr1 = signal(SignalKind::user_defined1())?;
    let mut hup = signal(SignalKind::hangup())?;
    let mut int = signal(SignalKind::interrupt())?;
    let mut term = signal(SignalKind::terminate())?;

    loop {
        let event = tokio::select! {
            _ = usr1.recv() => SignalEvent::DumpStatus,
            _ = hup.recv() => SignalEvent::ReloadConfig,
            _ = int.recv() => {
                info!("received SIGINT");
                SignalEvent::Shutdown
            }
            _ = term.recv() => {
                info!("received SIGTERM");
                SignalEvent::Shutdown
            }
        };
        debug!(?event, "forwarding signal");
        if tx.send_async(event).await.is_err() {
            return Ok(());
        }
    }
}
