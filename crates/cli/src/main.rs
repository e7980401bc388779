use clap::Parser;
use config::Config;
use controller::{ControlEvent, Controller, Services, StaticDiscovery, SystemClock};
use flume::bounded;
use qflow::{
    cli::Cli,
    replay::{LoggingChannel, Replayer, Script},
    signals::{SignalEvent, wait_for_signal},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. `QFLOW_LOG` can still set levels per crate, e.g.
    // `QFLOW_LOG=controller::learning=trace qflow -v` traces the learning
    // engine and logs everything else at info.
    let env_filter = EnvFilter::builder()
        .with_env_var("QFLOW_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    let layer = tracing_subscriber::fmt::layer()
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let config = load_config(&cli)?;
    debug!(?config, ?cli);
    let script = Script::load(&cli.script)?;
    info!(
        links = script.links.len(),
        events = script.events.len(),
        "script loaded"
    );

    let channel = Arc::new(LoggingChannel::default());
    let discovery = Arc::new(StaticDiscovery::default());
    let services = Services {
        channel: channel.clone(),
        discovery: discovery.clone(),
        clock: Arc::new(SystemClock),
    };
    let controller = Controller::new(config, services)?;

    // install signal handlers
    let (signals_tx, signals_rx) = bounded(8);
    let mut signal_handle = tokio::spawn(async move { wait_for_signal(signals_tx).await });

    let (events_tx, events_rx) = mpsc::unbounded_channel();
    let (control_tx, control_rx) = mpsc::unbounded_channel();
    let cancel = CancellationToken::new();

    // the event stream closes once the script is exhausted and the linger
    // period is over
    let linger = Duration::from_millis(cli.linger_ms);
    let replayer = Replayer::new(discovery, script.links, events_tx.clone());
    let replay_handle = tokio::spawn(async move {
        let delivered = replayer.play(script.events).await;
        info!(delivered, "script exhausted");
        tokio::time::sleep(linger).await;
        drop(events_tx);
    });

    let run = controller.run_until(cancel.clone(), events_rx, control_rx);
    tokio::pin!(run);
    let mut signals_done = false;

    loop {
        tokio::select! {
            res = &mut run => {
                if let Err(err) = &res {
                    error!("controller stopped with an error: {}", err);
                }
                res?;
                break;
            }

            // bubble up any errors from the signal handlers
            res = &mut signal_handle, if !signals_done => {
                signals_done = true;
                let res = res?;
                if let Err(err) = &res {
                    error!("error happened during handling signals: {}", err);
                }
                res?;
                cancel.cancel();
            }

            event_res = signals_rx.recv_async(), if !signals_done => {
                let Ok(event) = event_res else { continue };
                debug!(?event, "Received signal event");

                match event {
                    SignalEvent::DumpStatus => {
                        let _ = control_tx.send(ControlEvent::DumpStatus);
                    }
                    SignalEvent::ReloadConfig => match load_config(&cli) {
                        Ok(config) => {
                            let _ = control_tx.send(ControlEvent::Reload(Box::new(config)));
                        }
                        Err(err) => warn!("keeping current config: {:#}", err),
                    },
                    SignalEvent::Shutdown => cancel.cancel(),
                }
            }
        }
    }

    replay_handle.abort();
    let status = controller.status();
    let counts = channel.counts();
    info!(
        connected_switches = status.connected_switches,
        topology_switches = status.topology_switches,
        links = status.links,
        hosts = status.hosts,
        q_entries = status.q_entries,
        monitored_switches = status.monitored_switches,
        packet_outs = counts.packet_outs,
        flows = counts.flows,
        stats_requests = counts.stats_requests,
        "final status"
    );
    Ok(())
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        _ => {
            let mut candidates = glob::glob("/etc/qflow/config.d/*.toml")?
                .filter_map(Result::ok)
                .collect::<Vec<_>>();
            candidates.insert(0, "/etc/qflow/config.toml".into());
            trace!(?candidates, "config file candidates");
            Config::load_multiple(candidates)?
        }
    };
    Ok(config)
}
