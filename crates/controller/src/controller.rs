#![forbid(unsafe_code)]

use crate::clock::Clock;
use crate::domain::{FlowSpec, PacketIn, SwitchId};
use crate::error::Error;
use crate::events::{ControlEvent, ControllerEvent};
use crate::learning::QLearningEngine;
use crate::monitor::{StatsPoller, TrafficMonitor};
use crate::pipeline::{ForwardingPipeline, Outcome};
use crate::protocol::{LinkDiscovery, SwitchChannel};
use crate::stores::Stores;
use crate::topology::{RefreshReason, TopologyRefresher};
use config::Config;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

pub struct Services {
    pub channel: Arc<dyn SwitchChannel>,
    pub discovery: Arc<dyn LinkDiscovery>,
    pub clock: Arc<dyn Clock>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatusReport {
    pub connected_switches: usize,
    pub topology_switches: usize,
    pub links: usize,
    pub hosts: usize,
    pub q_entries: usize,
    pub monitored_switches: usize,
}

/// Wires the stores, the learning engine, the traffic monitor and the
/// forwarding pipeline to the event streams.
pub struct Controller {
    config: RwLock<Config>,
    services: Services,
    stores: Stores,
    engine: Arc<QLearningEngine>,
    monitor: Arc<TrafficMonitor>,
    pipeline: ForwardingPipeline,
    refresh_tx: mpsc::UnboundedSender<RefreshReason>,
    refresh_rx: Mutex<Option<mpsc::UnboundedReceiver<RefreshReason>>>,
}

impl Controller {
    /// Create a controller with an empty network view.
    pub fn new(config: Config, services: Services) -> Result<Self, Error> {
        config.validate()?;
        let stores = Stores::default();
        let engine = Arc::new(QLearningEngine::new(config.learning, stores.topology.clone()));
        Ok(Self::assemble(config, services, stores, engine))
    }

    /// Like [`Controller::new`], with a reproducible exploration sequence.
    pub fn with_seed(config: Config, services: Services, seed: u64) -> Result<Self, Error> {
        config.validate()?;
        let stores = Stores::default();
        let engine = Arc::new(QLearningEngine::with_seed(
            config.learning,
            stores.topology.clone(),
            seed,
        ));
        Ok(Self::assemble(config, services, stores, engine))
    }

    fn assemble(config: Config, services: Services, stores: Stores, engine: Arc<QLearningEngine>) -> Self {
        let monitor = Arc::new(TrafficMonitor::new(services.channel.clone()));
        let pipeline = ForwardingPipeline::new(
            config.forwarding.clone(),
            stores.clone(),
            engine.clone(),
            monitor.clone(),
            services.channel.clone(),
        );
        let (refresh_tx, refresh_rx) = mpsc::unbounded_channel();
        Self {
            config: RwLock::new(config),
            services,
            stores,
            engine,
            monitor,
            pipeline,
            refresh_tx,
            refresh_rx: Mutex::new(Some(refresh_rx)),
        }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn engine(&self) -> &QLearningEngine {
        &self.engine
    }

    pub fn monitor(&self) -> &TrafficMonitor {
        &self.monitor
    }

    pub fn config(&self) -> Config {
        self.config.read().clone()
    }

    /// Handle one event to completion. Returns the pipeline outcome for
    /// frame arrivals.
    pub fn handle_event(&self, event: ControllerEvent) -> Option<Outcome> {
        match event {
            ControllerEvent::SwitchConnected { switch } => {
                self.on_switch_connected(switch);
                None
            }
            ControllerEvent::SwitchDisconnected { switch } => {
                self.on_switch_disconnected(switch);
                None
            }
            ControllerEvent::LinkAdded(link) => {
                debug!(?link, "link added");
                self.request_refresh(RefreshReason::LinkAdded(link));
                None
            }
            ControllerEvent::LinkDeleted(link) => {
                debug!(?link, "link deleted");
                self.request_refresh(RefreshReason::LinkDeleted(link));
                None
            }
            ControllerEvent::PacketIn(packet) => Some(self.handle_packet_in(&packet)),
            ControllerEvent::PortStatsReply { switch, counters } => {
                if self.stores.switches.contains(switch) {
                    self.monitor.on_stats_reply(switch, counters);
                } else {
                    trace!(%switch, "stats reply from unknown switch ignored");
                }
                None
            }
        }
    }

    pub fn handle_packet_in(&self, packet: &PacketIn) -> Outcome {
        self.pipeline.handle(packet)
    }

    /// Rebuild the topology right away, bypassing the debounce.
    pub async fn refresh_topology(&self) -> Result<(), Error> {
        self.refresher().refresh().await.map(|_| ())
    }

    /// Process events until `cancel` fires or the event stream ends. The
    /// topology refresher and the stats poller run in the background for the
    /// duration of the call.
    pub async fn run_until(
        &self,
        cancel: CancellationToken,
        mut events: mpsc::UnboundedReceiver<ControllerEvent>,
        mut control_rx: mpsc::UnboundedReceiver<ControlEvent>,
    ) -> Result<(), Error> {
        let background = cancel.child_token();
        let triggers = self.refresh_rx.lock().take();
        let refresher = match triggers {
            Some(triggers) => Some(tokio::spawn(self.refresher().run(triggers, background.clone()))),
            None => {
                warn!("topology refresher already running");
                None
            }
        };
        let poller = StatsPoller::new(
            self.monitor.clone(),
            self.stores.switches.clone(),
            self.config.read().monitor.poll_interval,
        );
        let poller = tokio::spawn(poller.run(background.clone()));

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Some(event) => {
                        self.handle_event(event);
                    }
                    None => {
                        info!("event stream closed");
                        break;
                    }
                },
                Some(event) = control_rx.recv() => {
                    self.handle_control(event);
                }
            }
        }

        background.cancel();
        let (refresher, poller) = futures::future::join(
            async {
                match refresher {
                    Some(handle) => handle.await,
                    None => Ok(()),
                }
            },
            poller,
        )
        .await;
        refresher?;
        poller?;
        Ok(())
    }

    pub fn handle_control(&self, event: ControlEvent) {
        match event {
            ControlEvent::Reload(config) => {
                self.apply_reload(*config);
                info!("config reloaded");
            }
            ControlEvent::DumpStatus => self.dump_status(),
        }
    }

    pub fn status(&self) -> StatusReport {
        let adjacency = self.stores.topology.snapshot();
        StatusReport {
            connected_switches: self.stores.switches.len(),
            topology_switches: adjacency.switch_count(),
            links: adjacency.edge_count(),
            hosts: self.stores.hosts.host_count(),
            q_entries: self.engine.len(),
            monitored_switches: self.monitor.tracked_switches(),
        }
    }

    fn on_switch_connected(&self, switch: SwitchId) {
        if !self.stores.switches.connect(switch) {
            debug!(%switch, "switch reconnected");
        }
        info!(%switch, "switch connected");

        if self.config.read().forwarding.install_table_miss
            && let Err(err) = self.services.channel.install_flow(switch, FlowSpec::table_miss())
        {
            warn!(%switch, %err, "table-miss flow installation failed");
        }
        self.request_refresh(RefreshReason::SwitchConnected(switch));
    }

    fn on_switch_disconnected(&self, switch: SwitchId) {
        if !self.stores.switches.disconnect(switch) {
            debug!(%switch, "disconnect for unknown switch ignored");
            return;
        }
        let purged = self.stores.hosts.forget_switch(switch);
        self.monitor.forget_switch(switch);
        info!(%switch, purged, "switch disconnected");
        self.request_refresh(RefreshReason::SwitchDisconnected(switch));
    }

    fn request_refresh(&self, reason: RefreshReason) {
        if self.refresh_tx.send(reason).is_err() {
            debug!(?reason, "topology refresher stopped, trigger dropped");
        }
    }

    fn refresher(&self) -> TopologyRefresher {
        TopologyRefresher::new(
            self.services.discovery.clone(),
            self.stores.topology.clone(),
            self.services.clock.clone(),
            &self.config.read().topology,
        )
    }

    fn apply_reload(&self, mut config: Config) {
        let mut current = self.config.write();
        if config.monitor.poll_interval != current.monitor.poll_interval {
            warn!(
                current = ?current.monitor.poll_interval,
                requested = ?config.monitor.poll_interval,
                "ignoring poll_interval change until restart"
            );
            config.monitor.poll_interval = current.monitor.poll_interval;
        }
        if let Err(err) = config.validate() {
            warn!(%err, "rejecting invalid configuration");
            return;
        }

        self.engine.set_params(config.learning);
        self.pipeline.set_settings(config.forwarding.clone());
        *current = config;
    }

    fn dump_status(&self) {
        let config = self.config.read().clone();
        let status = self.status();
        info!(?config, "current config");
        info!(
            connected_switches = status.connected_switches,
            topology_switches = status.topology_switches,
            links = status.links,
            hosts = status.hosts,
            q_entries = status.q_entries,
            monitored_switches = status.monitored_switches,
            "state summary"
        );
        let mut entries: Vec<_> = self.engine.table().iter().collect();
        entries.sort_by(|a, b| (a.0, a.1).cmp(&(b.0, b.1)));
        for (state, action, value) in entries {
            debug!(%state, %action, value, "q value");
        }
    }
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("config", &*self.config.read())
            .field("stores", &self.stores)
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}
