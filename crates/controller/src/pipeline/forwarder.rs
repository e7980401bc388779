#![forbid(unsafe_code)]

use crate::domain::{EthAddrs, FlowMatch, FlowSpec, MacAddr, PacketIn, PacketOut, PortNo, StateToken, SwitchId};
use crate::learning::QLearningEngine;
use crate::monitor::TrafficMonitor;
use crate::pipeline::{Classification, Decision, FloodReason, Outcome, RewardUpdate};
use crate::protocol::SwitchChannel;
use crate::stores::Stores;
use config::Forwarding;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Stages a frame goes through. `Reward` is only reached from a next-hop
/// decision that produced a real output port.
enum Stage {
    Learn,
    Classify,
    Act(Classification),
    Reward {
        classification: Classification,
        neighbor: SwitchId,
        port: PortNo,
        flow_installed: bool,
    },
    Done(Decision),
}

/// Decides how to forward frames the switches could not match.
pub struct ForwardingPipeline {
    stores: Stores,
    engine: Arc<QLearningEngine>,
    monitor: Arc<TrafficMonitor>,
    channel: Arc<dyn SwitchChannel>,
    settings: RwLock<Forwarding>,
}

impl ForwardingPipeline {
    pub fn new(
        settings: Forwarding,
        stores: Stores,
        engine: Arc<QLearningEngine>,
        monitor: Arc<TrafficMonitor>,
        channel: Arc<dyn SwitchChannel>,
    ) -> Self {
        Self {
            stores,
            engine,
            monitor,
            channel,
            settings: RwLock::new(settings),
        }
    }

    pub fn set_settings(&self, settings: Forwarding) {
        *self.settings.write() = settings;
    }

    /// Process one frame to completion. Exactly one packet-out is issued for
    /// every frame with usable addresses; frames without are dropped untouched.
    pub fn handle(&self, packet: &PacketIn) -> Outcome {
        let Some(eth) = packet.eth else {
            trace!(switch = %packet.switch, in_port = %packet.in_port, "frame without ethernet addresses dropped");
            return Outcome::Dropped;
        };
        self.drive(packet, eth, Stage::Learn)
    }

    /// Run the stages from `stage` until a decision is reached.
    fn drive(&self, packet: &PacketIn, eth: EthAddrs, mut stage: Stage) -> Outcome {
        let state = StateToken::new(packet.switch, packet.in_port);
        loop {
            stage = match stage {
                Stage::Learn => {
                    self.learn(packet, eth.src);
                    Stage::Classify
                }
                Stage::Classify => Stage::Act(self.classify(state, eth.dst)),
                Stage::Act(classification) => {
                    let flow_installed = self.act(packet, eth, classification);
                    match classification {
                        Classification::NextHop { neighbor, port } => Stage::Reward {
                            classification,
                            neighbor,
                            port,
                            flow_installed,
                        },
                        _ => Stage::Done(Decision {
                            state,
                            classification,
                            output: classification.output(),
                            flow_installed,
                            reward: None,
                        }),
                    }
                }
                Stage::Reward {
                    classification,
                    neighbor,
                    port,
                    flow_installed,
                } => {
                    let reward = self.monitor.reward_for(packet.switch, port);
                    // Single-step update: the next state is the current one.
                    let value = self.engine.update(state, neighbor, reward, state);
                    Stage::Done(Decision {
                        state,
                        classification,
                        output: classification.output(),
                        flow_installed,
                        reward: Some(RewardUpdate {
                            action: neighbor,
                            port,
                            reward,
                            value,
                        }),
                    })
                }
                Stage::Done(decision) => {
                    debug!(
                        %state,
                        src = %eth.src,
                        dst = %eth.dst,
                        classification = ?decision.classification,
                        "forwarding decision"
                    );
                    return Outcome::Forwarded(decision);
                }
            };
        }
    }

    fn learn(&self, packet: &PacketIn, src: MacAddr) {
        if let Some(previous) = self.stores.hosts.learn(packet.switch, packet.in_port, src) {
            info!(
                host = %src,
                from_switch = %previous.switch,
                from_port = %previous.port,
                to_switch = %packet.switch,
                to_port = %packet.in_port,
                "host moved"
            );
        }
    }

    fn classify(&self, state: StateToken, dst: MacAddr) -> Classification {
        let switch = state.switch();
        if let Some(port) = self.stores.hosts.local_port_for(switch, dst) {
            return Classification::LocalHit { port };
        }

        let Some(location) = self.stores.hosts.locate(dst) else {
            return Classification::Flood(FloodReason::UnknownDestination);
        };
        if location.switch == switch {
            return Classification::RemoteSameSwitch {
                port: location.port,
            };
        }

        let mut candidates: Vec<SwitchId> = self
            .stores
            .topology
            .neighbors_of(switch)
            .into_keys()
            .collect();
        candidates.sort_unstable();

        match self.engine.select_action(state, &candidates) {
            Some(neighbor) => self.next_hop(switch, neighbor),
            None => Classification::Flood(FloodReason::NoNeighbors),
        }
    }

    /// Translate a chosen neighbor into the egress port, re-reading the live
    /// topology. Floods when the neighbor is no longer mapped.
    fn next_hop(&self, switch: SwitchId, neighbor: SwitchId) -> Classification {
        match self.stores.topology.port_towards(switch, neighbor) {
            Some(port) => Classification::NextHop { neighbor, port },
            None => {
                warn!(%switch, %neighbor, "chosen neighbor has no egress port, flooding");
                Classification::Flood(FloodReason::MissingPortMapping { neighbor })
            }
        }
    }

    /// Emit the frame and, for local hits, install a rule so the switch
    /// handles the rest of the conversation. Returns whether a rule was sent.
    fn act(&self, packet: &PacketIn, eth: EthAddrs, classification: Classification) -> bool {
        let output = classification.output();
        let mut flow_installed = false;

        if let Classification::LocalHit { .. } = classification {
            let settings = self.settings.read().clone();
            let flow = FlowSpec {
                priority: settings.flow_priority,
                matching: FlowMatch::exact(packet.in_port, eth.src, eth.dst),
                actions: vec![output],
                idle_timeout: settings.idle_timeout,
                hard_timeout: settings.hard_timeout,
            };
            match self.channel.install_flow(packet.switch, flow) {
                Ok(()) => flow_installed = true,
                Err(err) => warn!(switch = %packet.switch, %err, "flow installation failed"),
            }
        }

        let packet_out = PacketOut {
            switch: packet.switch,
            in_port: packet.in_port,
            actions: vec![output],
            payload: packet.payload.clone(),
        };
        if let Err(err) = self.channel.send_packet_out(packet_out) {
            warn!(switch = %packet.switch, %err, "packet out failed");
        }

        flow_installed
    }
}

impl std::fmt::Debug for ForwardingPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ForwardingPipeline")
            .field("settings", &*self.settings.read())
            .field("engine", &self.engine)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Link, OutputTarget};
    use crate::error::Error;
    use parking_lot::Mutex;
    use proptest::prelude::*;

    #[derive(Debug, Default)]
    struct Spy {
        packet_outs: Mutex<Vec<PacketOut>>,
        flows: Mutex<Vec<(SwitchId, FlowSpec)>>,
    }

    impl SwitchChannel for Spy {
        fn send_packet_out(&self, packet: PacketOut) -> Result<(), Error> {
            self.packet_outs.lock().push(packet);
            Ok(())
        }

        fn install_flow(&self, switch: SwitchId, flow: FlowSpec) -> Result<(), Error> {
            self.flows.lock().push((switch, flow));
            Ok(())
        }

        fn request_port_stats(&self, _switch: SwitchId) -> Result<(), Error> {
            Ok(())
        }
    }

    fn mac(last: u8) -> MacAddr {
        MacAddr::new([0x02, 0, 0, 0, 0, last])
    }

    fn pipeline(links: &[Link]) -> (ForwardingPipeline, Arc<Spy>, Arc<QLearningEngine>) {
        let spy = Arc::new(Spy::default());
        let stores = Stores::default();
        stores.topology.rebuild(links);
        let engine = Arc::new(QLearningEngine::with_seed(
            config::Learning::default(),
            stores.topology.clone(),
            11,
        ));
        let monitor = Arc::new(TrafficMonitor::new(spy.clone()));
        let pipeline = ForwardingPipeline::new(
            Forwarding::default(),
            stores,
            engine.clone(),
            monitor,
            spy.clone(),
        );
        (pipeline, spy, engine)
    }

    proptest! {
        #[test]
        fn isolated_switch_floods_remote_destinations(
            ingress in 1u64..10,
            remote in 10u64..20,
            in_port in 1u32..8,
        ) {
            let (pipeline, spy, engine) = pipeline(&[]);
            pipeline.stores.hosts.learn(SwitchId(remote), PortNo(1), mac(2));

            let outcome = pipeline.handle(&PacketIn::new(SwitchId(ingress), PortNo(in_port), mac(1), mac(2)));
            let decision = outcome.decision().copied().unwrap();
            prop_assert_eq!(decision.classification, Classification::Flood(FloodReason::NoNeighbors));
            prop_assert_eq!(decision.reward, None);
            prop_assert!(engine.is_empty());
            prop_assert_eq!(spy.packet_outs.lock().len(), 1);
        }
    }

    #[test]
    fn frames_without_addresses_are_dropped() {
        let (pipeline, spy, _) = pipeline(&[]);
        let mut packet = PacketIn::new(SwitchId(1), PortNo(1), mac(1), mac(2));
        packet.eth = None;

        assert_eq!(pipeline.handle(&packet), Outcome::Dropped);
        assert!(spy.packet_outs.lock().is_empty());
        assert_eq!(pipeline.stores.hosts.host_count(), 0);
    }

    #[test]
    fn unknown_destination_floods_without_update() {
        let (pipeline, spy, engine) = pipeline(&[Link::from_raw(1, 7, 2, 1)]);
        let outcome = pipeline.handle(&PacketIn::new(SwitchId(1), PortNo(5), mac(1), mac(9)));

        let decision = outcome.decision().unwrap();
        assert_eq!(
            decision.classification,
            Classification::Flood(FloodReason::UnknownDestination)
        );
        assert_eq!(decision.output, OutputTarget::Flood);
        assert!(engine.is_empty());
        assert_eq!(spy.packet_outs.lock()[0].actions, vec![OutputTarget::Flood]);
        assert!(spy.flows.lock().is_empty());
    }

    #[test]
    fn recorded_location_on_ingress_switch_is_used_directly() {
        let (pipeline, spy, engine) = pipeline(&[Link::from_raw(1, 7, 2, 1)]);
        pipeline.stores.hosts.learn(SwitchId(1), PortNo(4), mac(2));
        pipeline.stores.hosts.forget_switch(SwitchId(1));

        let outcome = pipeline.handle(&PacketIn::new(SwitchId(1), PortNo(5), mac(1), mac(2)));
        let decision = outcome.decision().unwrap();
        assert_eq!(
            decision.classification,
            Classification::RemoteSameSwitch { port: PortNo(4) }
        );
        assert!(!decision.flow_installed);
        assert!(spy.flows.lock().is_empty());
        assert_eq!(spy.packet_outs.lock()[0].actions, vec![OutputTarget::Port(PortNo(4))]);
        assert!(engine.is_empty());
    }

    #[test]
    fn source_is_learned_before_classification() {
        let (pipeline, _, _) = pipeline(&[]);
        pipeline.handle(&PacketIn::new(SwitchId(3), PortNo(2), mac(1), mac(1)));
        assert_eq!(pipeline.stores.hosts.local_port_for(SwitchId(3), mac(1)), Some(PortNo(2)));
    }

    #[test]
    fn flow_settings_follow_reload() {
        let (pipeline, spy, _) = pipeline(&[]);
        pipeline.set_settings(Forwarding {
            idle_timeout: std::time::Duration::from_secs(5),
            flow_priority: 20,
            ..Default::default()
        });
        pipeline.stores.hosts.learn(SwitchId(1), PortNo(3), mac(2));
        pipeline.handle(&PacketIn::new(SwitchId(1), PortNo(5), mac(1), mac(2)));

        let flows = spy.flows.lock();
        assert_eq!(flows[0].1.priority, 20);
        assert_eq!(flows[0].1.idle_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn vanished_neighbor_falls_back_to_flood() {
        let (pipeline, spy, engine) = pipeline(&[Link::from_raw(1, 7, 2, 1)]);
        assert_eq!(
            pipeline.next_hop(SwitchId(1), SwitchId(2)),
            Classification::NextHop {
                neighbor: SwitchId(2),
                port: PortNo(7)
            }
        );

        // neighbor 2 disappears between selection and port lookup
        pipeline.stores.topology.rebuild(&[Link::from_raw(1, 8, 3, 1)]);
        let classification = pipeline.next_hop(SwitchId(1), SwitchId(2));
        assert_eq!(
            classification,
            Classification::Flood(FloodReason::MissingPortMapping {
                neighbor: SwitchId(2)
            })
        );

        let packet = PacketIn::new(SwitchId(1), PortNo(5), mac(1), mac(2));
        let eth = packet.eth.unwrap();
        let outcome = pipeline.drive(&packet, eth, Stage::Act(classification));
        let decision = outcome.decision().copied().unwrap();
        assert_eq!(decision.output, OutputTarget::Flood);
        assert_eq!(decision.reward, None);
        assert!(!decision.flow_installed);
        assert!(engine.is_empty());

        let outs = spy.packet_outs.lock();
        assert_eq!(outs.len(), 1);
        assert_eq!(outs[0].actions, vec![OutputTarget::Flood]);
    }
}
