#![forbid(unsafe_code)]

//! Scripted switch and discovery collaborators.
//!
//! A script lists the links the discovery service knows at startup and a
//! sequence of network events. Link events also update the discovery view,
//! so topology refreshes observe them.

use anyhow::Context;
use controller::{
    ControllerEvent, Error, FlowSpec, Link, MacAddr, PacketIn, PacketOut, Payload, PortNo,
    StaticDiscovery, SwitchChannel, SwitchId,
};
use serde::Deserialize;
use serde_with::serde_as;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info};

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Script {
    pub links: Vec<Link>,
    pub events: Vec<ScriptEvent>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PortCounter {
    pub port: PortNo,
    pub tx_bytes: u64,
}

#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScriptEvent {
    SwitchConnected {
        switch: SwitchId,
    },
    SwitchDisconnected {
        switch: SwitchId,
    },
    LinkAdded(Link),
    LinkDeleted(Link),
    PacketIn {
        switch: SwitchId,
        in_port: PortNo,
        src: MacAddr,
        dst: MacAddr,
        /// Frame kept in the switch buffer.
        #[serde(default)]
        buffer_id: Option<u32>,
        /// Raw frame bytes for unbuffered frames.
        #[serde(default)]
        data: Option<String>,
    },
    PortStats {
        switch: SwitchId,
        counters: Vec<PortCounter>,
    },
    Sleep {
        #[serde_as(as = "serde_with::DurationMilliSeconds")]
        millis: Duration,
    },
}

impl Script {
    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml_edit::de::from_str(text)?)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing script {}", path.display()))
    }
}

/// Feeds script events to the controller and keeps the discovery view in
/// step with scripted link changes.
#[derive(Debug)]
pub struct Replayer {
    discovery: Arc<StaticDiscovery>,
    links: Vec<Link>,
    events: mpsc::UnboundedSender<ControllerEvent>,
}

impl Replayer {
    pub fn new(
        discovery: Arc<StaticDiscovery>,
        links: Vec<Link>,
        events: mpsc::UnboundedSender<ControllerEvent>,
    ) -> Self {
        discovery.set_links(links.clone());
        Self {
            discovery,
            links,
            events,
        }
    }

    /// Play every event in order and return how many reached the controller.
    /// Stops early when the controller is gone.
    pub async fn play(mut self, script: Vec<ScriptEvent>) -> usize {
        let mut delivered = 0;
        for step in script {
            let event = match step {
                ScriptEvent::Sleep { millis } => {
                    tokio::time::sleep(millis).await;
                    continue;
                }
                ScriptEvent::SwitchConnected { switch } => ControllerEvent::SwitchConnected { switch },
                ScriptEvent::SwitchDisconnected { switch } => {
                    ControllerEvent::SwitchDisconnected { switch }
                }
                ScriptEvent::LinkAdded(link) => {
                    if !self.links.contains(&link) {
                        self.links.push(link);
                    }
                    self.discovery.set_links(self.links.clone());
                    ControllerEvent::LinkAdded(link)
                }
                ScriptEvent::LinkDeleted(link) => {
                    self.links.retain(|known| *known != link);
                    self.discovery.set_links(self.links.clone());
                    ControllerEvent::LinkDeleted(link)
                }
                ScriptEvent::PacketIn {
                    switch,
                    in_port,
                    src,
                    dst,
                    buffer_id,
                    data,
                } => {
                    let payload = match buffer_id {
                        Some(id) => Payload::Buffered(id),
                        None => Payload::Unbuffered(Arc::from(data.unwrap_or_default().into_bytes())),
                    };
                    ControllerEvent::PacketIn(PacketIn::new(switch, in_port, src, dst).with_payload(payload))
                }
                ScriptEvent::PortStats { switch, counters } => ControllerEvent::PortStatsReply {
                    switch,
                    counters: counters.iter().map(|c| (c.port, c.tx_bytes)).collect(),
                },
            };
            if self.events.send(event).is_err() {
                debug!(delivered, "controller stopped, script abandoned");
                break;
            }
            delivered += 1;
        }
        delivered
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChannelCounts {
    pub packet_outs: usize,
    pub flows: usize,
    pub stats_requests: usize,
}

/// Switch channel that logs every request instead of sending it.
#[derive(Debug, Default)]
pub struct LoggingChannel {
    packet_outs: AtomicUsize,
    flows: AtomicUsize,
    stats_requests: AtomicUsize,
}

impl LoggingChannel {
    pub fn counts(&self) -> ChannelCounts {
        ChannelCounts {
            packet_outs: self.packet_outs.load(Ordering::Relaxed),
            flows: self.flows.load(Ordering::Relaxed),
            stats_requests: self.stats_requests.load(Ordering::Relaxed),
        }
    }
}

impl SwitchChannel for LoggingChannel {
    fn send_packet_out(&self, packet: PacketOut) -> Result<(), Error> {
        self.packet_outs.fetch_add(1, Ordering::Relaxed);
        let buffered = matches!(packet.payload, Payload::Buffered(_));
        info!(
            switch = %packet.switch,
            in_port = %packet.in_port,
            actions = ?packet.actions,
            buffered,
            "packet out"
        );
        Ok(())
    }

    fn install_flow(&self, switch: SwitchId, flow: FlowSpec) -> Result<(), Error> {
        self.flows.fetch_add(1, Ordering::Relaxed);
        info!(
            %switch,
            priority = flow.priority,
            matching = ?flow.matching,
            actions = ?flow.actions,
            idle_timeout = ?flow.idle_timeout,
            "flow installed"
        );
        Ok(())
    }

    fn request_port_stats(&self, switch: SwitchId) -> Result<(), Error> {
        self.stats_requests.fetch_add(1, Ordering::Relaxed);
        debug!(%switch, "port stats requested");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use controller::{LinkDiscovery, OutputTarget};

    const SCRIPT: &str = r#"
[[links]]
src = 1
src_port = 7
dst = 2
dst_port = 1

[[events]]
kind = "switch_connected"
switch = 1

[[events]]
kind = "port_stats"
switch = 1
counters = [{ port = 7, tx_bytes = 1200 }]

[[events]]
kind = "sleep"
millis = 5

[[events]]
kind = "packet_in"
switch = 1
in_port = 3
src = "02:00:00:00:00:0a"
dst = "02:00:00:00:00:0b"
buffer_id = 9

[[events]]
kind = "link_added"
src = 1
src_port = 8
dst = 3
dst_port = 1

[[events]]
kind = "link_deleted"
src = 1
src_port = 7
dst = 2
dst_port = 1
"#;

    #[test]
    fn script_parses_every_event_kind() {
        let script = Script::parse(SCRIPT).unwrap();
        assert_eq!(script.links, vec![Link::from_raw(1, 7, 2, 1)]);
        assert_eq!(script.events.len(), 6);
        assert_eq!(
            script.events[2],
            ScriptEvent::Sleep {
                millis: Duration::from_millis(5)
            }
        );
        assert!(matches!(
            script.events[3],
            ScriptEvent::PacketIn {
                buffer_id: Some(9),
                ..
            }
        ));
    }

    #[test]
    fn unknown_event_kind_is_rejected() {
        let err = Script::parse("[[events]]\nkind = \"reboot\"\n").unwrap_err();
        assert!(err.to_string().contains("reboot"), "{err}");
    }

    #[test]
    fn bad_mac_is_rejected() {
        let text = "[[events]]\nkind = \"packet_in\"\nswitch = 1\nin_port = 1\nsrc = \"zz\"\ndst = \"02:00:00:00:00:01\"\n";
        assert!(Script::parse(text).is_err());
    }

    #[tokio::test]
    async fn replay_delivers_events_and_tracks_links() {
        let script = Script::parse(SCRIPT).unwrap();
        let discovery = Arc::new(StaticDiscovery::default());
        let (tx, mut rx) = mpsc::unbounded_channel();
        let replayer = Replayer::new(discovery.clone(), script.links, tx);

        let delivered = replayer.play(script.events).await;
        assert_eq!(delivered, 5);

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        assert_eq!(events[0], ControllerEvent::SwitchConnected { switch: SwitchId(1) });
        assert_eq!(
            events[1],
            ControllerEvent::PortStatsReply {
                switch: SwitchId(1),
                counters: vec![(PortNo(7), 1200)],
            }
        );
        let ControllerEvent::PacketIn(packet) = &events[2] else {
            panic!("expected packet in, got {:?}", events[2]);
        };
        assert_eq!(packet.payload, Payload::Buffered(9));

        assert_eq!(
            discovery.fetch_links().await.unwrap(),
            vec![Link::from_raw(1, 8, 3, 1)]
        );
    }

    #[tokio::test]
    async fn replay_stops_when_controller_is_gone() {
        let script = Script::parse(SCRIPT).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        drop(rx);
        let replayer = Replayer::new(Arc::new(StaticDiscovery::default()), Vec::new(), tx);
        assert_eq!(replayer.play(script.events).await, 0);
    }

    #[test]
    fn logging_channel_counts_requests() {
        let channel = LoggingChannel::default();
        channel.install_flow(SwitchId(1), FlowSpec::table_miss()).unwrap();
        channel
            .send_packet_out(PacketOut {
                switch: SwitchId(1),
                in_port: PortNo(2),
                actions: vec![OutputTarget::Flood],
                payload: Payload::Buffered(1),
            })
            .unwrap();
        channel.request_port_stats(SwitchId(1)).unwrap();
        assert_eq!(
            channel.counts(),
            ChannelCounts {
                packet_outs: 1,
                flows: 1,
                stats_requests: 1
            }
        );
    }
}
