//! The proxy personality: a caching relay between one upstream controller
//! and many downstream clients.
//!
//! Upstream, the proxy is an ordinary client: it connects, refreshes, and
//! mirrors state. Downstream, it is a server: queries are answered from
//! the mirror without touching the upstream, mutations are forwarded
//! upstream as exchanges, and every frame the upstream produces - echoes
//! and unsolicited notifications alike - is relayed to every downstream
//! peer, so a client behind the proxy sees exactly the traffic a directly
//! connected client would.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::client::ClientController;
use crate::config::Config;
use crate::error::{ConnectionError, ConnectionResult, HlxResult};
use crate::events::{BroadcastBridge, ConnectionEvent, ConnectionStage, Event, EventSink};
use crate::exchange::ResponseMatcher;
use crate::peer::{PeerId, PeerRegistry};
use crate::protocol::format;
use crate::protocol::framer::{Framer, FramerEvent, FRAME_MAX};
use crate::protocol::parse::{format_report, parse_request, Report, Request};
use crate::server::handlers;
use crate::transport::{HostAddress, Stream};

/// The proxy application controller.
pub struct ProxyController {
    client: Arc<ClientController>,
    config: Config,
    bridge: BroadcastBridge,
    peers: Arc<PeerRegistry>,
    cancel: CancellationToken,
}

impl ProxyController {
    /// Creates a proxy with a disconnected upstream and no peers.
    #[must_use]
    pub fn new(config: Config) -> Arc<Self> {
        let bridge = BroadcastBridge::new(config.event_channel_capacity);
        let client = ClientController::new(config.clone());
        let peers = Arc::new(PeerRegistry::new());

        // Relay every upstream frame downstream, echoes included; the
        // mirror's change suppression must not hide completion frames
        // from downstream exchanges. ERROR stays out of the relay: the
        // upstream addresses it at the proxy alone, and handle_frame
        // forwards it to the one peer that earned it.
        let relay = Arc::clone(&peers);
        client.set_report_tap(Box::new(move |report: &Report| {
            if !matches!(report, Report::Error) {
                relay.broadcast_all(&[format_report(report)]);
            }
        }));

        Arc::new(Self {
            client,
            config,
            bridge,
            peers,
            cancel: CancellationToken::new(),
        })
    }

    /// The upstream client controller (mirror model, upstream events).
    #[must_use]
    pub fn client(&self) -> &Arc<ClientController> {
        &self.client
    }

    /// Subscribes to the proxy's own lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.bridge.subscribe()
    }

    /// Number of downstream peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// Connects to the upstream controller and synchronizes the mirror.
    pub async fn connect_upstream(&self, address: &HostAddress) -> HlxResult<()> {
        self.client.connect(address).await?;
        self.client.refresh().await
    }

    /// Attaches the upstream side to an already-open transport, then
    /// synchronizes the mirror. Injection point for tests.
    pub async fn connect_upstream_stream<S: Stream + 'static>(&self, stream: S) -> HlxResult<()> {
        self.client.connect_stream(stream);
        self.client.refresh().await
    }

    /// Binds the downstream listener.
    pub async fn bind(&self, addr: SocketAddr) -> ConnectionResult<TcpListener> {
        self.bridge.connection_event(ConnectionEvent::Will {
            stage: ConnectionStage::Listen,
        });
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                self.bridge.connection_event(ConnectionEvent::Did {
                    stage: ConnectionStage::Listen,
                });
                Ok(listener)
            }
            Err(e) => {
                let error = ConnectionError::from(e);
                self.bridge.connection_event(ConnectionEvent::DidNot {
                    stage: ConnectionStage::Listen,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Accepts downstream connections until shutdown.
    pub async fn run(self: &Arc<Self>, listener: TcpListener) {
        loop {
            self.bridge.connection_event(ConnectionEvent::Will {
                stage: ConnectionStage::Accept,
            });
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        let _ = socket.set_nodelay(true);
                        log::info!("[Proxy] Accepted {}", peer_addr);
                        self.bridge.connection_event(ConnectionEvent::Did {
                            stage: ConnectionStage::Accept,
                        });
                        self.attach_peer(socket);
                    }
                    Err(e) => {
                        self.bridge.connection_event(ConnectionEvent::DidNot {
                            stage: ConnectionStage::Accept,
                            error: e.into(),
                        });
                    }
                },
            }
        }
    }

    /// Registers a downstream peer over an arbitrary transport.
    pub fn attach_peer<S: Stream + 'static>(self: &Arc<Self>, stream: S) -> PeerId {
        let (peer, frames_rx) = self.peers.register();
        let proxy = Arc::clone(self);
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            proxy.session(stream, peer, frames_rx, cancel).await;
            proxy.peers.unregister(peer);
            log::info!(
                "[Proxy] Peer {} disconnected ({} remaining)",
                peer,
                proxy.peers.len()
            );
        });
        peer
    }

    /// Disconnects the upstream and every downstream peer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
        self.client.disconnect();
    }

    async fn session<S: Stream>(
        self: &Arc<Self>,
        stream: S,
        peer: PeerId,
        mut frames_rx: mpsc::UnboundedReceiver<String>,
        cancel: CancellationToken,
    ) {
        let (mut reader, mut writer) = tokio::io::split(stream);
        let mut framer = Framer::new();
        let mut buf = [0u8; 1024];

        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,

                outbound = frames_rx.recv() => match outbound {
                    Some(frame) => {
                        let wire = format!("[{frame}]");
                        if writer.write_all(wire.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    None => break,
                },

                read = reader.read(&mut buf) => match read {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        for event in framer.push(&buf[..n]) {
                            match event {
                                FramerEvent::Frame(payload) => {
                                    // Forwarding awaits the upstream
                                    // exchange, so one peer's requests
                                    // keep their submission order.
                                    self.handle_frame(peer, &payload).await;
                                }
                                FramerEvent::Overflow => {
                                    self.bridge.protocol_error(
                                        crate::error::ProtocolError::FrameOverflow(FRAME_MAX),
                                    );
                                }
                            }
                        }
                    }
                },
            }
        }
    }

    async fn handle_frame(self: &Arc<Self>, peer: PeerId, payload: &str) {
        let request = match parse_request(payload) {
            Ok(request) => request,
            Err(error) => {
                log::warn!("[Proxy] Peer {}: {}", peer, error);
                self.bridge.protocol_error(error);
                self.peers.send_to(peer, &[format::ERROR.to_string()]);
                return;
            }
        };

        // Queries never travel upstream: the mirror answers them.
        let local = self
            .client
            .with_model(|model| handlers::handle_query(model, &self.config, &request));
        if let Some(result) = local {
            match result {
                Ok(frames) => self.peers.send_to(peer, &frames),
                Err(error) => {
                    log::warn!("[Proxy] Peer {}: query rejected: {}", peer, error);
                    self.peers.send_to(peer, &[format::ERROR.to_string()]);
                }
            }
            return;
        }

        // Mutations travel upstream verbatim. The response comes back to
        // the requester (and everyone else) through the report relay.
        match self
            .client
            .exchange(payload.to_string(), response_matcher_for(&request))
            .await
        {
            Ok(_) => {}
            Err(error) => {
                log::warn!("[Proxy] Peer {}: upstream exchange failed: {}", peer, error);
                self.peers.send_to(peer, &[format::ERROR.to_string()]);
            }
        }
    }
}

/// The response predicate the proxy arms for a forwarded request: the
/// same recognition a direct client would use.
fn response_matcher_for(request: &Request) -> ResponseMatcher {
    match request {
        Request::ZoneQuery(zone) => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneQueryDone(z) if *z == zone))
        }
        Request::ZoneQueryVolume(zone) => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone))
        }
        Request::ZoneQueryMute(zone) => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneMute { zone: z, .. } if *z == zone))
        }
        Request::ZoneQuerySource(zone) => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneSource { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetName { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneName { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetSource { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneSource { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetSourceAll { source } => {
            let source = *source;
            Box::new(move |r| matches!(r, Report::ZoneSource { source: s, .. } if *s == source))
        }
        Request::ZoneSetVolume { zone, .. }
        | Request::ZoneAdjustVolume { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetVolumeAll { level } => {
            let level = *level;
            Box::new(move |r| matches!(r, Report::ZoneVolume { level: l, .. } if *l == level))
        }
        Request::ZoneSetVolumeFixed { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneVolumeFixed { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetMute { zone, .. } | Request::ZoneToggleMute(zone) => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneMute { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetBalance { zone, .. } | Request::ZoneAdjustBalance { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneBalance { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetTone { zone, .. }
        | Request::ZoneAdjustBass { zone, .. }
        | Request::ZoneAdjustTreble { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneTone { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetSoundMode { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneSoundMode { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetEqualizerBand { zone, band, .. }
        | Request::ZoneAdjustEqualizerBand { zone, band, .. } => {
            let (zone, band) = (*zone, *band);
            Box::new(move |r| {
                matches!(r, Report::ZoneEqualizerBand { zone: z, band: b, .. }
                    if *z == zone && *b == band)
            })
        }
        Request::ZoneSetEqualizerPreset { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| {
                matches!(r, Report::ZoneEqualizerPreset { zone: z, .. } if *z == zone)
            })
        }
        Request::ZoneSetHighpass { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneHighpass { zone: z, .. } if *z == zone))
        }
        Request::ZoneSetLowpass { zone, .. } => {
            let zone = *zone;
            Box::new(move |r| matches!(r, Report::ZoneLowpass { zone: z, .. } if *z == zone))
        }

        Request::GroupQuery(group) => {
            let group = *group;
            Box::new(move |r| matches!(r, Report::GroupQueryDone(g) if *g == group))
        }
        Request::GroupSetName { group, .. } => {
            let group = *group;
            Box::new(move |r| matches!(r, Report::GroupName { group: g, .. } if *g == group))
        }
        Request::GroupSetSource { group, .. } => {
            let group = *group;
            Box::new(move |r| matches!(r, Report::GroupSource { group: g, .. } if *g == group))
        }
        Request::GroupSetVolume { group, .. } | Request::GroupAdjustVolume { group, .. } => {
            let group = *group;
            Box::new(move |r| matches!(r, Report::GroupVolume { group: g, .. } if *g == group))
        }
        Request::GroupSetMute { group, .. } | Request::GroupToggleMute(group) => {
            let group = *group;
            Box::new(move |r| matches!(r, Report::GroupMute { group: g, .. } if *g == group))
        }
        Request::GroupAddZone { group, zone } => {
            let (group, zone) = (*group, *zone);
            Box::new(move |r| {
                matches!(r, Report::GroupZoneAdded { group: g, zone: z }
                    if *g == group && *z == zone)
            })
        }
        Request::GroupRemoveZone { group, zone } => {
            let (group, zone) = (*group, *zone);
            Box::new(move |r| {
                matches!(r, Report::GroupZoneRemoved { group: g, zone: z }
                    if *g == group && *z == zone)
            })
        }

        Request::SourceQuery(source) => {
            let source = *source;
            Box::new(move |r| matches!(r, Report::SourceQueryDone(s) if *s == source))
        }
        Request::SourceSetName { source, .. } => {
            let source = *source;
            Box::new(move |r| matches!(r, Report::SourceName { source: s, .. } if *s == source))
        }
        Request::FavoriteQuery(favorite) => {
            let favorite = *favorite;
            Box::new(move |r| matches!(r, Report::FavoriteQueryDone(f) if *f == favorite))
        }
        Request::FavoriteSetName { favorite, .. } => {
            let favorite = *favorite;
            Box::new(move |r| {
                matches!(r, Report::FavoriteName { favorite: f, .. } if *f == favorite)
            })
        }
        Request::PresetQuery(preset) => {
            let preset = *preset;
            Box::new(move |r| matches!(r, Report::PresetQueryDone(p) if *p == preset))
        }
        Request::PresetSetName { preset, .. } => {
            let preset = *preset;
            Box::new(move |r| matches!(r, Report::PresetName { preset: p, .. } if *p == preset))
        }
        Request::PresetSetBand { preset, band, .. }
        | Request::PresetAdjustBand { preset, band, .. } => {
            let (preset, band) = (*preset, *band);
            Box::new(move |r| {
                matches!(r, Report::PresetBand { preset: p, band: b, .. }
                    if *p == preset && *b == band)
            })
        }

        Request::FrontPanelQueryLocked => Box::new(|r| matches!(r, Report::FrontPanelLocked(_))),
        Request::FrontPanelSetBrightness(_) => {
            Box::new(|r| matches!(r, Report::FrontPanelBrightness(_)))
        }
        Request::FrontPanelSetLocked(_) => Box::new(|r| matches!(r, Report::FrontPanelLocked(_))),

        Request::NetworkQuery => Box::new(|r| matches!(r, Report::NetworkQueryDone)),
        Request::ConfigurationQuery => Box::new(|r| matches!(r, Report::ConfigurationQueryDone)),
        Request::ConfigurationSave => Box::new(|r| matches!(r, Report::Saving)),
        Request::ConfigurationLoad => {
            Box::new(|r| matches!(r, Report::LoadComplete | Report::ResetComplete))
        }
        Request::ConfigurationReset => Box::new(|r| matches!(r, Report::ResetComplete)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::NoopEventSink;
    use crate::model::ids::ZoneId;
    use crate::persist::MemoryStore;
    use crate::server::ServerController;
    use std::time::Duration;

    fn small_config() -> Config {
        let mut config = Config::default();
        config.capacity.zones = 4;
        config.capacity.sources = 4;
        config.capacity.groups = 2;
        config.capacity.favorites = 2;
        config.capacity.equalizer_presets = 2;
        config
    }

    /// A full three-tier stack: simulator, proxy, and one downstream
    /// client, all over in-memory transports.
    async fn stack() -> (
        Arc<ClientController>,
        Arc<ProxyController>,
        Arc<ServerController>,
    ) {
        let server = ServerController::new(
            small_config(),
            Arc::new(NoopEventSink),
            Arc::new(MemoryStore::new()),
        );
        let proxy = ProxyController::new(small_config());

        let (up_near, up_far) = tokio::io::duplex(8192);
        server.attach_peer(up_near);
        proxy.connect_upstream_stream(up_far).await.unwrap();

        let downstream = ClientController::new(small_config());
        let (down_near, down_far) = tokio::io::duplex(8192);
        proxy.attach_peer(down_near);
        downstream.connect_stream(down_far);

        (downstream, proxy, server)
    }

    fn z(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    #[tokio::test]
    async fn downstream_mutation_reaches_the_upstream_model() {
        let (downstream, proxy, server) = stack().await;

        let confirmed = downstream.set_zone_volume(z(3), -25).await.unwrap();
        assert_eq!(confirmed, -25);

        server.with_model(|model| {
            assert_eq!(model.zones.zone(z(3)).unwrap().volume().level(), Ok(-25));
        });
        proxy.client().with_model(|mirror| {
            assert_eq!(mirror.zones.zone(z(3)).unwrap().volume().level(), Ok(-25));
        });
        downstream.with_model(|mirror| {
            assert_eq!(mirror.zones.zone(z(3)).unwrap().volume().level(), Ok(-25));
        });
    }

    #[tokio::test]
    async fn downstream_queries_are_answered_from_the_mirror() {
        let (downstream, _proxy, server) = stack().await;

        // The proxy mirrored the simulator during its refresh; the query
        // answer must match without consulting the upstream again.
        downstream.query_zone(z(1)).await.unwrap();
        downstream.with_model(|mirror| {
            server.with_model(|truth| {
                assert_eq!(
                    mirror.zones.zone(z(1)).unwrap().name().unwrap(),
                    truth.zones.zone(z(1)).unwrap().name().unwrap()
                );
            });
        });
    }

    #[tokio::test]
    async fn unknown_downstream_command_answers_error() {
        let (_downstream, proxy, _server) = stack().await;

        let (near, far) = tokio::io::duplex(1024);
        proxy.attach_peer(near);
        let (mut read_half, mut write_half) = tokio::io::split(far);
        write_half.write_all(b"[GARBAGE]").await.unwrap();

        let mut buf = [0u8; 32];
        let n = tokio::time::timeout(Duration::from_secs(1), read_half.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&buf[..n], b"[ERROR]");
    }

    #[tokio::test]
    async fn cached_queries_survive_upstream_loss_but_mutations_error() {
        let (downstream, proxy, server) = stack().await;

        // Kill the upstream side entirely.
        server.shutdown();
        proxy.client().disconnect();
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Reads still come from the mirror...
        downstream.query_zone(z(1)).await.unwrap();
        downstream.with_model(|mirror| {
            assert_eq!(
                mirror.zones.zone(z(1)).unwrap().name().unwrap(),
                "Zone 1"
            );
        });

        // ...while writes have nowhere to go and answer ERROR.
        let result = downstream.set_zone_volume(z(1), -10).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn peer_mutation_is_relayed_to_other_downstream_clients() {
        let (downstream_a, proxy, _server) = stack().await;

        let downstream_b = ClientController::new(small_config());
        let (near, far) = tokio::io::duplex(8192);
        proxy.attach_peer(near);
        downstream_b.connect_stream(far);

        downstream_a.set_zone_mute(z(2), true).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        downstream_b.with_model(|mirror| {
            assert_eq!(mirror.zones.zone(z(2)).unwrap().volume().mute(), Ok(true));
        });
    }
}
