//! The server personality: an HLX controller simulator.
//!
//! Listens for Telnet clients, answers the bracket protocol against an
//! in-memory [`DeviceModel`], broadcasts state reports to every connected
//! peer, and persists the model to an injected [`BackingStore`] behind a
//! dirty flag observed by a periodic save timer.

pub mod handlers;

use std::net::{IpAddr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::error::{ConnectionError, ConnectionResult, StorageError};
use crate::events::{ConnectionEvent, ConnectionStage, EventSink, StateChange};
use crate::model::equalizer::BAND_FLAT;
use crate::model::sound::SoundMode;
use crate::model::{DeviceModel, Eui48, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use crate::peer::{PeerId, PeerRegistry};
use crate::persist::{decode_snapshot, encode_snapshot, BackingStore};
use crate::protocol::format;
use crate::protocol::framer::{Framer, FramerEvent, FRAME_MAX};
use crate::protocol::parse::parse_request;
use crate::transport::Stream;

/// The network identity the simulator advertises in `QE` responses.
///
/// Real hardware learns these from its Ethernet interface; the simulator
/// takes them from configuration so integrations that key on the MAC or
/// host address behave the same against it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkIdentity {
    /// DHCPv4 enabled state.
    pub dhcpv4_enabled: bool,
    /// Control4 SDDP enabled state.
    pub sddp_enabled: bool,
    /// Interface hardware address.
    pub ethernet_eui48: Eui48,
    /// Host IP address.
    pub host_address: IpAddr,
    /// Default router address.
    pub default_router_address: IpAddr,
    /// Netmask.
    pub netmask: IpAddr,
}

impl Default for NetworkIdentity {
    fn default() -> Self {
        Self {
            dhcpv4_enabled: true,
            sddp_enabled: false,
            ethernet_eui48: Eui48::new([0x70, 0xB3, 0xD5, 0x07, 0x00, 0x01]),
            host_address: IpAddr::from([192, 168, 1, 48]),
            default_router_address: IpAddr::from([192, 168, 1, 1]),
            netmask: IpAddr::from([255, 255, 255, 0]),
        }
    }
}

/// The server application controller.
///
/// Clone-cheap via `Arc`; one instance owns the model, the peer registry,
/// and the dirty flag.
pub struct ServerController {
    model: RwLock<DeviceModel>,
    config: Config,
    sink: Arc<dyn EventSink>,
    store: Arc<dyn BackingStore>,
    peers: PeerRegistry,
    dirty: AtomicBool,
    cancel: CancellationToken,
}

impl ServerController {
    /// Builds a controller, restoring the model from the backing store.
    ///
    /// A missing snapshot starts from built-in defaults silently; a
    /// corrupt or unreadable one falls back to defaults and reports
    /// `ConfigurationReset`.
    pub fn new(config: Config, sink: Arc<dyn EventSink>, store: Arc<dyn BackingStore>) -> Arc<Self> {
        let model = match store.load() {
            Ok(Some(blob)) => match decode_snapshot(&blob) {
                Ok(model) => {
                    sink.state_changed(StateChange::ConfigurationLoaded);
                    model
                }
                Err(error) => {
                    log::error!("[Server] Stored configuration unusable: {}", error);
                    sink.state_changed(StateChange::ConfigurationReset);
                    default_model(&config)
                }
            },
            Ok(None) => default_model(&config),
            Err(error) => {
                log::error!("[Server] Backing store unavailable: {}", error);
                sink.state_changed(StateChange::ConfigurationReset);
                default_model(&config)
            }
        };

        Arc::new(Self {
            model: RwLock::new(model),
            config,
            sink,
            store,
            peers: PeerRegistry::new(),
            dirty: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        })
    }

    /// Read access to the model for embedders (the proxy answers local
    /// queries from it).
    pub fn with_model<R>(&self, read: impl FnOnce(&DeviceModel) -> R) -> R {
        read(&self.model.read())
    }

    /// Number of connected peers.
    #[must_use]
    pub fn peer_count(&self) -> usize {
        self.peers.len()
    }

    /// True when unsaved mutations exist.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    /// Binds the listener, emitting the listen lifecycle events.
    pub async fn bind(&self, addr: SocketAddr) -> ConnectionResult<TcpListener> {
        self.sink.connection_event(ConnectionEvent::Will {
            stage: ConnectionStage::Listen,
        });
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                self.sink.connection_event(ConnectionEvent::Did {
                    stage: ConnectionStage::Listen,
                });
                Ok(listener)
            }
            Err(e) => {
                let error = ConnectionError::from(e);
                self.sink.connection_event(ConnectionEvent::DidNot {
                    stage: ConnectionStage::Listen,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// Accepts connections until shutdown. Each peer gets its own session
    /// task and its own independent exchange ordering.
    pub async fn run(self: &Arc<Self>, listener: TcpListener) {
        loop {
            self.sink.connection_event(ConnectionEvent::Will {
                stage: ConnectionStage::Accept,
            });
            tokio::select! {
                _ = self.cancel.cancelled() => break,
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        let _ = socket.set_nodelay(true);
                        log::info!("[Server] Accepted {}", peer_addr);
                        self.sink.connection_event(ConnectionEvent::Did {
                            stage: ConnectionStage::Accept,
                        });
                        self.attach_peer(socket);
                    }
                    Err(e) => {
                        self.sink.connection_event(ConnectionEvent::DidNot {
                            stage: ConnectionStage::Accept,
                            error: e.into(),
                        });
                    }
                },
            }
        }
    }

    /// Registers a peer over an arbitrary transport and spawns its session
    /// task. Returns the peer identifier.
    pub fn attach_peer<S: Stream + 'static>(self: &Arc<Self>, stream: S) -> PeerId {
        let (peer, frames_rx) = self.peers.register();

        let controller = Arc::clone(self);
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            controller.session(stream, peer, frames_rx, cancel).await;
            controller.peers.unregister(peer);
            log::info!(
                "[Server] Peer {} disconnected ({} remaining)",
                peer,
                controller.peers.len()
            );
        });
        peer
    }

    /// Starts the periodic dirty-flag observer.
    ///
    /// Every tick with the flag set broadcasts `SAVING...`, snapshots the
    /// model to the store, and clears the flag. A failed save keeps the
    /// flag set so the next tick retries.
    pub fn start_autosave(self: &Arc<Self>) {
        let controller = Arc::clone(self);
        let cancel = self.cancel.child_token();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(controller.config.save_interval());
            ticks.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick of a tokio interval fires immediately; skip it
            // so a freshly-started server does not save an untouched model.
            ticks.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticks.tick() => {
                        if controller.is_dirty() {
                            let _ = controller.save();
                        }
                    }
                }
            }
        });
    }

    /// Saves the model now: `SAVING...` to every peer, snapshot to the
    /// store, dirty flag cleared on success and preserved on failure.
    pub fn save(&self) -> Result<(), StorageError> {
        self.broadcast_all(&[format::configuration::saving()]);
        self.sink.state_changed(StateChange::ConfigurationSaving);

        let blob = encode_snapshot(&self.model.read())?;
        match self.store.store(&blob) {
            Ok(()) => {
                self.dirty.store(false, Ordering::SeqCst);
                self.sink.state_changed(StateChange::ConfigurationSaved);
                log::info!("[Server] Configuration saved ({} bytes)", blob.len());
                Ok(())
            }
            Err(error) => {
                log::error!("[Server] Configuration save failed: {}", error);
                Err(error)
            }
        }
    }

    /// Replaces the advertised network identity.
    ///
    /// Applied at daemon startup from configuration; changes that took
    /// surface as network notifications and mark the model dirty.
    pub fn set_network_identity(&self, identity: &NetworkIdentity) {
        let changes = {
            let mut model = self.model.write();
            let network = &mut model.network;
            let mut changes = Vec::new();
            if network.set_dhcpv4_enabled(identity.dhcpv4_enabled).changed() {
                changes.push(StateChange::NetworkDhcpv4Enabled {
                    enabled: identity.dhcpv4_enabled,
                });
            }
            if network.set_sddp_enabled(identity.sddp_enabled).changed() {
                changes.push(StateChange::NetworkSddpEnabled {
                    enabled: identity.sddp_enabled,
                });
            }
            if network.set_ethernet_eui48(identity.ethernet_eui48).changed() {
                changes.push(StateChange::NetworkEthernetEui48 {
                    address: identity.ethernet_eui48,
                });
            }
            if network.set_host_address(identity.host_address).changed() {
                changes.push(StateChange::NetworkHostAddress {
                    address: identity.host_address,
                });
            }
            if network
                .set_default_router_address(identity.default_router_address)
                .changed()
            {
                changes.push(StateChange::NetworkDefaultRouterAddress {
                    address: identity.default_router_address,
                });
            }
            if network.set_netmask(identity.netmask).changed() {
                changes.push(StateChange::NetworkNetmask {
                    address: identity.netmask,
                });
            }
            changes
        };
        if !changes.is_empty() {
            self.dirty.store(true, Ordering::SeqCst);
        }
        for change in changes {
            self.sink.state_changed(change);
        }
    }

    /// Stops the accept loop, every session, and the autosave timer.
    pub fn shutdown(&self) {
        self.cancel.cancel();
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
                                    self.handle_frame(peer, &payload);
                                }
                                FramerEvent::Overflow => {
                                    self.sink.protocol_error(
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

    /// Dispatches one inbound frame for `peer`.
    fn handle_frame(self: &Arc<Self>, peer: PeerId, payload: &str) {
        let request = match parse_request(payload) {
            Ok(request) => request,
            Err(error) => {
                // Unknown and malformed frames both answer ERROR; the
                // connection survives.
                log::warn!("[Server] Peer {}: {}", peer, error);
                self.sink.protocol_error(error);
                self.send_to(peer, &[format::ERROR.to_string()]);
                return;
            }
        };

        let outcome = {
            let mut model = self.model.write();
            handlers::handle_request(&mut model, &self.config, &request)
        };

        self.send_to(peer, &outcome.reply);
        self.broadcast_except(peer, &outcome.broadcast);
        for change in outcome.changes {
            self.sink.state_changed(change);
        }
        if outcome.dirty {
            self.dirty.store(true, Ordering::SeqCst);
        }
        if let Some(action) = outcome.action {
            self.run_config_action(action);
        }
    }

    fn run_config_action(&self, action: handlers::ConfigAction) {
        match action {
            handlers::ConfigAction::Save => {
                let _ = self.save();
            }
            handlers::ConfigAction::Load => match self.store.load() {
                Ok(Some(blob)) => match decode_snapshot(&blob) {
                    Ok(model) => {
                        *self.model.write() = model;
                        self.dirty.store(false, Ordering::SeqCst);
                        self.broadcast_all(&[format::configuration::load()]);
                        self.sink.state_changed(StateChange::ConfigurationLoaded);
                    }
                    Err(error) => self.load_fallback(&error),
                },
                Ok(None) => {
                    self.load_fallback(&StorageError::Unavailable(
                        "no stored configuration".to_string(),
                    ));
                }
                Err(error) => self.load_fallback(&error),
            },
            handlers::ConfigAction::Reset => {
                *self.model.write() = default_model(&self.config);
                self.dirty.store(true, Ordering::SeqCst);
                self.broadcast_all(&[format::configuration::reset()]);
                self.sink.state_changed(StateChange::ConfigurationReset);
            }
        }
    }

    /// A failed load falls back to built-in defaults and reports a reset.
    fn load_fallback(&self, error: &StorageError) {
        log::error!("[Server] Configuration load failed: {}", error);
        *self.model.write() = default_model(&self.config);
        self.dirty.store(true, Ordering::SeqCst);
        self.broadcast_all(&[format::configuration::reset()]);
        self.sink.state_changed(StateChange::ConfigurationReset);
    }

    fn send_to(&self, peer: PeerId, frames: &[String]) {
        self.peers.send_to(peer, frames);
    }

    fn broadcast_except(&self, requester: PeerId, frames: &[String]) {
        self.peers.broadcast_except(requester, frames);
    }

    fn broadcast_all(&self, frames: &[String]) {
        self.peers.broadcast_all(frames);
    }
}

/// The built-in defaults: the state of a factory-fresh controller, with
/// every property initialized so queries can always answer.
#[must_use]
pub fn default_model(config: &Config) -> DeviceModel {
    let mut model = DeviceModel::new(&config.capacity);

    for id in SourceId::all(config.capacity.sources) {
        let source = model.sources.source_mut(id).expect("dense collection");
        let _ = source.set_name(&format!("Source {id}"));
    }

    for id in ZoneId::all(config.capacity.zones) {
        let zone = model.zones.zone_mut(id).expect("dense collection");
        let _ = zone.set_name(&format!("Zone {id}"));
        zone.set_source(SourceId::new(1).expect("source 1 exists"));
        let volume = zone.volume_mut();
        let _ = volume.set_level(crate::model::volume::LEVEL_MIN);
        volume.set_mute(false);
        volume.set_fixed(false);
        let _ = zone.balance_mut().set_bias(0);
        let _ = zone.tone_mut().set(0, 0);
        zone.set_sound_mode(SoundMode::Disabled);
        zone.set_equalizer_preset(PresetId::new(1).expect("preset 1 exists"));
        for (_, band) in zone.equalizer_mut().iter_mut() {
            let _ = band.set_level(BAND_FLAT);
        }
        let _ = zone.highpass_mut().set_frequency(100);
        let _ = zone.lowpass_mut().set_frequency(100);
    }

    for id in GroupId::all(config.capacity.groups) {
        let group = model.groups.group_mut(id).expect("dense collection");
        let _ = group.set_name(&format!("Group {id}"));
    }

    for id in FavoriteId::all(config.capacity.favorites) {
        let favorite = model.favorites.favorite_mut(id).expect("dense collection");
        let _ = favorite.set_name(&format!("Favorite {id}"));
    }

    for id in PresetId::all(config.capacity.equalizer_presets) {
        let preset = model
            .equalizer_presets
            .preset_mut(id)
            .expect("dense collection");
        let _ = preset.set_name(&format!("Preset {id}"));
        for (_, band) in preset.bands_mut().iter_mut() {
            let _ = band.set_level(BAND_FLAT);
        }
    }

    let _ = model.front_panel.set_brightness(2);
    model.front_panel.set_locked(false);

    let identity = NetworkIdentity::default();
    model.network.set_dhcpv4_enabled(identity.dhcpv4_enabled);
    model.network.set_sddp_enabled(identity.sddp_enabled);
    model.network.set_ethernet_eui48(identity.ethernet_eui48);
    model.network.set_host_address(identity.host_address);
    model
        .network
        .set_default_router_address(identity.default_router_address);
    model.network.set_netmask(identity.netmask);

    model
}
