//! Event system for observers of the controller state.
//!
//! This module provides:
//! - [`EventSink`] trait for the controllers to emit events
//! - [`StateChange`]: one flat variant per mutable property family
//! - [`ConnectionEvent`], [`RefreshEvent`]: lifecycle notifications
//! - [`BroadcastBridge`]: fan-out to `tokio::sync::broadcast` subscribers
//!
//! State-change notifications carry identifiers and new values only, never
//! references into the model; observers re-read the model when they need
//! more context. A notification is emitted only when a mutation actually
//! changed a value.

mod bridge;
mod sink;

pub use bridge::BroadcastBridge;
pub use sink::{EventSink, LoggingEventSink, NoopEventSink};

use std::net::IpAddr;

use serde::Serialize;

use crate::error::{ConnectionError, ProtocolError};
use crate::model::balance::Bias;
use crate::model::crossover::Frequency;
use crate::model::equalizer::BandLevel;
use crate::model::front_panel::Brightness;
use crate::model::group::GroupSource;
use crate::model::ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use crate::model::network::Eui48;
use crate::model::sound::SoundMode;
use crate::model::tone::ToneLevel;
use crate::model::volume::Level;

/// Everything an observer can hear about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "category", rename_all = "camelCase")]
pub enum Event {
    /// A model property changed.
    State(StateChange),
    /// A connection lifecycle transition.
    Connection(ConnectionEvent),
    /// Refresh progress and completion.
    Refresh(RefreshEvent),
    /// A protocol-level fault that left the connection up.
    Protocol(ProtocolError),
}

/// One state-change notification.
///
/// Variants are flat, identifier-carrying, and map 1:1 to property
/// families.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateChange {
    /// A zone's volume level changed.
    ZoneVolume { zone: ZoneId, level: Level },
    /// A zone's mute flag changed.
    ZoneMute { zone: ZoneId, mute: bool },
    /// A zone's selected source changed.
    ZoneSource { zone: ZoneId, source: SourceId },
    /// A zone was renamed.
    ZoneName { zone: ZoneId, name: String },
    /// A zone's balance bias changed.
    ZoneBalance { zone: ZoneId, bias: Bias },
    /// A zone's tone pair changed.
    ZoneTone {
        zone: ZoneId,
        bass: ToneLevel,
        treble: ToneLevel,
    },
    /// A zone's sound mode changed.
    ZoneSoundMode { zone: ZoneId, mode: SoundMode },
    /// One band of a zone's own equalizer changed.
    ZoneEqualizerBand {
        zone: ZoneId,
        band: BandId,
        level: BandLevel,
    },
    /// A zone's highpass crossover frequency changed.
    ZoneHighpass { zone: ZoneId, frequency: Frequency },
    /// A zone's lowpass crossover frequency changed.
    ZoneLowpass { zone: ZoneId, frequency: Frequency },
    /// A zone selected a different equalizer preset.
    ZoneEqualizerPreset { zone: ZoneId, preset: PresetId },

    /// A group was renamed.
    GroupName { group: GroupId, name: String },
    /// A group's derived source changed.
    GroupSource { group: GroupId, source: GroupSource },
    /// A group's derived mute changed.
    GroupMute { group: GroupId, mute: bool },
    /// A group's derived volume changed.
    GroupVolume { group: GroupId, level: Level },
    /// A zone joined a group.
    GroupZoneAdded { group: GroupId, zone: ZoneId },
    /// A zone left a group.
    GroupZoneRemoved { group: GroupId, zone: ZoneId },

    /// A source was renamed.
    SourceName { source: SourceId, name: String },
    /// A favorite was renamed.
    FavoriteName { favorite: FavoriteId, name: String },
    /// An equalizer preset was renamed.
    EqualizerPresetName { preset: PresetId, name: String },
    /// One band of an equalizer preset changed.
    EqualizerPresetBand {
        preset: PresetId,
        band: BandId,
        level: BandLevel,
    },

    /// The front panel brightness changed.
    FrontPanelBrightness { brightness: Brightness },
    /// The front panel key lock changed.
    FrontPanelLocked { locked: bool },

    /// The DHCPv4 state changed.
    NetworkDhcpv4Enabled { enabled: bool },
    /// The Control4 SDDP state changed.
    NetworkSddpEnabled { enabled: bool },
    /// The interface hardware address changed.
    NetworkEthernetEui48 { address: Eui48 },
    /// The host IP address changed.
    NetworkHostAddress { address: IpAddr },
    /// The default router address changed.
    NetworkDefaultRouterAddress { address: IpAddr },
    /// The netmask changed.
    NetworkNetmask { address: IpAddr },

    /// A saved configuration was loaded.
    ConfigurationLoaded,
    /// The configuration was saved.
    ConfigurationSaved,
    /// The configuration was reset to defaults.
    ConfigurationReset,
    /// A configuration save is starting.
    ConfigurationSaving,
}

/// A connection lifecycle stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum ConnectionStage {
    /// Resolving the peer address.
    Resolve,
    /// Opening the client connection.
    Connect,
    /// Binding the server listener.
    Listen,
    /// Accepting one inbound connection.
    Accept,
    /// Tearing a connection down.
    Disconnect,
}

/// A connection lifecycle transition.
///
/// Each stage announces itself (`Will`), then lands on `Did` or
/// `DidNot` with the error that stopped it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "phase", rename_all = "camelCase")]
pub enum ConnectionEvent {
    /// The stage is about to run.
    Will { stage: ConnectionStage },
    /// The stage completed.
    Did { stage: ConnectionStage },
    /// The stage failed.
    DidNot {
        stage: ConnectionStage,
        error: ConnectionError,
    },
}

/// Refresh progress reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum RefreshEvent {
    /// Overall progress, floor-rounded to a percentage in `[0, 100]`.
    Progress { percent: u8 },
    /// The refresh batch completed; strictly the last event of the batch.
    Refreshed,
}
