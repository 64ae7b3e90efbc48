//! The client personality: an event-driven mirror of one controller.
//!
//! The [`ClientController`] owns the mirror [`DeviceModel`], a connection
//! to the controller (real or simulated), and the broadcast bridge its
//! observers subscribe to. Every typed operation is one exchange: the
//! request frame goes out, the mirror mutates when the matching report
//! comes back, and observers hear about values that actually changed.

pub mod apply;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::connection::{ClientConnection, ConnectionOptions};
use crate::error::{ConnectionError, HlxResult};
use crate::events::{BroadcastBridge, Event, EventSink, RefreshEvent};
use crate::exchange::{Exchange, ResponseMatcher};
use crate::model::balance::Bias;
use crate::model::crossover::Frequency;
use crate::model::equalizer::BandLevel;
use crate::model::front_panel::Brightness;
use crate::model::group::GroupSource;
use crate::model::ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
use crate::model::sound::SoundMode;
use crate::model::tone::ToneLevel;
use crate::model::volume::Level;
use crate::model::DeviceModel;
use crate::protocol::format;
use crate::protocol::parse::Report;
use crate::transport::{HostAddress, Stream};

use apply::{apply_report, derive_group_changes, GroupRipple};

/// Raw observer of every inbound report, mutating or not.
///
/// The proxy taps the upstream connection here to relay frames downstream
/// even when they change nothing in the mirror.
pub type ReportTap = Box<dyn Fn(&Report) + Send + Sync>;

/// The client application controller.
pub struct ClientController {
    model: Arc<RwLock<DeviceModel>>,
    bridge: BroadcastBridge,
    config: Config,
    connection: RwLock<Option<Arc<ClientConnection>>>,
    refreshing: Arc<AtomicBool>,
    tap: Arc<RwLock<Option<ReportTap>>>,
}

impl ClientController {
    /// Creates a disconnected controller with an uninitialized mirror.
    #[must_use]
    pub fn new(config: Config) -> Arc<Self> {
        let bridge = BroadcastBridge::new(config.event_channel_capacity);
        Arc::new(Self {
            model: Arc::new(RwLock::new(DeviceModel::new(&config.capacity))),
            bridge,
            config,
            connection: RwLock::new(None),
            refreshing: Arc::new(AtomicBool::new(false)),
            tap: Arc::new(RwLock::new(None)),
        })
    }

    /// Subscribes an observer to every event the controller emits.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bridge.subscribe()
    }

    /// Returns the event bridge for embedders that forward synchronously
    /// (the proxy mirrors upstream notifications downstream through it).
    #[must_use]
    pub fn bridge(&self) -> &BroadcastBridge {
        &self.bridge
    }

    /// Read access to the mirror model.
    pub fn with_model<R>(&self, read: impl FnOnce(&DeviceModel) -> R) -> R {
        read(&self.model.read())
    }

    /// Resolves and connects to a controller.
    pub async fn connect(&self, address: &HostAddress) -> HlxResult<()> {
        let sink: Arc<dyn EventSink> = Arc::new(self.bridge.clone());
        let connection = ClientConnection::connect(
            address,
            self.connection_options(),
            Arc::clone(&sink),
            self.report_handler(),
        )
        .await?;
        *self.connection.write() = Some(Arc::new(connection));
        Ok(())
    }

    /// Attaches the controller to an already-open transport.
    ///
    /// The injection point for simulated controllers in tests and for the
    /// proxy's plumbing.
    pub fn connect_stream<S: Stream + 'static>(&self, stream: S) {
        let sink: Arc<dyn EventSink> = Arc::new(self.bridge.clone());
        let connection = ClientConnection::spawn(
            stream,
            self.connection_options(),
            sink,
            self.report_handler(),
        );
        *self.connection.write() = Some(Arc::new(connection));
    }

    /// Disconnects. Every pending exchange completes with `Cancelled`.
    pub fn disconnect(&self) {
        if let Some(connection) = self.connection.write().take() {
            connection.disconnect();
        }
    }

    /// True while a connection is held.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        matches!(&*self.connection.read(), Some(c) if !c.is_disconnected())
    }

    fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            default_timeout: self.config.exchange_timeout(),
            submit_capacity: self.config.exchange_queue_capacity,
        }
    }

    /// Installs a raw report tap. At most one; the proxy is the intended
    /// customer.
    pub fn set_report_tap(&self, tap: ReportTap) {
        *self.tap.write() = Some(tap);
    }

    /// Builds the synchronous report path: mutate the mirror, notify, and
    /// feed the raw tap. During a refresh the group ripple is deferred to
    /// the batch pass.
    fn report_handler(&self) -> crate::connection::ReportHandler {
        let model = Arc::clone(&self.model);
        let bridge = self.bridge.clone();
        let refreshing = Arc::clone(&self.refreshing);
        let tap = Arc::clone(&self.tap);
        Box::new(move |report: Report| {
            let ripple = if refreshing.load(Ordering::SeqCst) {
                GroupRipple::Deferred
            } else {
                GroupRipple::Immediate
            };
            let changes = {
                let mut model = model.write();
                apply_report(&mut model, &report, ripple)
            };
            for change in changes {
                bridge.state_changed(change);
            }
            if let Some(tap) = tap.read().as_ref() {
                tap(&report);
            }
        })
    }

    fn check_zone_unlocked(&self, zone: ZoneId) -> HlxResult<()> {
        let model = self.model.read();
        if let Ok(z) = model.zones.zone(zone) {
            z.volume().check_unlocked()?;
        }
        Ok(())
    }

    /// Submits one raw exchange: a frame paired with the predicate that
    /// recognizes its response. The typed operations below are the usual
    /// surface; the proxy forwards downstream mutations through this.
    pub async fn exchange(&self, frame: String, matches: ResponseMatcher) -> HlxResult<Report> {
        let connection = self
            .connection
            .read()
            .clone()
            .ok_or(ConnectionError::Disconnected)?;
        connection.exchange(Exchange::new(frame, matches)).await
    }

    // ── Refresh ────────────────────────────────────────────────────────

    /// Synchronizes the mirror to the controller's current state.
    ///
    /// Issues one query per sub-controller in the order the hardware
    /// emits its own configuration dump - network, front panel, sources,
    /// favorites, equalizer presets, zones, groups - reporting progress
    /// after each completed query. Once every query has landed, the group
    /// derivation pass runs and its notifications go out, and only then
    /// does `Refreshed` fire: observers waking on it always see group
    /// state consistent with final zone state.
    pub async fn refresh(&self) -> HlxResult<()> {
        let capacity = self.config.capacity;
        let total = 2u32
            + u32::from(capacity.sources)
            + u32::from(capacity.favorites)
            + u32::from(capacity.equalizer_presets)
            + u32::from(capacity.zones)
            + u32::from(capacity.groups);
        let mut completed = 0u32;

        self.refreshing.store(true, Ordering::SeqCst);
        let result = self.refresh_inner(capacity, total, &mut completed).await;
        self.refreshing.store(false, Ordering::SeqCst);
        result?;

        // Derivation runs before Refreshed so observers see consistent
        // group state the moment they learn the refresh is done.
        let changes = {
            let model = self.model.read();
            GroupId::all(capacity.groups)
                .flat_map(|group| derive_group_changes(&model, group))
                .collect::<Vec<_>>()
        };
        for change in changes {
            self.bridge.state_changed(change);
        }
        self.bridge.refresh_event(RefreshEvent::Refreshed);
        Ok(())
    }

    async fn refresh_inner(
        &self,
        capacity: crate::config::Capacity,
        total: u32,
        completed: &mut u32,
    ) -> HlxResult<()> {
        self.query_network().await?;
        self.step(total, completed);
        self.query_front_panel_locked().await?;
        self.step(total, completed);

        for source in SourceId::all(capacity.sources) {
            self.query_source(source).await?;
            self.step(total, completed);
        }
        for favorite in FavoriteId::all(capacity.favorites) {
            self.query_favorite(favorite).await?;
            self.step(total, completed);
        }
        for preset in PresetId::all(capacity.equalizer_presets) {
            self.query_preset(preset).await?;
            self.step(total, completed);
        }
        for zone in ZoneId::all(capacity.zones) {
            self.query_zone(zone).await?;
            self.step(total, completed);
        }
        for group in GroupId::all(capacity.groups) {
            self.query_group(group).await?;
            self.step(total, completed);
        }
        Ok(())
    }

    fn step(&self, total: u32, completed: &mut u32) {
        *completed += 1;
        let percent = (*completed * 100 / total) as u8;
        self.bridge
            .refresh_event(RefreshEvent::Progress { percent });
    }

    // ── Zone operations ────────────────────────────────────────────────

    /// Queries every property of one zone.
    pub async fn query_zone(&self, zone: ZoneId) -> HlxResult<()> {
        self.exchange(
            format::zone::query(zone),
            Box::new(move |r| matches!(r, Report::ZoneQueryDone(z) if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Queries just the volume level of one zone.
    pub async fn query_zone_volume(&self, zone: ZoneId) -> HlxResult<Level> {
        let report = self
            .exchange(
                format::zone::query_volume(zone),
                Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_volume(&report))
    }

    /// Queries just the mute state of one zone.
    pub async fn query_zone_mute(&self, zone: ZoneId) -> HlxResult<bool> {
        let report = self
            .exchange(
                format::zone::query_mute(zone),
                Box::new(move |r| matches!(r, Report::ZoneMute { zone: z, .. } if *z == zone)),
            )
            .await?;
        match report {
            Report::ZoneMute { mute, .. } => Ok(mute),
            _ => unreachable!("matcher admits only ZoneMute"),
        }
    }

    /// Queries just the selected source of one zone.
    pub async fn query_zone_source(&self, zone: ZoneId) -> HlxResult<SourceId> {
        let report = self
            .exchange(
                format::zone::query_source(zone),
                Box::new(move |r| matches!(r, Report::ZoneSource { zone: z, .. } if *z == zone)),
            )
            .await?;
        match report {
            Report::ZoneSource { source, .. } => Ok(source),
            _ => unreachable!("matcher admits only ZoneSource"),
        }
    }

    /// Renames a zone.
    pub async fn set_zone_name(&self, zone: ZoneId, name: &str) -> HlxResult<()> {
        crate::model::validate_name(name).map_err(crate::error::HlxError::from)?;
        self.exchange(
            format::zone::name(zone, name),
            Box::new(move |r| matches!(r, Report::ZoneName { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Selects a zone's source.
    pub async fn set_zone_source(&self, zone: ZoneId, source: SourceId) -> HlxResult<()> {
        self.exchange(
            format::zone::source(zone, source),
            Box::new(move |r| matches!(r, Report::ZoneSource { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Selects every zone's source at once.
    pub async fn set_all_zones_source(&self, source: SourceId) -> HlxResult<()> {
        self.exchange(
            format::zone::source_all(source),
            Box::new(move |r| {
                matches!(r, Report::ZoneSource { source: s, .. } if *s == source)
            }),
        )
        .await?;
        Ok(())
    }

    /// Sets a zone's volume, returning the confirmed level.
    ///
    /// Fails fast with `VolumeLocked` when the mirror knows the zone's
    /// level is fixed, skipping the wire round trip the controller would
    /// reject anyway.
    pub async fn set_zone_volume(&self, zone: ZoneId, level: Level) -> HlxResult<Level> {
        self.check_zone_unlocked(zone)?;
        let report = self
            .exchange(
                format::zone::volume(zone, level),
                Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_volume(&report))
    }

    /// Sets every zone's volume at once.
    pub async fn set_all_zones_volume(&self, level: Level) -> HlxResult<()> {
        self.exchange(
            format::zone::volume_all(level),
            Box::new(move |r| matches!(r, Report::ZoneVolume { level: l, .. } if *l == level)),
        )
        .await?;
        Ok(())
    }

    /// Steps a zone's volume up, returning the confirmed level.
    pub async fn increase_zone_volume(&self, zone: ZoneId) -> HlxResult<Level> {
        self.check_zone_unlocked(zone)?;
        let report = self
            .exchange(
                format::zone::volume_up(zone),
                Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_volume(&report))
    }

    /// Steps a zone's volume down, returning the confirmed level.
    pub async fn decrease_zone_volume(&self, zone: ZoneId) -> HlxResult<Level> {
        self.check_zone_unlocked(zone)?;
        let report = self
            .exchange(
                format::zone::volume_down(zone),
                Box::new(move |r| matches!(r, Report::ZoneVolume { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_volume(&report))
    }

    /// Locks or unlocks a zone's volume level.
    pub async fn set_zone_volume_fixed(&self, zone: ZoneId, fixed: bool) -> HlxResult<()> {
        self.exchange(
            format::zone::volume_fixed(zone, fixed),
            Box::new(move |r| {
                matches!(r, Report::ZoneVolumeFixed { zone: z, .. } if *z == zone)
            }),
        )
        .await?;
        Ok(())
    }

    /// Mutes or unmutes a zone.
    pub async fn set_zone_mute(&self, zone: ZoneId, mute: bool) -> HlxResult<()> {
        self.exchange(
            format::zone::mute(zone, mute),
            Box::new(move |r| {
                matches!(r, Report::ZoneMute { zone: z, mute: m } if *z == zone && *m == mute)
            }),
        )
        .await?;
        Ok(())
    }

    /// Toggles a zone's mute, returning the new state.
    pub async fn toggle_zone_mute(&self, zone: ZoneId) -> HlxResult<bool> {
        let report = self
            .exchange(
                format::zone::toggle_mute(zone),
                Box::new(move |r| matches!(r, Report::ZoneMute { zone: z, .. } if *z == zone)),
            )
            .await?;
        match report {
            Report::ZoneMute { mute, .. } => Ok(mute),
            _ => unreachable!("matcher admits only ZoneMute"),
        }
    }

    /// Sets a zone's balance bias.
    pub async fn set_zone_balance(&self, zone: ZoneId, bias: Bias) -> HlxResult<()> {
        self.exchange(
            format::zone::balance(zone, bias),
            Box::new(move |r| matches!(r, Report::ZoneBalance { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Steps a zone's balance toward the left, returning the new bias.
    pub async fn adjust_zone_balance_left(&self, zone: ZoneId) -> HlxResult<Bias> {
        let report = self
            .exchange(
                format::zone::balance_left(zone),
                Box::new(move |r| matches!(r, Report::ZoneBalance { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_balance(&report))
    }

    /// Steps a zone's balance toward the right, returning the new bias.
    pub async fn adjust_zone_balance_right(&self, zone: ZoneId) -> HlxResult<Bias> {
        let report = self
            .exchange(
                format::zone::balance_right(zone),
                Box::new(move |r| matches!(r, Report::ZoneBalance { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_balance(&report))
    }

    /// Sets both tone knobs atomically.
    pub async fn set_zone_tone(
        &self,
        zone: ZoneId,
        bass: ToneLevel,
        treble: ToneLevel,
    ) -> HlxResult<()> {
        self.exchange(
            format::zone::tone(zone, bass, treble),
            Box::new(move |r| matches!(r, Report::ZoneTone { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Steps a zone's bass, returning the confirmed `(bass, treble)`.
    pub async fn adjust_zone_bass(
        &self,
        zone: ZoneId,
        up: bool,
    ) -> HlxResult<(ToneLevel, ToneLevel)> {
        let report = self
            .exchange(
                format::zone::bass_adjust(zone, up),
                Box::new(move |r| matches!(r, Report::ZoneTone { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_tone(&report))
    }

    /// Steps a zone's treble, returning the confirmed `(bass, treble)`.
    pub async fn adjust_zone_treble(
        &self,
        zone: ZoneId,
        up: bool,
    ) -> HlxResult<(ToneLevel, ToneLevel)> {
        let report = self
            .exchange(
                format::zone::treble_adjust(zone, up),
                Box::new(move |r| matches!(r, Report::ZoneTone { zone: z, .. } if *z == zone)),
            )
            .await?;
        Ok(expect_zone_tone(&report))
    }

    /// Selects a zone's sound mode.
    pub async fn set_zone_sound_mode(&self, zone: ZoneId, mode: SoundMode) -> HlxResult<()> {
        self.exchange(
            format::zone::sound_mode(zone, mode),
            Box::new(move |r| matches!(r, Report::ZoneSoundMode { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Sets one band of a zone's own equalizer.
    pub async fn set_zone_equalizer_band(
        &self,
        zone: ZoneId,
        band: BandId,
        level: BandLevel,
    ) -> HlxResult<()> {
        self.exchange(
            format::zone::equalizer_band(zone, band, level),
            Box::new(move |r| {
                matches!(r, Report::ZoneEqualizerBand { zone: z, band: b, .. }
                    if *z == zone && *b == band)
            }),
        )
        .await?;
        Ok(())
    }

    /// Selects a zone's preset equalizer.
    pub async fn set_zone_equalizer_preset(
        &self,
        zone: ZoneId,
        preset: PresetId,
    ) -> HlxResult<()> {
        self.exchange(
            format::zone::equalizer_preset(zone, preset),
            Box::new(move |r| {
                matches!(r, Report::ZoneEqualizerPreset { zone: z, .. } if *z == zone)
            }),
        )
        .await?;
        Ok(())
    }

    /// Sets a zone's highpass crossover frequency.
    pub async fn set_zone_highpass(&self, zone: ZoneId, frequency: Frequency) -> HlxResult<()> {
        self.exchange(
            format::zone::highpass(zone, frequency),
            Box::new(move |r| matches!(r, Report::ZoneHighpass { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    /// Sets a zone's lowpass crossover frequency.
    pub async fn set_zone_lowpass(&self, zone: ZoneId, frequency: Frequency) -> HlxResult<()> {
        self.exchange(
            format::zone::lowpass(zone, frequency),
            Box::new(move |r| matches!(r, Report::ZoneLowpass { zone: z, .. } if *z == zone)),
        )
        .await?;
        Ok(())
    }

    // ── Group operations ───────────────────────────────────────────────

    /// Queries a group's name, membership, and derived state.
    pub async fn query_group(&self, group: GroupId) -> HlxResult<()> {
        self.exchange(
            format::group::query(group),
            Box::new(move |r| matches!(r, Report::GroupQueryDone(g) if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Renames a group.
    pub async fn set_group_name(&self, group: GroupId, name: &str) -> HlxResult<()> {
        crate::model::validate_name(name).map_err(crate::error::HlxError::from)?;
        self.exchange(
            format::group::name(group, name),
            Box::new(move |r| matches!(r, Report::GroupName { group: g, .. } if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Sets every member zone's source.
    pub async fn set_group_source(&self, group: GroupId, source: SourceId) -> HlxResult<()> {
        self.exchange(
            format::group::source(group, GroupSource::Single(source)),
            Box::new(move |r| matches!(r, Report::GroupSource { group: g, .. } if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Sets every member zone's volume.
    pub async fn set_group_volume(&self, group: GroupId, level: Level) -> HlxResult<()> {
        self.exchange(
            format::group::volume(group, level),
            Box::new(move |r| matches!(r, Report::GroupVolume { group: g, .. } if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Steps every member zone's volume up.
    pub async fn increase_group_volume(&self, group: GroupId) -> HlxResult<()> {
        self.exchange(
            format::group::volume_up(group),
            Box::new(move |r| matches!(r, Report::GroupVolume { group: g, .. } if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Steps every member zone's volume down.
    pub async fn decrease_group_volume(&self, group: GroupId) -> HlxResult<()> {
        self.exchange(
            format::group::volume_down(group),
            Box::new(move |r| matches!(r, Report::GroupVolume { group: g, .. } if *g == group)),
        )
        .await?;
        Ok(())
    }

    /// Mutes or unmutes every member zone.
    pub async fn set_group_mute(&self, group: GroupId, mute: bool) -> HlxResult<()> {
        self.exchange(
            format::group::mute(group, mute),
            Box::new(move |r| {
                matches!(r, Report::GroupMute { group: g, mute: m } if *g == group && *m == mute)
            }),
        )
        .await?;
        Ok(())
    }

    /// Toggles the group's derived mute, returning the new state.
    pub async fn toggle_group_mute(&self, group: GroupId) -> HlxResult<bool> {
        let report = self
            .exchange(
                format::group::toggle_mute(group),
                Box::new(move |r| matches!(r, Report::GroupMute { group: g, .. } if *g == group)),
            )
            .await?;
        match report {
            Report::GroupMute { mute, .. } => Ok(mute),
            _ => unreachable!("matcher admits only GroupMute"),
        }
    }

    /// Adds a zone to a group.
    pub async fn add_zone_to_group(&self, group: GroupId, zone: ZoneId) -> HlxResult<()> {
        self.exchange(
            format::group::add_zone(group, zone),
            Box::new(move |r| {
                matches!(r, Report::GroupZoneAdded { group: g, zone: z }
                    if *g == group && *z == zone)
            }),
        )
        .await?;
        Ok(())
    }

    /// Removes a zone from a group.
    pub async fn remove_zone_from_group(&self, group: GroupId, zone: ZoneId) -> HlxResult<()> {
        self.exchange(
            format::group::remove_zone(group, zone),
            Box::new(move |r| {
                matches!(r, Report::GroupZoneRemoved { group: g, zone: z }
                    if *g == group && *z == zone)
            }),
        )
        .await?;
        Ok(())
    }

    // ── Sources, favorites, presets ────────────────────────────────────

    /// Queries one source.
    pub async fn query_source(&self, source: SourceId) -> HlxResult<()> {
        self.exchange(
            format::source::query(source),
            Box::new(move |r| matches!(r, Report::SourceQueryDone(s) if *s == source)),
        )
        .await?;
        Ok(())
    }

    /// Renames a source.
    pub async fn set_source_name(&self, source: SourceId, name: &str) -> HlxResult<()> {
        crate::model::validate_name(name).map_err(crate::error::HlxError::from)?;
        self.exchange(
            format::source::name(source, name),
            Box::new(move |r| matches!(r, Report::SourceName { source: s, .. } if *s == source)),
        )
        .await?;
        Ok(())
    }

    /// Queries one favorite.
    pub async fn query_favorite(&self, favorite: FavoriteId) -> HlxResult<()> {
        self.exchange(
            format::favorite::query(favorite),
            Box::new(move |r| matches!(r, Report::FavoriteQueryDone(f) if *f == favorite)),
        )
        .await?;
        Ok(())
    }

    /// Renames a favorite.
    pub async fn set_favorite_name(&self, favorite: FavoriteId, name: &str) -> HlxResult<()> {
        crate::model::validate_name(name).map_err(crate::error::HlxError::from)?;
        self.exchange(
            format::favorite::name(favorite, name),
            Box::new(move |r| {
                matches!(r, Report::FavoriteName { favorite: f, .. } if *f == favorite)
            }),
        )
        .await?;
        Ok(())
    }

    /// Queries one equalizer preset.
    pub async fn query_preset(&self, preset: PresetId) -> HlxResult<()> {
        self.exchange(
            format::preset::query(preset),
            Box::new(move |r| matches!(r, Report::PresetQueryDone(p) if *p == preset)),
        )
        .await?;
        Ok(())
    }

    /// Renames an equalizer preset.
    pub async fn set_preset_name(&self, preset: PresetId, name: &str) -> HlxResult<()> {
        crate::model::validate_name(name).map_err(crate::error::HlxError::from)?;
        self.exchange(
            format::preset::name(preset, name),
            Box::new(move |r| matches!(r, Report::PresetName { preset: p, .. } if *p == preset)),
        )
        .await?;
        Ok(())
    }

    /// Sets one band of an equalizer preset.
    pub async fn set_preset_band(
        &self,
        preset: PresetId,
        band: BandId,
        level: BandLevel,
    ) -> HlxResult<()> {
        self.exchange(
            format::preset::band(preset, band, level),
            Box::new(move |r| {
                matches!(r, Report::PresetBand { preset: p, band: b, .. }
                    if *p == preset && *b == band)
            }),
        )
        .await?;
        Ok(())
    }

    // ── Front panel ────────────────────────────────────────────────────

    /// Queries the front panel key lock.
    ///
    /// Completion rides on the bare locked report: the hardware never
    /// echoes this query (see the codec notes on the preserved bug).
    pub async fn query_front_panel_locked(&self) -> HlxResult<bool> {
        let report = self
            .exchange(
                format::front_panel::query_locked(),
                Box::new(|r| matches!(r, Report::FrontPanelLocked(_))),
            )
            .await?;
        match report {
            Report::FrontPanelLocked(locked) => Ok(locked),
            _ => unreachable!("matcher admits only FrontPanelLocked"),
        }
    }

    /// Sets the front panel brightness.
    pub async fn set_front_panel_brightness(&self, brightness: Brightness) -> HlxResult<()> {
        self.exchange(
            format::front_panel::brightness(brightness),
            Box::new(move |r| matches!(r, Report::FrontPanelBrightness(b) if *b == brightness)),
        )
        .await?;
        Ok(())
    }

    /// Locks or unlocks the front panel keys.
    pub async fn set_front_panel_locked(&self, locked: bool) -> HlxResult<()> {
        self.exchange(
            format::front_panel::locked(locked),
            Box::new(move |r| matches!(r, Report::FrontPanelLocked(l) if *l == locked)),
        )
        .await?;
        Ok(())
    }

    // ── Network and configuration ──────────────────────────────────────

    /// Queries the Ethernet interface.
    pub async fn query_network(&self) -> HlxResult<()> {
        self.exchange(
            format::network::query(),
            Box::new(|r| matches!(r, Report::NetworkQueryDone)),
        )
        .await?;
        Ok(())
    }

    /// Queries the complete current configuration in one dump.
    pub async fn query_current_configuration(&self) -> HlxResult<()> {
        self.exchange(
            format::configuration::query_current(),
            Box::new(|r| matches!(r, Report::ConfigurationQueryDone)),
        )
        .await?;
        Ok(())
    }

    /// Asks the controller to save its configuration now.
    pub async fn save_configuration(&self) -> HlxResult<()> {
        self.exchange(
            format::configuration::save(),
            Box::new(|r| matches!(r, Report::Saving)),
        )
        .await?;
        Ok(())
    }

    /// Asks the controller to reload its saved configuration.
    ///
    /// A controller whose backing store failed answers with a reset to
    /// defaults instead; both complete the exchange.
    pub async fn load_configuration(&self) -> HlxResult<()> {
        self.exchange(
            format::configuration::load(),
            Box::new(|r| matches!(r, Report::LoadComplete | Report::ResetComplete)),
        )
        .await?;
        Ok(())
    }

    /// Asks the controller to reset its configuration to defaults.
    pub async fn reset_configuration(&self) -> HlxResult<()> {
        self.exchange(
            format::configuration::reset(),
            Box::new(|r| matches!(r, Report::ResetComplete)),
        )
        .await?;
        Ok(())
    }
}

fn expect_zone_volume(report: &Report) -> Level {
    match report {
        Report::ZoneVolume { level, .. } => *level,
        _ => unreachable!("matcher admits only ZoneVolume"),
    }
}

fn expect_zone_balance(report: &Report) -> Bias {
    match report {
        Report::ZoneBalance { bias, .. } => *bias,
        _ => unreachable!("matcher admits only ZoneBalance"),
    }
}

fn expect_zone_tone(report: &Report) -> (ToneLevel, ToneLevel) {
    match report {
        Report::ZoneTone { bass, treble, .. } => (*bass, *treble),
        _ => unreachable!("matcher admits only ZoneTone"),
    }
}
