//! Request handling: parsed requests to model mutations and reply frames.
//!
//! [`handle_request`] is a pure function over the model so the whole
//! command surface is testable without sockets. Each outcome separates the
//! frames that answer the requesting peer from the frames broadcast to
//! every other peer, carries the state-change notifications for mutations
//! that actually changed something, and flags the configuration dirty when
//! persistent state moved.

use crate::config::Config;
use crate::error::{ModelError, ModelResult};
use crate::events::StateChange;
use crate::model::group::GroupSource;
use crate::model::ids::{GroupId, PresetId, SourceId, ZoneId};
use crate::model::{DeviceModel, SetOutcome};
use crate::protocol::format;
use crate::protocol::parse::Request;

/// What a handled request produced.
#[derive(Debug, Default, PartialEq)]
pub struct HandlerOutcome {
    /// Frames for the requesting peer, in order.
    pub reply: Vec<String>,
    /// Frames for every other peer, in order.
    pub broadcast: Vec<String>,
    /// Notifications for mutations that changed a value.
    pub changes: Vec<StateChange>,
    /// True when persistent state moved.
    pub dirty: bool,
    /// A configuration action for the controller to run (save/load/reset
    /// involve the backing store, which the handler never touches).
    pub action: Option<ConfigAction>,
}

/// Configuration lifecycle actions surfaced to the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigAction {
    /// Serialize the model to the backing store now.
    Save,
    /// Replace the model from the backing store.
    Load,
    /// Replace the model with built-in defaults.
    Reset,
}

impl HandlerOutcome {
    fn error() -> Self {
        Self {
            reply: vec![format::ERROR.to_string()],
            ..Self::default()
        }
    }

    /// Echoes `frame` to the requester, broadcasting it when `outcome`
    /// changed state, and records the notification and dirty flag.
    fn mutation(frame: String, outcome: SetOutcome, change: StateChange) -> Self {
        let mut result = Self {
            reply: vec![frame.clone()],
            ..Self::default()
        };
        if outcome.changed() {
            result.broadcast.push(frame);
            result.changes.push(change);
            result.dirty = true;
        }
        result
    }

    fn reply_only(frames: Vec<String>) -> Self {
        Self {
            reply: frames,
            ..Self::default()
        }
    }
}

/// Applies one request to the model.
///
/// Model errors (out-of-range values, locked volumes, empty groups,
/// duplicate names) collapse to the protocol's single `[ERROR]` reply; the
/// connection always survives.
pub fn handle_request(
    model: &mut DeviceModel,
    config: &Config,
    request: &Request,
) -> HandlerOutcome {
    match try_handle(model, config, request) {
        Ok(outcome) => outcome,
        Err(error) => {
            tracing::debug!(%error, ?request, "request rejected");
            HandlerOutcome::error()
        }
    }
}

/// Answers the read-only side of the command surface from an immutable
/// model. Returns `None` for mutations.
///
/// The proxy serves downstream queries from its upstream mirror through
/// this same function, which is why it never takes `&mut`.
pub(crate) fn handle_query(
    model: &DeviceModel,
    config: &Config,
    request: &Request,
) -> Option<ModelResult<Vec<String>>> {
    match request {
        Request::ZoneQuery(zone) => Some(zone_dump(model, *zone).map(|mut frames| {
            frames.push(format::zone::query(*zone));
            frames
        })),
        Request::ZoneQueryVolume(zone) => Some(
            model
                .zones
                .zone(*zone)
                .and_then(|z| z.volume().level())
                .map(|level| vec![format::zone::volume(*zone, level)]),
        ),
        Request::ZoneQueryMute(zone) => Some(
            model
                .zones
                .zone(*zone)
                .and_then(|z| z.volume().mute())
                .map(|mute| vec![format::zone::mute(*zone, mute)]),
        ),
        Request::ZoneQuerySource(zone) => Some(
            model
                .zones
                .zone(*zone)
                .and_then(|z| z.source())
                .map(|source| vec![format::zone::source(*zone, source)]),
        ),
        Request::GroupQuery(group) => Some(group_dump(model, *group).map(|mut frames| {
            frames.push(format::group::query(*group));
            frames
        })),
        Request::SourceQuery(source) => Some(model.sources.source(*source).map(|s| {
            let mut frames = Vec::new();
            if let Ok(name) = s.name() {
                frames.push(format::source::name(*source, &name));
            }
            frames.push(format::source::query(*source));
            frames
        })),
        Request::FavoriteQuery(favorite) => Some(model.favorites.favorite(*favorite).map(|f| {
            let mut frames = Vec::new();
            if let Ok(name) = f.name() {
                frames.push(format::favorite::name(*favorite, &name));
            }
            frames.push(format::favorite::query(*favorite));
            frames
        })),
        Request::PresetQuery(preset) => Some(preset_dump(model, *preset).map(|mut frames| {
            frames.push(format::preset::query(*preset));
            frames
        })),
        Request::FrontPanelQueryLocked => Some(model.front_panel.locked().map(|locked| {
            // The shipped hardware answers with the bare set-locked shape;
            // the documented form is opt-in for forward compatibility.
            let frame = if config.emit_documented_front_panel_query {
                format::front_panel::locked_documented(locked)
            } else {
                format::front_panel::locked(locked)
            };
            vec![frame]
        })),
        Request::NetworkQuery => {
            let mut frames = network_dump(model);
            frames.push(format::network::query());
            Some(Ok(frames))
        }
        Request::ConfigurationQuery => {
            let mut frames = full_dump(model);
            frames.push(format::configuration::query_current());
            Some(Ok(frames))
        }
        _ => None,
    }
}

fn try_handle(
    model: &mut DeviceModel,
    config: &Config,
    request: &Request,
) -> ModelResult<HandlerOutcome> {
    if let Some(frames) = handle_query(model, config, request) {
        return frames.map(HandlerOutcome::reply_only);
    }

    match request {
        // ── Zone mutations ─────────────────────────────────────────────
        Request::ZoneSetName { zone, name } => {
            if zone_name_taken(model, *zone, name) {
                return Err(ModelError::DuplicateName(name.clone()));
            }
            let outcome = model.zones.zone_mut(*zone)?.set_name(name)?;
            Ok(HandlerOutcome::mutation(
                format::zone::name(*zone, name),
                outcome,
                StateChange::ZoneName {
                    zone: *zone,
                    name: name.clone(),
                },
            ))
        }
        Request::ZoneSetSource { zone, source } => {
            source.check_max(model.sources.max())?;
            let outcome = model.zones.zone_mut(*zone)?.set_source(*source);
            let mut result = HandlerOutcome::mutation(
                format::zone::source(*zone, *source),
                outcome,
                StateChange::ZoneSource {
                    zone: *zone,
                    source: *source,
                },
            );
            if outcome.changed() {
                append_group_derivation(model, &mut result, *zone);
            }
            Ok(result)
        }
        Request::ZoneSetSourceAll { source } => {
            source.check_max(model.sources.max())?;
            let mut result = HandlerOutcome::default();
            for id in ZoneId::all(model.zones.max()) {
                let outcome = model.zones.zone_mut(id)?.set_source(*source);
                let frame = format::zone::source(id, *source);
                result.reply.push(frame.clone());
                if outcome.changed() {
                    result.broadcast.push(frame);
                    result.changes.push(StateChange::ZoneSource {
                        zone: id,
                        source: *source,
                    });
                    result.dirty = true;
                }
            }
            for id in ZoneId::all(model.zones.max()) {
                append_group_derivation(model, &mut result, id);
            }
            Ok(result)
        }
        Request::ZoneSetVolume { zone, level } => {
            model.zones.zone(*zone)?.volume().check_unlocked()?;
            let outcome = model.zones.zone_mut(*zone)?.volume_mut().set_level(*level)?;
            let mut result = HandlerOutcome::mutation(
                format::zone::volume(*zone, *level),
                outcome,
                StateChange::ZoneVolume {
                    zone: *zone,
                    level: *level,
                },
            );
            if outcome.changed() {
                append_group_derivation(model, &mut result, *zone);
            }
            Ok(result)
        }
        Request::ZoneSetVolumeAll { level } => {
            let mut result = HandlerOutcome::default();
            for id in ZoneId::all(model.zones.max()) {
                // Locked zones sit a set-all out.
                if model.zones.zone(id)?.volume().is_locked() {
                    continue;
                }
                let outcome = model.zones.zone_mut(id)?.volume_mut().set_level(*level)?;
                let frame = format::zone::volume(id, *level);
                result.reply.push(frame.clone());
                if outcome.changed() {
                    result.broadcast.push(frame);
                    result.changes.push(StateChange::ZoneVolume {
                        zone: id,
                        level: *level,
                    });
                    result.dirty = true;
                }
            }
            for id in ZoneId::all(model.zones.max()) {
                append_group_derivation(model, &mut result, id);
            }
            Ok(result)
        }
        Request::ZoneAdjustVolume { zone, up } => {
            model.zones.zone(*zone)?.volume().check_unlocked()?;
            let volume = model.zones.zone_mut(*zone)?.volume_mut();
            let outcome = if *up {
                volume.increase_level()?
            } else {
                volume.decrease_level()?
            };
            let level = volume.level()?;
            let mut result = HandlerOutcome::mutation(
                format::zone::volume(*zone, level),
                outcome,
                StateChange::ZoneVolume {
                    zone: *zone,
                    level,
                },
            );
            if outcome.changed() {
                append_group_derivation(model, &mut result, *zone);
            }
            Ok(result)
        }
        Request::ZoneSetVolumeFixed { zone, fixed } => {
            let outcome = model.zones.zone_mut(*zone)?.volume_mut().set_fixed(*fixed);
            // The volume family has no dedicated fixed notification; the
            // change still persists and echoes.
            let frame = format::zone::volume_fixed(*zone, *fixed);
            let mut result = HandlerOutcome::reply_only(vec![frame.clone()]);
            if outcome.changed() {
                result.broadcast.push(frame);
                result.dirty = true;
            }
            Ok(result)
        }
        Request::ZoneSetMute { zone, mute } => {
            let outcome = model.zones.zone_mut(*zone)?.volume_mut().set_mute(*mute);
            let mut result = HandlerOutcome::mutation(
                format::zone::mute(*zone, *mute),
                outcome,
                StateChange::ZoneMute {
                    zone: *zone,
                    mute: *mute,
                },
            );
            if outcome.changed() {
                append_group_derivation(model, &mut result, *zone);
            }
            Ok(result)
        }
        Request::ZoneToggleMute(zone) => {
            let mute = model.zones.zone_mut(*zone)?.volume_mut().toggle_mute();
            let mut result = HandlerOutcome::mutation(
                format::zone::mute(*zone, mute),
                SetOutcome::Changed,
                StateChange::ZoneMute { zone: *zone, mute },
            );
            append_group_derivation(model, &mut result, *zone);
            Ok(result)
        }
        Request::ZoneSetBalance { zone, bias } => {
            let outcome = model.zones.zone_mut(*zone)?.balance_mut().set_bias(*bias)?;
            Ok(HandlerOutcome::mutation(
                format::zone::balance(*zone, *bias),
                outcome,
                StateChange::ZoneBalance {
                    zone: *zone,
                    bias: *bias,
                },
            ))
        }
        Request::ZoneAdjustBalance { zone, left } => {
            let balance = model.zones.zone_mut(*zone)?.balance_mut();
            let outcome = if *left {
                balance.adjust_left()?
            } else {
                balance.adjust_right()?
            };
            let bias = balance.bias()?;
            Ok(HandlerOutcome::mutation(
                format::zone::balance(*zone, bias),
                outcome,
                StateChange::ZoneBalance { zone: *zone, bias },
            ))
        }
        Request::ZoneSetTone { zone, bass, treble } => {
            let outcome = model.zones.zone_mut(*zone)?.tone_mut().set(*bass, *treble)?;
            Ok(HandlerOutcome::mutation(
                format::zone::tone(*zone, *bass, *treble),
                outcome,
                StateChange::ZoneTone {
                    zone: *zone,
                    bass: *bass,
                    treble: *treble,
                },
            ))
        }
        Request::ZoneAdjustBass { zone, up } => {
            let tone = model.zones.zone_mut(*zone)?.tone_mut();
            let outcome = if *up {
                tone.increase_bass()?
            } else {
                tone.decrease_bass()?
            };
            let (bass, treble) = tone.levels()?;
            Ok(HandlerOutcome::mutation(
                format::zone::tone(*zone, bass, treble),
                outcome,
                StateChange::ZoneTone {
                    zone: *zone,
                    bass,
                    treble,
                },
            ))
        }
        Request::ZoneAdjustTreble { zone, up } => {
            let tone = model.zones.zone_mut(*zone)?.tone_mut();
            let outcome = if *up {
                tone.increase_treble()?
            } else {
                tone.decrease_treble()?
            };
            let (bass, treble) = tone.levels()?;
            Ok(HandlerOutcome::mutation(
                format::zone::tone(*zone, bass, treble),
                outcome,
                StateChange::ZoneTone {
                    zone: *zone,
                    bass,
                    treble,
                },
            ))
        }
        Request::ZoneSetSoundMode { zone, mode } => {
            let outcome = model.zones.zone_mut(*zone)?.set_sound_mode(*mode);
            Ok(HandlerOutcome::mutation(
                format::zone::sound_mode(*zone, *mode),
                outcome,
                StateChange::ZoneSoundMode {
                    zone: *zone,
                    mode: *mode,
                },
            ))
        }
        Request::ZoneSetEqualizerBand { zone, band, level } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .equalizer_mut()
                .band_mut(*band)?
                .set_level(*level)?;
            Ok(HandlerOutcome::mutation(
                format::zone::equalizer_band(*zone, *band, *level),
                outcome,
                StateChange::ZoneEqualizerBand {
                    zone: *zone,
                    band: *band,
                    level: *level,
                },
            ))
        }
        Request::ZoneAdjustEqualizerBand { zone, band, up } => {
            let band_model = model
                .zones
                .zone_mut(*zone)?
                .equalizer_mut()
                .band_mut(*band)?;
            let outcome = if *up {
                band_model.increase_level()?
            } else {
                band_model.decrease_level()?
            };
            let level = band_model.level()?;
            Ok(HandlerOutcome::mutation(
                format::zone::equalizer_band(*zone, *band, level),
                outcome,
                StateChange::ZoneEqualizerBand {
                    zone: *zone,
                    band: *band,
                    level,
                },
            ))
        }
        Request::ZoneSetEqualizerPreset { zone, preset } => {
            preset.check_max(model.equalizer_presets.max())?;
            let outcome = model.zones.zone_mut(*zone)?.set_equalizer_preset(*preset);
            Ok(HandlerOutcome::mutation(
                format::zone::equalizer_preset(*zone, *preset),
                outcome,
                StateChange::ZoneEqualizerPreset {
                    zone: *zone,
                    preset: *preset,
                },
            ))
        }
        Request::ZoneSetHighpass { zone, frequency } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .highpass_mut()
                .set_frequency(*frequency)?;
            Ok(HandlerOutcome::mutation(
                format::zone::highpass(*zone, *frequency),
                outcome,
                StateChange::ZoneHighpass {
                    zone: *zone,
                    frequency: *frequency,
                },
            ))
        }
        Request::ZoneSetLowpass { zone, frequency } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .lowpass_mut()
                .set_frequency(*frequency)?;
            Ok(HandlerOutcome::mutation(
                format::zone::lowpass(*zone, *frequency),
                outcome,
                StateChange::ZoneLowpass {
                    zone: *zone,
                    frequency: *frequency,
                },
            ))
        }

        // ── Groups ─────────────────────────────────────────────────────
        Request::GroupSetName { group, name } => {
            if group_name_taken(model, *group, name) {
                return Err(ModelError::DuplicateName(name.clone()));
            }
            let outcome = model.groups.group_mut(*group)?.set_name(name)?;
            Ok(HandlerOutcome::mutation(
                format::group::name(*group, name),
                outcome,
                StateChange::GroupName {
                    group: *group,
                    name: name.clone(),
                },
            ))
        }
        Request::GroupSetSource { group, source } => {
            source.check_max(model.sources.max())?;
            let outcomes = fan_out(model, *group, |zone| Ok(zone.set_source(*source)))?;
            let mut member_frames = Vec::new();
            let mut changes = Vec::new();
            for (member, outcome) in &outcomes {
                if outcome.changed() {
                    member_frames.push(format::zone::source(*member, *source));
                    changes.push(StateChange::ZoneSource {
                        zone: *member,
                        source: *source,
                    });
                }
            }
            Ok(group_mutation_outcome(
                model,
                *group,
                format::group::source(*group, GroupSource::Single(*source)),
                member_frames,
                changes,
                &outcomes,
            ))
        }
        Request::GroupSetVolume { group, level } => {
            let outcomes = fan_out(model, *group, |zone| {
                // Locked members sit group volume out.
                if zone.volume().is_locked() {
                    return Ok(SetOutcome::AlreadySet);
                }
                zone.volume_mut().set_level(*level)
            })?;
            let mut member_frames = Vec::new();
            let mut changes = Vec::new();
            for (member, outcome) in &outcomes {
                if outcome.changed() {
                    member_frames.push(format::zone::volume(*member, *level));
                    changes.push(StateChange::ZoneVolume {
                        zone: *member,
                        level: *level,
                    });
                }
            }
            Ok(group_mutation_outcome(
                model,
                *group,
                format::group::volume(*group, *level),
                member_frames,
                changes,
                &outcomes,
            ))
        }
        Request::GroupAdjustVolume { group, up } => {
            let outcomes = fan_out(model, *group, |zone| {
                let volume = zone.volume_mut();
                if volume.is_locked() || volume.level().is_err() {
                    return Ok(SetOutcome::AlreadySet);
                }
                if *up {
                    volume.increase_level()
                } else {
                    volume.decrease_level()
                }
            })?;
            let mut member_frames = Vec::new();
            let mut changes = Vec::new();
            for (member, outcome) in &outcomes {
                if outcome.changed() {
                    let level = model.zones.zone(*member)?.volume().level()?;
                    member_frames.push(format::zone::volume(*member, level));
                    changes.push(StateChange::ZoneVolume {
                        zone: *member,
                        level,
                    });
                }
            }
            let derived = model.groups.group(*group)?.derive_state(&model.zones)?;
            let level = derived
                .volume
                .ok_or(ModelError::NotInitialized("group volume"))?;
            Ok(group_mutation_outcome(
                model,
                *group,
                format::group::volume(*group, level),
                member_frames,
                changes,
                &outcomes,
            ))
        }
        Request::GroupSetMute { group, mute } => {
            let outcomes =
                fan_out(model, *group, |zone| Ok(zone.volume_mut().set_mute(*mute)))?;
            let mut member_frames = Vec::new();
            let mut changes = Vec::new();
            for (member, outcome) in &outcomes {
                if outcome.changed() {
                    member_frames.push(format::zone::mute(*member, *mute));
                    changes.push(StateChange::ZoneMute {
                        zone: *member,
                        mute: *mute,
                    });
                }
            }
            Ok(group_mutation_outcome(
                model,
                *group,
                format::group::mute(*group, *mute),
                member_frames,
                changes,
                &outcomes,
            ))
        }
        Request::GroupToggleMute(group) => {
            // The toggle flips the derived state: a partially-muted group
            // counts as unmuted, so toggling mutes every member.
            let derived = model.groups.group(*group)?.derive_state(&model.zones)?;
            let mute = !derived.mute;
            let outcomes = fan_out(model, *group, |zone| Ok(zone.volume_mut().set_mute(mute)))?;
            let mut member_frames = Vec::new();
            let mut changes = Vec::new();
            for (member, outcome) in &outcomes {
                if outcome.changed() {
                    member_frames.push(format::zone::mute(*member, mute));
                    changes.push(StateChange::ZoneMute {
                        zone: *member,
                        mute,
                    });
                }
            }
            Ok(group_mutation_outcome(
                model,
                *group,
                format::group::mute(*group, mute),
                member_frames,
                changes,
                &outcomes,
            ))
        }
        Request::GroupAddZone { group, zone } => {
            zone.check_max(model.zones.max())?;
            let outcome = model.groups.group_mut(*group)?.add_zone(*zone);
            let mut result = HandlerOutcome::mutation(
                format::group::add_zone(*group, *zone),
                outcome,
                StateChange::GroupZoneAdded {
                    group: *group,
                    zone: *zone,
                },
            );
            if outcome.changed() {
                append_group_events(model, &mut result, *group);
            }
            Ok(result)
        }
        Request::GroupRemoveZone { group, zone } => {
            let outcome = model.groups.group_mut(*group)?.remove_zone(*zone);
            let mut result = HandlerOutcome::mutation(
                format::group::remove_zone(*group, *zone),
                outcome,
                StateChange::GroupZoneRemoved {
                    group: *group,
                    zone: *zone,
                },
            );
            if outcome.changed() && !model.groups.group(*group)?.is_empty() {
                append_group_events(model, &mut result, *group);
            }
            Ok(result)
        }

        // ── Sources ────────────────────────────────────────────────────
        Request::SourceSetName { source, name } => {
            if source_name_taken(model, *source, name) {
                return Err(ModelError::DuplicateName(name.clone()));
            }
            let outcome = model.sources.source_mut(*source)?.set_name(name)?;
            Ok(HandlerOutcome::mutation(
                format::source::name(*source, name),
                outcome,
                StateChange::SourceName {
                    source: *source,
                    name: name.clone(),
                },
            ))
        }

        // ── Favorites ──────────────────────────────────────────────────
        Request::FavoriteSetName { favorite, name } => {
            if favorite_name_taken(model, *favorite, name) {
                return Err(ModelError::DuplicateName(name.clone()));
            }
            let outcome = model.favorites.favorite_mut(*favorite)?.set_name(name)?;
            Ok(HandlerOutcome::mutation(
                format::favorite::name(*favorite, name),
                outcome,
                StateChange::FavoriteName {
                    favorite: *favorite,
                    name: name.clone(),
                },
            ))
        }

        // ── Equalizer presets ──────────────────────────────────────────
        Request::PresetSetName { preset, name } => {
            if preset_name_taken(model, *preset, name) {
                return Err(ModelError::DuplicateName(name.clone()));
            }
            let outcome = model.equalizer_presets.preset_mut(*preset)?.set_name(name)?;
            Ok(HandlerOutcome::mutation(
                format::preset::name(*preset, name),
                outcome,
                StateChange::EqualizerPresetName {
                    preset: *preset,
                    name: name.clone(),
                },
            ))
        }
        Request::PresetSetBand {
            preset,
            band,
            level,
        } => {
            let outcome = model
                .equalizer_presets
                .preset_mut(*preset)?
                .bands_mut()
                .band_mut(*band)?
                .set_level(*level)?;
            Ok(HandlerOutcome::mutation(
                format::preset::band(*preset, *band, *level),
                outcome,
                StateChange::EqualizerPresetBand {
                    preset: *preset,
                    band: *band,
                    level: *level,
                },
            ))
        }
        Request::PresetAdjustBand { preset, band, up } => {
            let band_model = model
                .equalizer_presets
                .preset_mut(*preset)?
                .bands_mut()
                .band_mut(*band)?;
            let outcome = if *up {
                band_model.increase_level()?
            } else {
                band_model.decrease_level()?
            };
            let level = band_model.level()?;
            Ok(HandlerOutcome::mutation(
                format::preset::band(*preset, *band, level),
                outcome,
                StateChange::EqualizerPresetBand {
                    preset: *preset,
                    band: *band,
                    level,
                },
            ))
        }

        // ── Front panel ────────────────────────────────────────────────
        Request::FrontPanelSetBrightness(brightness) => {
            let outcome = model.front_panel.set_brightness(*brightness)?;
            Ok(HandlerOutcome::mutation(
                format::front_panel::brightness(*brightness),
                outcome,
                StateChange::FrontPanelBrightness {
                    brightness: *brightness,
                },
            ))
        }
        Request::FrontPanelSetLocked(locked) => {
            let outcome = model.front_panel.set_locked(*locked);
            Ok(HandlerOutcome::mutation(
                format::front_panel::locked(*locked),
                outcome,
                StateChange::FrontPanelLocked { locked: *locked },
            ))
        }

        // ── Configuration ──────────────────────────────────────────────
        Request::ConfigurationSave => Ok(HandlerOutcome {
            action: Some(ConfigAction::Save),
            ..HandlerOutcome::default()
        }),
        Request::ConfigurationLoad => Ok(HandlerOutcome {
            action: Some(ConfigAction::Load),
            ..HandlerOutcome::default()
        }),
        Request::ConfigurationReset => Ok(HandlerOutcome {
            action: Some(ConfigAction::Reset),
            ..HandlerOutcome::default()
        }),

        Request::ZoneQuery(_)
        | Request::ZoneQueryVolume(_)
        | Request::ZoneQueryMute(_)
        | Request::ZoneQuerySource(_)
        | Request::GroupQuery(_)
        | Request::SourceQuery(_)
        | Request::FavoriteQuery(_)
        | Request::PresetQuery(_)
        | Request::FrontPanelQueryLocked
        | Request::NetworkQuery
        | Request::ConfigurationQuery => {
            unreachable!("queries are answered by handle_query above")
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Group fan-out
// ─────────────────────────────────────────────────────────────────────────────

/// Applies `operation` to every member zone of `group`, collecting each
/// member's outcome.
///
/// Rejects empty groups before touching anything; the operation decides
/// how to treat per-member conditions (a locked volume reports
/// `AlreadySet` and sits the mutation out).
fn fan_out(
    model: &mut DeviceModel,
    group: GroupId,
    mut operation: impl FnMut(&mut crate::model::Zone) -> ModelResult<SetOutcome>,
) -> ModelResult<Vec<(ZoneId, SetOutcome)>> {
    let members: Vec<ZoneId> = model.groups.group(group)?.members().collect();
    if members.is_empty() {
        return Err(ModelError::EmptyGroup(group.get()));
    }
    let mut outcomes = Vec::with_capacity(members.len());
    for member in members {
        let outcome = operation(model.zones.zone_mut(member)?)?;
        outcomes.push((member, outcome));
    }
    Ok(outcomes)
}

/// Assembles the reply/broadcast/notification set for a completed group
/// fan-out: member frames first, the group echo last (the requester's
/// completion signal), group-level derived events only when a member
/// actually moved.
fn group_mutation_outcome(
    model: &DeviceModel,
    group: GroupId,
    echo: String,
    member_frames: Vec<String>,
    changes: Vec<StateChange>,
    outcomes: &[(ZoneId, SetOutcome)],
) -> HandlerOutcome {
    let mut result = HandlerOutcome {
        reply: member_frames.clone(),
        broadcast: member_frames,
        changes,
        ..HandlerOutcome::default()
    };
    result.reply.push(echo.clone());
    if outcomes.iter().any(|(_, outcome)| outcome.changed()) {
        result.broadcast.push(echo);
        result.dirty = true;
        append_group_events(model, &mut result, group);
    }
    result
}

/// Recomputes one group's derived triple and appends the group-level
/// notifications. Called after any fan-out mutation.
fn append_group_events(model: &DeviceModel, result: &mut HandlerOutcome, group: GroupId) {
    let Ok(group_model) = model.groups.group(group) else {
        return;
    };
    let Ok(derived) = group_model.derive_state(&model.zones) else {
        return;
    };
    if let Some(level) = derived.volume {
        result.changes.push(StateChange::GroupVolume { group, level });
    }
    result.changes.push(StateChange::GroupMute {
        group,
        mute: derived.mute,
    });
    result.changes.push(StateChange::GroupSource {
        group,
        source: derived.source,
    });
}

/// Appends derived-state notifications for every group containing `zone`.
/// Zone-level mutations ripple into the groups that aggregate the zone.
fn append_group_derivation(model: &DeviceModel, result: &mut HandlerOutcome, zone: ZoneId) {
    for group in model.groups.containing(zone) {
        append_group_events(model, result, group);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Duplicate-name checks
// ─────────────────────────────────────────────────────────────────────────────

fn zone_name_taken(model: &DeviceModel, zone: ZoneId, name: &str) -> bool {
    matches!(model.zones.find_by_name(name), Some(other) if other.identifier() != zone)
}

fn group_name_taken(model: &DeviceModel, group: GroupId, name: &str) -> bool {
    matches!(model.groups.find_by_name(name), Some(other) if other.identifier() != group)
}

fn source_name_taken(model: &DeviceModel, source: SourceId, name: &str) -> bool {
    matches!(model.sources.find_by_name(name), Some(other) if other.identifier() != source)
}

fn favorite_name_taken(model: &DeviceModel, favorite: crate::model::FavoriteId, name: &str) -> bool {
    matches!(model.favorites.find_by_name(name), Some(other) if other.identifier() != favorite)
}

fn preset_name_taken(model: &DeviceModel, preset: PresetId, name: &str) -> bool {
    matches!(
        model.equalizer_presets.find_by_name(name),
        Some(other) if other.identifier() != preset
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Query dumps
// ─────────────────────────────────────────────────────────────────────────────

/// Every reportable property of one zone, uninitialized properties
/// skipped, query echo excluded.
fn zone_dump(model: &DeviceModel, id: ZoneId) -> ModelResult<Vec<String>> {
    let zone = model.zones.zone(id)?;
    let mut frames = Vec::new();
    if let Ok(name) = zone.name() {
        frames.push(format::zone::name(id, &name));
    }
    if let Ok(source) = zone.source() {
        frames.push(format::zone::source(id, source));
    }
    if let Ok(level) = zone.volume().level() {
        frames.push(format::zone::volume(id, level));
    }
    if let Ok(fixed) = zone.volume().fixed() {
        frames.push(format::zone::volume_fixed(id, fixed));
    }
    if let Ok(mute) = zone.volume().mute() {
        frames.push(format::zone::mute(id, mute));
    }
    if let Ok(bias) = zone.balance().bias() {
        frames.push(format::zone::balance(id, bias));
    }
    if let Ok((bass, treble)) = zone.tone().levels() {
        frames.push(format::zone::tone(id, bass, treble));
    }
    if let Ok(mode) = zone.sound_mode() {
        frames.push(format::zone::sound_mode(id, mode));
    }
    if let Ok(preset) = zone.equalizer_preset() {
        frames.push(format::zone::equalizer_preset(id, preset));
    }
    for (band_id, band) in zone.equalizer().iter() {
        if let Ok(level) = band.level() {
            frames.push(format::zone::equalizer_band(id, band_id, level));
        }
    }
    if let Ok(frequency) = zone.highpass().frequency() {
        frames.push(format::zone::highpass(id, frequency));
    }
    if let Ok(frequency) = zone.lowpass().frequency() {
        frames.push(format::zone::lowpass(id, frequency));
    }
    Ok(frames)
}

/// Name, membership, and derived state of one group, echo excluded.
fn group_dump(model: &DeviceModel, id: GroupId) -> ModelResult<Vec<String>> {
    let group = model.groups.group(id)?;
    let mut frames = Vec::new();
    if let Ok(name) = group.name() {
        frames.push(format::group::name(id, &name));
    }
    for member in group.members() {
        frames.push(format::group::add_zone(id, member));
    }
    if let Ok(derived) = group.derive_state(&model.zones) {
        frames.push(format::group::source(id, derived.source));
        if let Some(level) = derived.volume {
            frames.push(format::group::volume(id, level));
        }
        frames.push(format::group::mute(id, derived.mute));
    }
    Ok(frames)
}

/// Name and bands of one preset, echo excluded.
fn preset_dump(model: &DeviceModel, id: PresetId) -> ModelResult<Vec<String>> {
    let preset = model.equalizer_presets.preset(id)?;
    let mut frames = Vec::new();
    if let Ok(name) = preset.name() {
        frames.push(format::preset::name(id, &name));
    }
    for (band_id, band) in preset.bands().iter() {
        if let Ok(level) = band.level() {
            frames.push(format::preset::band(id, band_id, level));
        }
    }
    Ok(frames)
}

/// The network interface report frames, echo excluded. Frame order
/// follows the hardware: DHCP, MAC, IP, GW, NM, SDDP.
fn network_dump(model: &DeviceModel) -> Vec<String> {
    let network = &model.network;
    let mut frames = Vec::new();
    if let Ok(enabled) = network.dhcpv4_enabled() {
        frames.push(format::network::dhcp(enabled));
    }
    if let Ok(address) = network.ethernet_eui48() {
        frames.push(format::network::mac(address));
    }
    if let Ok(address) = network.host_address() {
        frames.push(format::network::host(address));
    }
    if let Ok(address) = network.default_router_address() {
        frames.push(format::network::router(address));
    }
    if let Ok(address) = network.netmask() {
        frames.push(format::network::netmask(address));
    }
    if let Ok(enabled) = network.sddp_enabled() {
        frames.push(format::network::sddp(enabled));
    }
    frames
}

fn front_panel_dump(model: &DeviceModel) -> Vec<String> {
    let mut frames = Vec::new();
    if let Ok(brightness) = model.front_panel.brightness() {
        frames.push(format::front_panel::brightness(brightness));
    }
    if let Ok(locked) = model.front_panel.locked() {
        frames.push(format::front_panel::locked(locked));
    }
    frames
}

/// The complete configuration dump, in the order the hardware emits it:
/// network, front panel, sources, favorites, equalizer presets, zones,
/// groups. Echo excluded.
fn full_dump(model: &DeviceModel) -> Vec<String> {
    let mut frames = network_dump(model);
    frames.extend(front_panel_dump(model));
    for source in model.sources.iter() {
        if let Ok(name) = source.name() {
            frames.push(format::source::name(source.identifier(), &name));
        }
    }
    for favorite in model.favorites.iter() {
        if let Ok(name) = favorite.name() {
            frames.push(format::favorite::name(favorite.identifier(), &name));
        }
    }
    for preset in model.equalizer_presets.iter() {
        frames.extend(preset_dump(model, preset.identifier()).unwrap_or_default());
    }
    for zone in model.zones.iter() {
        frames.extend(zone_dump(model, zone.identifier()).unwrap_or_default());
    }
    for group in model.groups.iter() {
        frames.extend(group_dump(model, group.identifier()).unwrap_or_default());
    }
    frames
}
