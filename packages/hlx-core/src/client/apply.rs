//! Applying inbound state reports to the client's mirror model.
//!
//! Every report - an exchange completion or an unsolicited notification -
//! flows through [`apply_report`], which mutates the mirror and returns
//! the notifications for values that actually changed. Group-level derived
//! reports never mutate the mirror: groups are recomputed from member
//! zones, either immediately (steady state) or in the deferred derivation
//! pass at the end of a refresh.

use crate::events::StateChange;
use crate::model::ids::ZoneId;
use crate::model::{DeviceModel, SetOutcome};
use crate::protocol::parse::Report;

/// Whether zone mutations should ripple into group derivation now or be
/// left for a batch pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRipple {
    /// Recompute containing groups after each zone mutation.
    Immediate,
    /// Leave derivation to the caller (refresh batches it).
    Deferred,
}

/// Applies one report to the mirror, returning the changes it caused.
///
/// Reports that carry out-of-range values for the mirror's capacity (a
/// server with more zones than we were configured for, say) are logged
/// and skipped; the connection is not at fault and survives.
pub fn apply_report(
    model: &mut DeviceModel,
    report: &Report,
    ripple: GroupRipple,
) -> Vec<StateChange> {
    let mut changes = Vec::new();
    if let Err(error) = try_apply(model, report, ripple, &mut changes) {
        tracing::warn!(%error, ?report, "discarding unappliable report");
        return Vec::new();
    }
    changes
}

fn try_apply(
    model: &mut DeviceModel,
    report: &Report,
    ripple: GroupRipple,
    changes: &mut Vec<StateChange>,
) -> crate::error::ModelResult<()> {
    match report {
        Report::ZoneName { zone, name } => {
            let outcome = model.zones.zone_mut(*zone)?.set_name(name)?;
            push_if(changes, outcome, || StateChange::ZoneName {
                zone: *zone,
                name: name.clone(),
            });
        }
        Report::ZoneSource { zone, source } => {
            source.check_max(model.sources.max())?;
            let outcome = model.zones.zone_mut(*zone)?.set_source(*source);
            push_if(changes, outcome, || StateChange::ZoneSource {
                zone: *zone,
                source: *source,
            });
            ripple_groups(model, *zone, ripple, outcome, changes);
        }
        Report::ZoneVolume { zone, level } => {
            // The mirror never locks levels; fixed only gates requests.
            let outcome = model.zones.zone_mut(*zone)?.volume_mut().set_level(*level)?;
            push_if(changes, outcome, || StateChange::ZoneVolume {
                zone: *zone,
                level: *level,
            });
            ripple_groups(model, *zone, ripple, outcome, changes);
        }
        Report::ZoneVolumeFixed { zone, fixed } => {
            // No notification variant in the volume family for the lock
            // bit; the mirror still tracks it so writes can pre-flight.
            let _ = model.zones.zone_mut(*zone)?.volume_mut().set_fixed(*fixed);
        }
        Report::ZoneMute { zone, mute } => {
            let outcome = model.zones.zone_mut(*zone)?.volume_mut().set_mute(*mute);
            push_if(changes, outcome, || StateChange::ZoneMute {
                zone: *zone,
                mute: *mute,
            });
            ripple_groups(model, *zone, ripple, outcome, changes);
        }
        Report::ZoneBalance { zone, bias } => {
            let outcome = model.zones.zone_mut(*zone)?.balance_mut().set_bias(*bias)?;
            push_if(changes, outcome, || StateChange::ZoneBalance {
                zone: *zone,
                bias: *bias,
            });
        }
        Report::ZoneTone { zone, bass, treble } => {
            let outcome = model.zones.zone_mut(*zone)?.tone_mut().set(*bass, *treble)?;
            push_if(changes, outcome, || StateChange::ZoneTone {
                zone: *zone,
                bass: *bass,
                treble: *treble,
            });
        }
        Report::ZoneSoundMode { zone, mode } => {
            let outcome = model.zones.zone_mut(*zone)?.set_sound_mode(*mode);
            push_if(changes, outcome, || StateChange::ZoneSoundMode {
                zone: *zone,
                mode: *mode,
            });
        }
        Report::ZoneEqualizerBand { zone, band, level } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .equalizer_mut()
                .band_mut(*band)?
                .set_level(*level)?;
            push_if(changes, outcome, || StateChange::ZoneEqualizerBand {
                zone: *zone,
                band: *band,
                level: *level,
            });
        }
        Report::ZoneEqualizerPreset { zone, preset } => {
            preset.check_max(model.equalizer_presets.max())?;
            let outcome = model.zones.zone_mut(*zone)?.set_equalizer_preset(*preset);
            push_if(changes, outcome, || StateChange::ZoneEqualizerPreset {
                zone: *zone,
                preset: *preset,
            });
        }
        Report::ZoneHighpass { zone, frequency } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .highpass_mut()
                .set_frequency(*frequency)?;
            push_if(changes, outcome, || StateChange::ZoneHighpass {
                zone: *zone,
                frequency: *frequency,
            });
        }
        Report::ZoneLowpass { zone, frequency } => {
            let outcome = model
                .zones
                .zone_mut(*zone)?
                .lowpass_mut()
                .set_frequency(*frequency)?;
            push_if(changes, outcome, || StateChange::ZoneLowpass {
                zone: *zone,
                frequency: *frequency,
            });
        }

        Report::GroupName { group, name } => {
            let outcome = model.groups.group_mut(*group)?.set_name(name)?;
            push_if(changes, outcome, || StateChange::GroupName {
                group: *group,
                name: name.clone(),
            });
        }
        Report::GroupZoneAdded { group, zone } => {
            zone.check_max(model.zones.max())?;
            let outcome = model.groups.group_mut(*group)?.add_zone(*zone);
            push_if(changes, outcome, || StateChange::GroupZoneAdded {
                group: *group,
                zone: *zone,
            });
            ripple_groups(model, *zone, ripple, outcome, changes);
        }
        Report::GroupZoneRemoved { group, zone } => {
            let outcome = model.groups.group_mut(*group)?.remove_zone(*zone);
            push_if(changes, outcome, || StateChange::GroupZoneRemoved {
                group: *group,
                zone: *zone,
            });
        }
        // Derived state: the mirror recomputes these from member zones,
        // so the wire reports are completion signals only.
        Report::GroupSource { .. } | Report::GroupVolume { .. } | Report::GroupMute { .. } => {}

        Report::SourceName { source, name } => {
            let outcome = model.sources.source_mut(*source)?.set_name(name)?;
            push_if(changes, outcome, || StateChange::SourceName {
                source: *source,
                name: name.clone(),
            });
        }
        Report::FavoriteName { favorite, name } => {
            let outcome = model.favorites.favorite_mut(*favorite)?.set_name(name)?;
            push_if(changes, outcome, || StateChange::FavoriteName {
                favorite: *favorite,
                name: name.clone(),
            });
        }
        Report::PresetName { preset, name } => {
            let outcome = model.equalizer_presets.preset_mut(*preset)?.set_name(name)?;
            push_if(changes, outcome, || StateChange::EqualizerPresetName {
                preset: *preset,
                name: name.clone(),
            });
        }
        Report::PresetBand {
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
            push_if(changes, outcome, || StateChange::EqualizerPresetBand {
                preset: *preset,
                band: *band,
                level: *level,
            });
        }

        Report::FrontPanelBrightness(brightness) => {
            let outcome = model.front_panel.set_brightness(*brightness)?;
            push_if(changes, outcome, || StateChange::FrontPanelBrightness {
                brightness: *brightness,
            });
        }
        Report::FrontPanelLocked(locked) => {
            let outcome = model.front_panel.set_locked(*locked);
            push_if(changes, outcome, || StateChange::FrontPanelLocked {
                locked: *locked,
            });
        }

        Report::NetworkDhcp(enabled) => {
            let outcome = model.network.set_dhcpv4_enabled(*enabled);
            push_if(changes, outcome, || StateChange::NetworkDhcpv4Enabled {
                enabled: *enabled,
            });
        }
        Report::NetworkSddp(enabled) => {
            let outcome = model.network.set_sddp_enabled(*enabled);
            push_if(changes, outcome, || StateChange::NetworkSddpEnabled {
                enabled: *enabled,
            });
        }
        Report::NetworkMac(address) => {
            let outcome = model.network.set_ethernet_eui48(*address);
            push_if(changes, outcome, || StateChange::NetworkEthernetEui48 {
                address: *address,
            });
        }
        Report::NetworkHostAddress(address) => {
            let outcome = model.network.set_host_address(*address);
            push_if(changes, outcome, || StateChange::NetworkHostAddress {
                address: *address,
            });
        }
        Report::NetworkNetmask(address) => {
            let outcome = model.network.set_netmask(*address);
            push_if(changes, outcome, || StateChange::NetworkNetmask {
                address: *address,
            });
        }
        Report::NetworkRouter(address) => {
            let outcome = model.network.set_default_router_address(*address);
            push_if(changes, outcome, || {
                StateChange::NetworkDefaultRouterAddress { address: *address }
            });
        }

        Report::Saving => changes.push(StateChange::ConfigurationSaving),
        Report::LoadComplete => changes.push(StateChange::ConfigurationLoaded),
        Report::ResetComplete => changes.push(StateChange::ConfigurationReset),

        // Completion signals and the error report carry no state.
        Report::ZoneQueryDone(_)
        | Report::GroupQueryDone(_)
        | Report::SourceQueryDone(_)
        | Report::FavoriteQueryDone(_)
        | Report::PresetQueryDone(_)
        | Report::NetworkQueryDone
        | Report::ConfigurationQueryDone
        | Report::Error => {}
    }
    Ok(())
}

fn push_if(
    changes: &mut Vec<StateChange>,
    outcome: SetOutcome,
    change: impl FnOnce() -> StateChange,
) {
    if outcome.changed() {
        changes.push(change());
    }
}

/// Appends derived-state notifications for every group containing `zone`,
/// when the mutation changed something and derivation is immediate.
fn ripple_groups(
    model: &DeviceModel,
    zone: ZoneId,
    ripple: GroupRipple,
    outcome: SetOutcome,
    changes: &mut Vec<StateChange>,
) {
    if ripple == GroupRipple::Deferred || !outcome.changed() {
        return;
    }
    for group in model.groups.containing(zone) {
        changes.extend(derive_group_changes(model, group));
    }
}

/// Recomputes one group's derived triple as notifications.
pub fn derive_group_changes(
    model: &DeviceModel,
    group: crate::model::GroupId,
) -> Vec<StateChange> {
    let mut changes = Vec::new();
    let Ok(group_model) = model.groups.group(group) else {
        return changes;
    };
    let Ok(derived) = group_model.derive_state(&model.zones) else {
        return changes;
    };
    if let Some(level) = derived.volume {
        changes.push(StateChange::GroupVolume { group, level });
    }
    changes.push(StateChange::GroupMute {
        group,
        mute: derived.mute,
    });
    changes.push(StateChange::GroupSource {
        group,
        source: derived.source,
    });
    changes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Capacity;
    use crate::model::group::GroupSource;
    use crate::model::ids::{GroupId, SourceId};

    fn model() -> DeviceModel {
        DeviceModel::new(&Capacity {
            zones: 4,
            sources: 4,
            groups: 2,
            favorites: 2,
            equalizer_presets: 2,
            equalizer_bands: 10,
        })
    }

    fn z(n: u8) -> ZoneId {
        ZoneId::new(n).unwrap()
    }

    fn g(n: u8) -> GroupId {
        GroupId::new(n).unwrap()
    }

    #[test]
    fn volume_report_mutates_and_notifies_once() {
        let mut model = model();
        let report = Report::ZoneVolume {
            zone: z(3),
            level: -25,
        };

        let changes = apply_report(&mut model, &report, GroupRipple::Immediate);
        assert_eq!(
            changes,
            vec![StateChange::ZoneVolume {
                zone: z(3),
                level: -25
            }]
        );

        // The identical report again is a no-op: no notification.
        let changes = apply_report(&mut model, &report, GroupRipple::Immediate);
        assert!(changes.is_empty());
    }

    #[test]
    fn zone_mutation_ripples_into_containing_groups() {
        let mut model = model();
        apply_report(
            &mut model,
            &Report::GroupZoneAdded {
                group: g(1),
                zone: z(2),
            },
            GroupRipple::Immediate,
        );
        apply_report(
            &mut model,
            &Report::GroupZoneAdded {
                group: g(1),
                zone: z(3),
            },
            GroupRipple::Immediate,
        );
        apply_report(
            &mut model,
            &Report::ZoneVolume {
                zone: z(2),
                level: -20,
            },
            GroupRipple::Immediate,
        );
        let changes = apply_report(
            &mut model,
            &Report::ZoneVolume {
                zone: z(3),
                level: -40,
            },
            GroupRipple::Immediate,
        );

        assert!(changes.contains(&StateChange::GroupVolume {
            group: g(1),
            level: -30
        }));
    }

    #[test]
    fn deferred_ripple_emits_no_group_changes() {
        let mut model = model();
        apply_report(
            &mut model,
            &Report::GroupZoneAdded {
                group: g(1),
                zone: z(2),
            },
            GroupRipple::Deferred,
        );
        let changes = apply_report(
            &mut model,
            &Report::ZoneVolume {
                zone: z(2),
                level: -20,
            },
            GroupRipple::Deferred,
        );
        assert_eq!(
            changes,
            vec![StateChange::ZoneVolume {
                zone: z(2),
                level: -20
            }]
        );
    }

    #[test]
    fn derived_group_reports_do_not_touch_the_mirror() {
        let mut model = model();
        let changes = apply_report(
            &mut model,
            &Report::GroupVolume {
                group: g(1),
                level: -12,
            },
            GroupRipple::Immediate,
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn out_of_capacity_reports_are_skipped() {
        let mut model = model();
        // Zone 9 does not exist in a 4-zone mirror.
        let changes = apply_report(
            &mut model,
            &Report::ZoneVolume {
                zone: z(9),
                level: -10,
            },
            GroupRipple::Immediate,
        );
        assert!(changes.is_empty());
    }

    #[test]
    fn derive_group_changes_reports_mixed_source() {
        let mut model = model();
        model.groups.group_mut(g(1)).unwrap().add_zone(z(1));
        model.groups.group_mut(g(1)).unwrap().add_zone(z(2));
        model
            .zones
            .zone_mut(z(1))
            .unwrap()
            .set_source(SourceId::new(1).unwrap());
        model
            .zones
            .zone_mut(z(2))
            .unwrap()
            .set_source(SourceId::new(2).unwrap());

        let changes = derive_group_changes(&model, g(1));
        assert!(changes.contains(&StateChange::GroupSource {
            group: g(1),
            source: GroupSource::Mixed
        }));
    }
}
