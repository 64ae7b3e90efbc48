//! Zones: the addressable audio output channels.
//!
//! A zone owns its name, selected source, volume, balance, tone, its own
//! 10-band equalizer, a selected preset equalizer, the active sound mode,
//! and the highpass/lowpass crossover filters. Mode-specific settings are
//! kept when the mode switches away.

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::model::balance::Balance;
use crate::model::crossover::Crossover;
use crate::model::equalizer::Bands;
use crate::model::ids::{PresetId, SourceId, ZoneId};
use crate::model::property::{Property, SetOutcome};
use crate::model::sound::SoundMode;
use crate::model::tone::Tone;
use crate::model::validate_name;
use crate::model::volume::Volume;

/// One addressable audio output channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zone {
    identifier: ZoneId,
    name: Property<String>,
    source: Property<SourceId>,
    volume: Volume,
    balance: Balance,
    tone: Tone,
    equalizer: Bands,
    equalizer_preset: Property<PresetId>,
    sound_mode: Property<SoundMode>,
    highpass: Crossover,
    lowpass: Crossover,
}

impl Zone {
    /// Creates an uninitialized zone.
    #[must_use]
    pub fn new(identifier: ZoneId) -> Self {
        Self {
            identifier,
            name: Property::new(),
            source: Property::new(),
            volume: Volume::new(),
            balance: Balance::new(),
            tone: Tone::new(),
            equalizer: Bands::new(),
            equalizer_preset: Property::new(),
            sound_mode: Property::new(),
            highpass: Crossover::default(),
            lowpass: Crossover::default(),
        }
    }

    /// Returns the zone identifier.
    #[must_use]
    pub fn identifier(&self) -> ZoneId {
        self.identifier
    }

    /// Reads the zone name.
    pub fn name(&self) -> ModelResult<String> {
        self.name.get("zone name")
    }

    /// Sets the zone name.
    pub fn set_name(&mut self, name: &str) -> ModelResult<SetOutcome> {
        validate_name(name)?;
        Ok(self.name.set(name.to_string()))
    }

    /// Reads the selected source.
    pub fn source(&self) -> ModelResult<SourceId> {
        self.source.get("zone source")
    }

    /// Returns the selected source without the error path.
    #[must_use]
    pub fn source_opt(&self) -> Option<SourceId> {
        self.source.peek().copied()
    }

    /// Selects a source. The identifier is validated against the source
    /// class maximum by the owning controller.
    pub fn set_source(&mut self, source: SourceId) -> SetOutcome {
        self.source.set(source)
    }

    /// Returns the volume state.
    #[must_use]
    pub fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Returns the volume state for mutation.
    pub fn volume_mut(&mut self) -> &mut Volume {
        &mut self.volume
    }

    /// Returns the balance state.
    #[must_use]
    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Returns the balance state for mutation.
    pub fn balance_mut(&mut self) -> &mut Balance {
        &mut self.balance
    }

    /// Returns the tone state.
    #[must_use]
    pub fn tone(&self) -> &Tone {
        &self.tone
    }

    /// Returns the tone state for mutation.
    pub fn tone_mut(&mut self) -> &mut Tone {
        &mut self.tone
    }

    /// Returns the zone's own equalizer bands.
    #[must_use]
    pub fn equalizer(&self) -> &Bands {
        &self.equalizer
    }

    /// Returns the zone's own equalizer bands for mutation.
    pub fn equalizer_mut(&mut self) -> &mut Bands {
        &mut self.equalizer
    }

    /// Reads the selected preset equalizer.
    pub fn equalizer_preset(&self) -> ModelResult<PresetId> {
        self.equalizer_preset.get("zone equalizer preset")
    }

    /// Selects a preset equalizer.
    pub fn set_equalizer_preset(&mut self, preset: PresetId) -> SetOutcome {
        self.equalizer_preset.set(preset)
    }

    /// Reads the active sound mode.
    pub fn sound_mode(&self) -> ModelResult<SoundMode> {
        self.sound_mode.get("zone sound mode")
    }

    /// Selects the active sound mode. Per-mode settings survive the switch.
    pub fn set_sound_mode(&mut self, mode: SoundMode) -> SetOutcome {
        self.sound_mode.set(mode)
    }

    /// Returns the highpass crossover.
    #[must_use]
    pub fn highpass(&self) -> &Crossover {
        &self.highpass
    }

    /// Returns the highpass crossover for mutation.
    pub fn highpass_mut(&mut self) -> &mut Crossover {
        &mut self.highpass
    }

    /// Returns the lowpass crossover.
    #[must_use]
    pub fn lowpass(&self) -> &Crossover {
        &self.lowpass
    }

    /// Returns the lowpass crossover for mutation.
    pub fn lowpass_mut(&mut self) -> &mut Crossover {
        &mut self.lowpass
    }
}

/// The zone collection, dense in `[1, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Zones {
    zones: Vec<Zone>,
}

impl Zones {
    /// Creates `max` uninitialized zones.
    #[must_use]
    pub fn new(max: u8) -> Self {
        Self {
            zones: ZoneId::all(max).map(Zone::new).collect(),
        }
    }

    /// Highest zone identifier.
    #[must_use]
    pub fn max(&self) -> u8 {
        self.zones.len() as u8
    }

    /// Looks up a zone.
    pub fn zone(&self, id: ZoneId) -> ModelResult<&Zone> {
        id.check_max(self.max())?;
        Ok(&self.zones[usize::from(id.get()) - 1])
    }

    /// Looks up a zone for mutation.
    pub fn zone_mut(&mut self, id: ZoneId) -> ModelResult<&mut Zone> {
        id.check_max(self.max())?;
        Ok(&mut self.zones[usize::from(id.get()) - 1])
    }

    /// Iterates zones in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Zone> {
        self.zones.iter()
    }

    /// Iterates zones mutably in identifier order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Zone> {
        self.zones.iter_mut()
    }

    /// Looks a zone up by its name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Zone> {
        self.zones
            .iter()
            .find(|z| z.name().ok().as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zone() -> Zone {
        Zone::new(ZoneId::new(3).unwrap())
    }

    #[test]
    fn new_zone_has_only_its_identifier() {
        let zone = zone();
        assert_eq!(zone.identifier().get(), 3);
        assert!(zone.name().is_err());
        assert!(zone.source().is_err());
        assert!(zone.volume().level().is_err());
        assert!(zone.sound_mode().is_err());
    }

    #[test]
    fn switching_sound_mode_keeps_settings() {
        let mut zone = zone();
        zone.tone_mut().set(4, -3).unwrap();
        zone.set_sound_mode(SoundMode::Tone);
        zone.set_sound_mode(SoundMode::Lowpass);
        // Tone state survived the mode switch.
        assert_eq!(zone.tone().levels(), Ok((4, -3)));
        assert_eq!(zone.sound_mode(), Ok(SoundMode::Lowpass));
    }

    #[test]
    fn collection_is_dense_and_bounded() {
        let zones = Zones::new(24);
        assert_eq!(zones.max(), 24);
        assert!(zones.zone(ZoneId::new(24).unwrap()).is_ok());
        assert!(zones.zone(ZoneId::new(25).unwrap()).is_err());
    }

    #[test]
    fn source_selection_round_trips() {
        let mut zones = Zones::new(8);
        let zone = zones.zone_mut(ZoneId::new(2).unwrap()).unwrap();
        assert_eq!(
            zone.set_source(SourceId::new(5).unwrap()),
            SetOutcome::Changed
        );
        assert_eq!(
            zone.set_source(SourceId::new(5).unwrap()),
            SetOutcome::AlreadySet
        );
        assert_eq!(zone.source().unwrap().get(), 5);
    }
}
