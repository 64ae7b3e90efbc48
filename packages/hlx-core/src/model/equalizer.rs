//! Equalizer bands and presets.
//!
//! An equalizer is ten bands with fixed center frequencies and adjustable
//! levels in `[-10, +10]`. Zones own one equalizer each (zone-equalizer
//! sound mode); presets are named equalizers selectable by zones operating
//! in preset mode.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::ids::{BandId, PresetId};
use crate::model::property::{Property, SetOutcome};
use crate::model::validate_name;

/// Equalizer band boost/cut level.
pub type BandLevel = i8;

/// Minimum band level.
pub const BAND_MIN: BandLevel = -10;

/// Maximum band level.
pub const BAND_MAX: BandLevel = 10;

/// Flat (neither boost nor cut) band level.
pub const BAND_FLAT: BandLevel = 0;

/// Center frequencies of the ten hardware bands, in Hz.
pub const BAND_FREQUENCIES: [u16; 10] =
    [32, 64, 125, 250, 500, 1000, 2000, 4000, 8000, 16_000];

/// One equalizer band: a fixed center frequency and an adjustable level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Band {
    frequency: u16,
    level: Property<BandLevel>,
}

impl Band {
    /// Creates an uninitialized band centered at `frequency`.
    #[must_use]
    pub fn new(frequency: u16) -> Self {
        Self {
            frequency,
            level: Property::new(),
        }
    }

    /// Returns the center frequency. Never mutates post-init.
    #[must_use]
    pub fn frequency(&self) -> u16 {
        self.frequency
    }

    /// Reads the band level.
    pub fn level(&self) -> ModelResult<BandLevel> {
        self.level.get("equalizer band level")
    }

    /// Sets the band level.
    pub fn set_level(&mut self, level: BandLevel) -> ModelResult<SetOutcome> {
        if !(BAND_MIN..=BAND_MAX).contains(&level) {
            return Err(ModelError::OutOfRange(format!(
                "equalizer band level {level} outside [{BAND_MIN}, {BAND_MAX}]"
            )));
        }
        Ok(self.level.set(level))
    }

    /// Steps the level up one unit, saturating.
    pub fn increase_level(&mut self) -> ModelResult<SetOutcome> {
        let current = self.level()?;
        self.set_level(current.saturating_add(1).min(BAND_MAX))
    }

    /// Steps the level down one unit, saturating.
    pub fn decrease_level(&mut self) -> ModelResult<SetOutcome> {
        let current = self.level()?;
        self.set_level(current.saturating_sub(1).max(BAND_MIN))
    }
}

/// A full set of bands, indexed by 1-based [`BandId`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bands {
    bands: Vec<Band>,
}

impl Default for Bands {
    fn default() -> Self {
        Self::new()
    }
}

impl Bands {
    /// Creates the hardware band set at the standard center frequencies.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bands: BAND_FREQUENCIES.iter().map(|&f| Band::new(f)).collect(),
        }
    }

    /// Number of bands.
    #[must_use]
    pub fn len(&self) -> u8 {
        self.bands.len() as u8
    }

    /// True when the band set is empty (never the case post-init).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    /// Looks up a band.
    pub fn band(&self, id: BandId) -> ModelResult<&Band> {
        id.check_max(self.len())?;
        Ok(&self.bands[usize::from(id.get()) - 1])
    }

    /// Looks up a band for mutation.
    pub fn band_mut(&mut self, id: BandId) -> ModelResult<&mut Band> {
        id.check_max(self.len())?;
        Ok(&mut self.bands[usize::from(id.get()) - 1])
    }

    /// Iterates `(identifier, band)` pairs in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = (BandId, &Band)> {
        self.bands
            .iter()
            .enumerate()
            .map(|(i, band)| (BandId::new(i as u8 + 1).expect("band index is 1-based"), band))
    }

    /// Iterates `(identifier, band)` pairs mutably in identifier order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (BandId, &mut Band)> {
        self.bands
            .iter_mut()
            .enumerate()
            .map(|(i, band)| (BandId::new(i as u8 + 1).expect("band index is 1-based"), band))
    }
}

/// A named, selectable equalizer preset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    identifier: PresetId,
    name: Property<String>,
    bands: Bands,
}

impl Preset {
    /// Creates an uninitialized preset.
    #[must_use]
    pub fn new(identifier: PresetId) -> Self {
        Self {
            identifier,
            name: Property::new(),
            bands: Bands::new(),
        }
    }

    /// Returns the preset identifier.
    #[must_use]
    pub fn identifier(&self) -> PresetId {
        self.identifier
    }

    /// Reads the preset name.
    pub fn name(&self) -> ModelResult<String> {
        self.name.get("equalizer preset name")
    }

    /// Sets the preset name.
    pub fn set_name(&mut self, name: &str) -> ModelResult<SetOutcome> {
        validate_name(name)?;
        Ok(self.name.set(name.to_string()))
    }

    /// Returns the preset's bands.
    #[must_use]
    pub fn bands(&self) -> &Bands {
        &self.bands
    }

    /// Returns the preset's bands for mutation.
    pub fn bands_mut(&mut self) -> &mut Bands {
        &mut self.bands
    }
}

/// The preset collection, dense in `[1, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presets {
    presets: Vec<Preset>,
}

impl Presets {
    /// Creates `max` uninitialized presets.
    #[must_use]
    pub fn new(max: u8) -> Self {
        Self {
            presets: PresetId::all(max).map(Preset::new).collect(),
        }
    }

    /// Highest preset identifier.
    #[must_use]
    pub fn max(&self) -> u8 {
        self.presets.len() as u8
    }

    /// Looks up a preset.
    pub fn preset(&self, id: PresetId) -> ModelResult<&Preset> {
        id.check_max(self.max())?;
        Ok(&self.presets[usize::from(id.get()) - 1])
    }

    /// Looks up a preset for mutation.
    pub fn preset_mut(&mut self, id: PresetId) -> ModelResult<&mut Preset> {
        id.check_max(self.max())?;
        Ok(&mut self.presets[usize::from(id.get()) - 1])
    }

    /// Iterates presets in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Preset> {
        self.presets.iter()
    }

    /// Looks a preset up by its name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Preset> {
        self.presets
            .iter()
            .find(|p| p.name().ok().as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_carry_fixed_frequencies() {
        let bands = Bands::new();
        assert_eq!(bands.len(), 10);
        assert_eq!(bands.band(BandId::new(1).unwrap()).unwrap().frequency(), 32);
        assert_eq!(
            bands.band(BandId::new(10).unwrap()).unwrap().frequency(),
            16_000
        );
    }

    #[test]
    fn band_identifiers_run_one_through_ten() {
        let bands = Bands::new();
        let ids: Vec<u8> = bands.iter().map(|(id, _)| id.get()).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u8>>());
        assert!(bands.band(BandId::new(11).unwrap()).is_err());
    }

    #[test]
    fn band_level_clamps_on_adjust() {
        let mut bands = Bands::new();
        let band = bands.band_mut(BandId::new(3).unwrap()).unwrap();
        band.set_level(BAND_MAX).unwrap();
        assert_eq!(band.increase_level(), Ok(SetOutcome::AlreadySet));
        assert_eq!(band.level(), Ok(BAND_MAX));
    }

    #[test]
    fn band_level_out_of_range_fails() {
        let mut band = Band::new(1000);
        assert!(band.set_level(11).is_err());
        assert!(band.set_level(-11).is_err());
    }

    #[test]
    fn preset_name_round_trips() {
        let mut preset = Preset::new(PresetId::new(2).unwrap());
        assert_eq!(preset.set_name("Classical"), Ok(SetOutcome::Changed));
        assert_eq!(preset.set_name("Classical"), Ok(SetOutcome::AlreadySet));
        assert_eq!(preset.name().unwrap(), "Classical");
    }

    #[test]
    fn presets_collection_is_dense() {
        let presets = Presets::new(10);
        assert_eq!(presets.max(), 10);
        assert!(presets.preset(PresetId::new(10).unwrap()).is_ok());
        assert!(presets.preset(PresetId::new(11).unwrap()).is_err());
    }
}
