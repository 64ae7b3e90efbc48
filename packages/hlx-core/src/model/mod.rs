//! The in-memory data model of one HLX controller.
//!
//! Entities are created once at controller init with their identifier set
//! and every other property uninitialized. They are mutated by parsed
//! responses (client/proxy), by request handlers (server/proxy), or by
//! configuration load, and destroyed only with the owning controller.
//!
//! The top-level collections are owned exclusively by [`DeviceModel`];
//! sub-controllers address entities by identifier, never by reference.

pub mod balance;
pub mod crossover;
pub mod equalizer;
pub mod favorite;
pub mod front_panel;
pub mod group;
pub mod ids;
pub mod network;
pub mod property;
pub mod sound;
pub mod source;
pub mod tone;
pub mod volume;
pub mod zone;

use serde::{Deserialize, Serialize};

use crate::config::Capacity;
use crate::error::{ModelError, ModelResult};

pub use balance::Balance;
pub use crossover::{Crossover, Frequency, FrequencyLimits};
pub use equalizer::{Band, BandLevel, Bands, Preset, Presets};
pub use favorite::{Favorite, Favorites};
pub use front_panel::{Brightness, FrontPanel};
pub use group::{DerivedState, Group, GroupSource, Groups};
pub use ids::{BandId, FavoriteId, GroupId, PresetId, SourceId, ZoneId};
pub use network::{Eui48, Network};
pub use property::{Property, SetOutcome};
pub use sound::SoundMode;
pub use source::{Source, Sources};
pub use tone::{Tone, ToneLevel};
pub use volume::{Level, Volume};
pub use zone::{Zone, Zones};

/// Longest accepted entity name, in UTF-8 bytes.
pub const NAME_MAX_BYTES: usize = 16;

/// Validates an entity name: non-empty, at most 16 bytes of UTF-8.
pub fn validate_name(name: &str) -> ModelResult<()> {
    if name.is_empty() {
        return Err(ModelError::InvalidArgument(
            "name must not be empty".to_string(),
        ));
    }
    if name.len() > NAME_MAX_BYTES {
        return Err(ModelError::InvalidArgument(format!(
            "name {name:?} exceeds {NAME_MAX_BYTES} bytes"
        )));
    }
    Ok(())
}

/// The complete state of one controller.
///
/// Exactly one application controller owns an instance; everything else
/// reaches the collections through it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceModel {
    /// The audio inputs.
    pub sources: Sources,
    /// The audio output channels.
    pub zones: Zones,
    /// The logical zone aggregations.
    pub groups: Groups,
    /// The named equalizer presets.
    pub equalizer_presets: Presets,
    /// The named favorites.
    pub favorites: Favorites,
    /// The front panel.
    pub front_panel: FrontPanel,
    /// The Ethernet interface.
    pub network: Network,
}

impl DeviceModel {
    /// Creates a model with every entity present and uninitialized.
    #[must_use]
    pub fn new(capacity: &Capacity) -> Self {
        Self {
            sources: Sources::new(capacity.sources),
            zones: Zones::new(capacity.zones),
            groups: Groups::new(capacity.groups),
            equalizer_presets: Presets::new(capacity.equalizer_presets),
            favorites: Favorites::new(capacity.favorites),
            front_panel: FrontPanel::new(),
            network: Network::new(),
        }
    }

    /// Returns the capacity limits this model was built with.
    #[must_use]
    pub fn capacity(&self) -> Capacity {
        Capacity {
            zones: self.zones.max(),
            sources: self.sources.max(),
            groups: self.groups.max(),
            favorites: self.favorites.max(),
            equalizer_presets: self.equalizer_presets.max(),
            equalizer_bands: equalizer::BAND_FREQUENCIES.len() as u8,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_enforces_byte_limit() {
        assert!(validate_name("Kitchen").is_ok());
        assert!(validate_name("").is_err());
        // 16 characters of ASCII fit; a multibyte run of the same character
        // count does not.
        assert!(validate_name("0123456789abcdef").is_ok());
        assert!(validate_name("ééééééééé").is_err());
    }

    #[test]
    fn model_is_fully_populated_at_init() {
        let model = DeviceModel::new(&Capacity::default());
        assert_eq!(model.zones.max(), 24);
        assert_eq!(model.sources.max(), 8);
        assert_eq!(model.groups.max(), 10);
        assert_eq!(model.favorites.max(), 10);
        assert_eq!(model.equalizer_presets.max(), 10);
    }

    #[test]
    fn capacity_round_trips() {
        let capacity = Capacity {
            zones: 4,
            sources: 2,
            groups: 3,
            favorites: 1,
            equalizer_presets: 2,
            equalizer_bands: 10,
        };
        let model = DeviceModel::new(&capacity);
        assert_eq!(model.capacity(), capacity);
    }
}
