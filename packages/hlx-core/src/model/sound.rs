//! Zone sound mode selection.
//!
//! Exactly one DSP path is active per zone at a time. Switching modes never
//! destroys the per-mode settings; the zone keeps its equalizer, tone, and
//! crossover state and simply routes around them.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Which DSP path a zone applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundMode {
    /// Flat: no processing.
    Disabled,
    /// The zone's own 10-band equalizer.
    ZoneEqualizer,
    /// A selected named preset equalizer.
    PresetEqualizer,
    /// Bass/treble tone controls.
    Tone,
    /// Lowpass crossover filter.
    Lowpass,
    /// Highpass crossover filter.
    Highpass,
}

impl SoundMode {
    /// Returns the wire encoding of the mode.
    #[must_use]
    pub fn to_wire(self) -> u8 {
        match self {
            Self::Disabled => 0,
            Self::ZoneEqualizer => 1,
            Self::PresetEqualizer => 2,
            Self::Tone => 3,
            Self::Lowpass => 4,
            Self::Highpass => 5,
        }
    }

    /// Decodes the wire encoding.
    pub fn from_wire(raw: u8) -> ModelResult<Self> {
        match raw {
            0 => Ok(Self::Disabled),
            1 => Ok(Self::ZoneEqualizer),
            2 => Ok(Self::PresetEqualizer),
            3 => Ok(Self::Tone),
            4 => Ok(Self::Lowpass),
            5 => Ok(Self::Highpass),
            other => Err(ModelError::OutOfRange(format!(
                "sound mode {other} outside [0, 5]"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_encoding_round_trips() {
        for raw in 0..=5 {
            let mode = SoundMode::from_wire(raw).unwrap();
            assert_eq!(mode.to_wire(), raw);
        }
    }

    #[test]
    fn out_of_range_mode_is_rejected() {
        assert!(SoundMode::from_wire(6).is_err());
    }
}
