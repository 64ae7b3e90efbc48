//! Front panel display state.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// Display brightness step.
pub type Brightness = u8;

/// Dimmest brightness step.
pub const BRIGHTNESS_MIN: Brightness = 0;

/// Brightest brightness step.
pub const BRIGHTNESS_MAX: Brightness = 3;

/// The controller's front panel: display brightness and key lock.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontPanel {
    brightness: Property<Brightness>,
    locked: Property<bool>,
}

impl FrontPanel {
    /// Creates an uninitialized front panel.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the brightness step.
    pub fn brightness(&self) -> ModelResult<Brightness> {
        self.brightness.get("front panel brightness")
    }

    /// Sets the brightness step.
    pub fn set_brightness(&mut self, brightness: Brightness) -> ModelResult<SetOutcome> {
        if brightness > BRIGHTNESS_MAX {
            return Err(ModelError::OutOfRange(format!(
                "front panel brightness {brightness} outside [{BRIGHTNESS_MIN}, {BRIGHTNESS_MAX}]"
            )));
        }
        Ok(self.brightness.set(brightness))
    }

    /// Reads the key-lock flag.
    pub fn locked(&self) -> ModelResult<bool> {
        self.locked.get("front panel locked")
    }

    /// Sets the key-lock flag.
    pub fn set_locked(&mut self, locked: bool) -> SetOutcome {
        self.locked.set(locked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brightness_is_bounded() {
        let mut panel = FrontPanel::new();
        assert_eq!(panel.set_brightness(3), Ok(SetOutcome::Changed));
        assert!(panel.set_brightness(4).is_err());
        assert_eq!(panel.brightness(), Ok(3));
    }

    #[test]
    fn locked_round_trips() {
        let mut panel = FrontPanel::new();
        assert!(panel.locked().is_err());
        assert_eq!(panel.set_locked(true), SetOutcome::Changed);
        assert_eq!(panel.set_locked(true), SetOutcome::AlreadySet);
        assert_eq!(panel.locked(), Ok(true));
    }
}
