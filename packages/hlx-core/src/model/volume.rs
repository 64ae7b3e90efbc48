//! Volume state embedded in zones.
//!
//! Carries the attenuation level, the mute flag, and the fixed/locked flag.
//! Levels are hardware attenuation steps: `-80` is silence, `0` is unity
//! gain.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// Volume attenuation level, in hardware steps.
pub type Level = i8;

/// Minimum (quietest) volume level.
pub const LEVEL_MIN: Level = -80;

/// Maximum (loudest) volume level.
pub const LEVEL_MAX: Level = 0;

/// Volume level, mute, and fixed/locked state for one output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Volume {
    level: Property<Level>,
    mute: Property<bool>,
    fixed: Property<bool>,
}

impl Volume {
    /// Creates a fully uninitialized volume state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the attenuation level.
    pub fn level(&self) -> ModelResult<Level> {
        self.level.get("volume level")
    }

    /// Sets the attenuation level.
    ///
    /// The fixed flag does not gate this: the model stores whatever the
    /// controller reports. Command handlers enforce [`ModelError::VolumeLocked`]
    /// before a caller-initiated write reaches the model (see
    /// [`Volume::check_unlocked`]).
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::OutOfRange`] outside `[-80, 0]`.
    pub fn set_level(&mut self, level: Level) -> ModelResult<SetOutcome> {
        if !(LEVEL_MIN..=LEVEL_MAX).contains(&level) {
            return Err(ModelError::OutOfRange(format!(
                "volume level {level} outside [{LEVEL_MIN}, {LEVEL_MAX}]"
            )));
        }
        Ok(self.level.set(level))
    }

    /// Fails with [`ModelError::VolumeLocked`] when the level may not be
    /// changed by a command.
    pub fn check_unlocked(&self) -> ModelResult<()> {
        if self.is_locked() {
            Err(ModelError::VolumeLocked)
        } else {
            Ok(())
        }
    }

    /// Steps the level up by one, saturating at the maximum.
    ///
    /// Requires an initialized level; stepping is relative by definition.
    pub fn increase_level(&mut self) -> ModelResult<SetOutcome> {
        let current = self.level()?;
        self.set_level(current.saturating_add(1).min(LEVEL_MAX))
    }

    /// Steps the level down by one, saturating at the minimum.
    pub fn decrease_level(&mut self) -> ModelResult<SetOutcome> {
        let current = self.level()?;
        self.set_level(current.saturating_sub(1).max(LEVEL_MIN))
    }

    /// Reads the mute flag.
    pub fn mute(&self) -> ModelResult<bool> {
        self.mute.get("volume mute")
    }

    /// Sets the mute flag. Muting is never blocked by the fixed flag; the
    /// hardware locks the level only.
    pub fn set_mute(&mut self, mute: bool) -> SetOutcome {
        self.mute.set(mute)
    }

    /// Flips the mute flag and returns the new value.
    ///
    /// An uninitialized mute flag toggles to `true`, matching the hardware
    /// (an unknown state is treated as unmuted).
    pub fn toggle_mute(&mut self) -> bool {
        let next = !self.mute.peek().copied().unwrap_or(false);
        self.mute.set(next);
        next
    }

    /// Reads the fixed/locked flag.
    pub fn fixed(&self) -> ModelResult<bool> {
        self.fixed.get("volume fixed")
    }

    /// Sets the fixed/locked flag.
    pub fn set_fixed(&mut self, fixed: bool) -> SetOutcome {
        self.fixed.set(fixed)
    }

    /// Returns true when the level may not be changed.
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.fixed.peek() == Some(&true)
    }
}
