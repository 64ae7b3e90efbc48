//! Bass/treble tone state embedded in zones.
//!
//! Both knobs range over `[-10, +10]` and are always written atomically by
//! the tone wire command; the adjust operations re-emit the full pair.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// Tone control level (bass or treble).
pub type ToneLevel = i8;

/// Minimum tone level.
pub const TONE_MIN: ToneLevel = -10;

/// Maximum tone level.
pub const TONE_MAX: ToneLevel = 10;

/// Bass and treble for one output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tone {
    bass: Property<ToneLevel>,
    treble: Property<ToneLevel>,
}

fn check_range(what: &str, level: ToneLevel) -> ModelResult<()> {
    if (TONE_MIN..=TONE_MAX).contains(&level) {
        Ok(())
    } else {
        Err(ModelError::OutOfRange(format!(
            "{what} level {level} outside [{TONE_MIN}, {TONE_MAX}]"
        )))
    }
}

impl Tone {
    /// Creates an uninitialized tone state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the bass level.
    pub fn bass(&self) -> ModelResult<ToneLevel> {
        self.bass.get("tone bass")
    }

    /// Reads the treble level.
    pub fn treble(&self) -> ModelResult<ToneLevel> {
        self.treble.get("tone treble")
    }

    /// Reads both levels as `(bass, treble)`.
    pub fn levels(&self) -> ModelResult<(ToneLevel, ToneLevel)> {
        Ok((self.bass()?, self.treble()?))
    }

    /// Sets both levels atomically.
    ///
    /// Range checks run before either knob moves, so a half-valid pair
    /// leaves the state untouched.
    pub fn set(&mut self, bass: ToneLevel, treble: ToneLevel) -> ModelResult<SetOutcome> {
        check_range("bass", bass)?;
        check_range("treble", treble)?;
        Ok(self.bass.set(bass).combine(self.treble.set(treble)))
    }

    /// Steps bass up one unit, saturating.
    pub fn increase_bass(&mut self) -> ModelResult<SetOutcome> {
        let (bass, treble) = self.levels()?;
        self.set(bass.saturating_add(1).min(TONE_MAX), treble)
    }

    /// Steps bass down one unit, saturating.
    pub fn decrease_bass(&mut self) -> ModelResult<SetOutcome> {
        let (bass, treble) = self.levels()?;
        self.set(bass.saturating_sub(1).max(TONE_MIN), treble)
    }

    /// Steps treble up one unit, saturating.
    pub fn increase_treble(&mut self) -> ModelResult<SetOutcome> {
        let (bass, treble) = self.levels()?;
        self.set(bass, treble.saturating_add(1).min(TONE_MAX))
    }

    /// Steps treble down one unit, saturating.
    pub fn decrease_treble(&mut self) -> ModelResult<SetOutcome> {
        let (bass, treble) = self.levels()?;
        self.set(bass, treble.saturating_sub(1).max(TONE_MIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_is_atomic_on_range_error() {
        let mut tone = Tone::new();
        tone.set(3, -2).unwrap();
        assert!(tone.set(5, 11).is_err());
        assert_eq!(tone.levels(), Ok((3, -2)));
    }

    #[test]
    fn partial_change_still_reports_changed() {
        let mut tone = Tone::new();
        tone.set(0, 0).unwrap();
        assert_eq!(tone.set(0, 1), Ok(SetOutcome::Changed));
        assert_eq!(tone.set(0, 1), Ok(SetOutcome::AlreadySet));
    }

    #[test]
    fn adjust_saturates() {
        let mut tone = Tone::new();
        tone.set(TONE_MAX, TONE_MIN).unwrap();
        assert_eq!(tone.increase_bass(), Ok(SetOutcome::AlreadySet));
        assert_eq!(tone.decrease_treble(), Ok(SetOutcome::AlreadySet));
        assert_eq!(tone.levels(), Ok((TONE_MAX, TONE_MIN)));
    }
}
