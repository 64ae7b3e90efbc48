//! Crossover filter state embedded in zones.
//!
//! A zone carries one highpass and one lowpass filter; each filter owns a
//! corner frequency constrained to a per-filter range carried in the model.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// Crossover corner frequency, in Hz.
pub type Frequency = u16;

/// Inclusive frequency limits for one filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyLimits {
    /// Lowest accepted corner frequency.
    pub min: Frequency,
    /// Highest accepted corner frequency.
    pub max: Frequency,
}

/// Default limits for both filter flavors.
pub const DEFAULT_LIMITS: FrequencyLimits = FrequencyLimits { min: 1, max: 20_000 };

/// One crossover filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crossover {
    limits: FrequencyLimits,
    frequency: Property<Frequency>,
}

impl Default for Crossover {
    fn default() -> Self {
        Self::new(DEFAULT_LIMITS)
    }
}

impl Crossover {
    /// Creates an uninitialized filter with the given limits.
    #[must_use]
    pub fn new(limits: FrequencyLimits) -> Self {
        Self {
            limits,
            frequency: Property::new(),
        }
    }

    /// Returns the filter's frequency limits.
    #[must_use]
    pub fn limits(&self) -> FrequencyLimits {
        self.limits
    }

    /// Reads the corner frequency.
    pub fn frequency(&self) -> ModelResult<Frequency> {
        self.frequency.get("crossover frequency")
    }

    /// Sets the corner frequency.
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::OutOfRange`] outside the filter's limits.
    pub fn set_frequency(&mut self, frequency: Frequency) -> ModelResult<SetOutcome> {
        if frequency < self.limits.min || frequency > self.limits.max {
            return Err(ModelError::OutOfRange(format!(
                "crossover frequency {frequency} outside [{}, {}]",
                self.limits.min, self.limits.max
            )));
        }
        Ok(self.frequency.set(frequency))
    }
}
