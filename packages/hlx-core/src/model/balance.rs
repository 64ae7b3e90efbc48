//! Stereo balance state embedded in zones.
//!
//! The in-memory representation is a single continuous bias in
//! `[-80, +80]`: negative values bias left, positive right, `0` is center.
//! The wire protocol instead uses a tagged, discontinuous `L<n>`/`R<n>`
//! form; the codec converts at the boundary (see
//! [`crate::protocol::parse`]).

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::property::{Property, SetOutcome};

/// Continuous balance bias.
pub type Bias = i8;

/// Fully-left bias.
pub const BIAS_MIN: Bias = -80;

/// Fully-right bias.
pub const BIAS_MAX: Bias = 80;

/// Centered bias.
pub const BIAS_CENTER: Bias = 0;

/// Stereo balance for one output.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    bias: Property<Bias>,
}

impl Balance {
    /// Creates an uninitialized balance.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the bias.
    pub fn bias(&self) -> ModelResult<Bias> {
        self.bias.get("balance bias")
    }

    /// Sets the bias.
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::OutOfRange`] outside `[-80, +80]`.
    pub fn set_bias(&mut self, bias: Bias) -> ModelResult<SetOutcome> {
        if !(BIAS_MIN..=BIAS_MAX).contains(&bias) {
            return Err(ModelError::OutOfRange(format!(
                "balance bias {bias} outside [{BIAS_MIN}, {BIAS_MAX}]"
            )));
        }
        Ok(self.bias.set(bias))
    }

    /// Steps the bias one unit toward the left channel, saturating.
    pub fn adjust_left(&mut self) -> ModelResult<SetOutcome> {
        let current = self.bias()?;
        self.set_bias(current.saturating_sub(1).max(BIAS_MIN))
    }

    /// Steps the bias one unit toward the right channel, saturating.
    pub fn adjust_right(&mut self) -> ModelResult<SetOutcome> {
        let current = self.bias()?;
        self.set_bias(current.saturating_add(1).min(BIAS_MAX))
    }

    /// Recenters the balance.
    pub fn center(&mut self) -> SetOutcome {
        self.bias.set(BIAS_CENTER)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bias_round_trips() {
        let mut balance = Balance::new();
        assert_eq!(balance.set_bias(-37), Ok(SetOutcome::Changed));
        assert_eq!(balance.bias(), Ok(-37));
    }

    #[test]
    fn bias_out_of_range_fails() {
        let mut balance = Balance::new();
        assert!(balance.set_bias(81).is_err());
        assert!(balance.set_bias(-81).is_err());
    }

    #[test]
    fn adjust_saturates_at_extremes() {
        let mut balance = Balance::new();
        balance.set_bias(BIAS_MIN).unwrap();
        assert_eq!(balance.adjust_left(), Ok(SetOutcome::AlreadySet));

        balance.set_bias(BIAS_MAX).unwrap();
        assert_eq!(balance.adjust_right(), Ok(SetOutcome::AlreadySet));
    }

    #[test]
    fn center_is_zero() {
        let mut balance = Balance::new();
        balance.set_bias(40).unwrap();
        assert_eq!(balance.center(), SetOutcome::Changed);
        assert_eq!(balance.bias(), Ok(0));
    }
}
