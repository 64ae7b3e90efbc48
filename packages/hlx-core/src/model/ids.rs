//! Bounded entity identifiers.
//!
//! Every first-class entity is addressed by a 1-based `u8` identifier;
//! `0` is the reserved invalid/null sentinel and is rejected at
//! construction. Upper bounds are per entity class and per installation
//! ([`crate::config::Capacity`]), so they are checked by the owning
//! collection rather than here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

macro_rules! identifier {
    ($(#[$doc:meta])* $name:ident, $label:literal) => {
        $(#[$doc])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(u8);

        impl $name {
            /// Creates an identifier, rejecting the `0` null sentinel.
            pub fn new(raw: u8) -> ModelResult<Self> {
                if raw == 0 {
                    Err(ModelError::InvalidArgument(format!(
                        "{} identifier must be 1-based, got 0",
                        $label
                    )))
                } else {
                    Ok(Self(raw))
                }
            }

            /// Returns the raw 1-based identifier.
            #[must_use]
            pub fn get(self) -> u8 {
                self.0
            }

            /// Validates this identifier against a class maximum.
            pub fn check_max(self, max: u8) -> ModelResult<Self> {
                if self.0 > max {
                    Err(ModelError::OutOfRange(format!(
                        "{} identifier {} exceeds maximum {}",
                        $label, self.0, max
                    )))
                } else {
                    Ok(self)
                }
            }

            /// Iterates every identifier in `[1, max]`.
            pub fn all(max: u8) -> impl Iterator<Item = Self> {
                (1..=max).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

identifier!(
    /// Identifier of one addressable audio output channel.
    ZoneId,
    "zone"
);
identifier!(
    /// Identifier of one addressable audio input.
    SourceId,
    "source"
);
identifier!(
    /// Identifier of a logical aggregation of zones.
    GroupId,
    "group"
);
identifier!(
    /// Identifier of a named favorite.
    FavoriteId,
    "favorite"
);
identifier!(
    /// Identifier of a named 10-band equalizer preset.
    PresetId,
    "equalizer preset"
);
identifier!(
    /// Identifier of one equalizer band within an equalizer.
    BandId,
    "equalizer band"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_is_rejected() {
        assert!(ZoneId::new(0).is_err());
        assert!(GroupId::new(0).is_err());
    }

    #[test]
    fn check_max_enforces_class_bound() {
        let id = SourceId::new(9).unwrap();
        assert!(id.check_max(8).is_err());
        assert!(id.check_max(9).is_ok());
    }

    #[test]
    fn all_yields_dense_range() {
        let ids: Vec<u8> = BandId::all(10).map(BandId::get).collect();
        assert_eq!(ids, (1..=10).collect::<Vec<u8>>());
    }

    #[test]
    fn display_is_plain_decimal() {
        assert_eq!(ZoneId::new(24).unwrap().to_string(), "24");
    }
}
