//! Audio input sources.

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::model::ids::SourceId;
use crate::model::property::{Property, SetOutcome};
use crate::model::validate_name;

/// One addressable audio input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    identifier: SourceId,
    name: Property<String>,
}

impl Source {
    /// Creates an uninitialized source.
    #[must_use]
    pub fn new(identifier: SourceId) -> Self {
        Self {
            identifier,
            name: Property::new(),
        }
    }

    /// Returns the source identifier.
    #[must_use]
    pub fn identifier(&self) -> SourceId {
        self.identifier
    }

    /// Reads the source name.
    pub fn name(&self) -> ModelResult<String> {
        self.name.get("source name")
    }

    /// Sets the source name.
    pub fn set_name(&mut self, name: &str) -> ModelResult<SetOutcome> {
        validate_name(name)?;
        Ok(self.name.set(name.to_string()))
    }
}

/// The source collection, dense in `[1, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sources {
    sources: Vec<Source>,
}

impl Sources {
    /// Creates `max` uninitialized sources.
    #[must_use]
    pub fn new(max: u8) -> Self {
        Self {
            sources: SourceId::all(max).map(Source::new).collect(),
        }
    }

    /// Highest source identifier.
    #[must_use]
    pub fn max(&self) -> u8 {
        self.sources.len() as u8
    }

    /// Looks up a source.
    pub fn source(&self, id: SourceId) -> ModelResult<&Source> {
        id.check_max(self.max())?;
        Ok(&self.sources[usize::from(id.get()) - 1])
    }

    /// Looks up a source for mutation.
    pub fn source_mut(&mut self, id: SourceId) -> ModelResult<&mut Source> {
        id.check_max(self.max())?;
        Ok(&mut self.sources[usize::from(id.get()) - 1])
    }

    /// Iterates sources in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    /// Looks a source up by its name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Source> {
        self.sources
            .iter()
            .find(|s| s.name().ok().as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    #[test]
    fn name_round_trips_and_suppresses_repeats() {
        let mut sources = Sources::new(8);
        let source = sources.source_mut(SourceId::new(4).unwrap()).unwrap();
        assert_eq!(source.set_name("Turntable"), Ok(SetOutcome::Changed));
        assert_eq!(source.set_name("Turntable"), Ok(SetOutcome::AlreadySet));
        assert_eq!(source.name().unwrap(), "Turntable");
    }

    #[test]
    fn out_of_range_identifier_fails() {
        let sources = Sources::new(8);
        assert!(matches!(
            sources.source(SourceId::new(9).unwrap()),
            Err(ModelError::OutOfRange(_))
        ));
    }

    #[test]
    fn name_must_fit_sixteen_bytes() {
        let mut sources = Sources::new(8);
        let source = sources.source_mut(SourceId::new(1).unwrap()).unwrap();
        assert!(source.set_name("").is_err());
        assert!(source.set_name("01234567890123456").is_err());
        assert!(source.set_name("0123456789012345").is_ok());
    }
}
