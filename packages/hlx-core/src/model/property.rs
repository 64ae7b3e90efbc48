//! Nullable property cells with change-detecting writes.
//!
//! Every scalar property in the data model distinguishes "never heard from
//! the device" from "happens to equal the default". Reads of an
//! uninitialized cell fail with [`ModelError::NotInitialized`]; the first
//! successful write initializes the cell; writing a value equal to the
//! current one reports [`SetOutcome::AlreadySet`], which callers use to
//! suppress notifications.

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};

/// Outcome of a mutating model operation.
///
/// `AlreadySet` is a non-error sentinel: the operation succeeded, nothing
/// changed, and no notification should be emitted for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// The stored value changed (or the cell was initialized).
    Changed,
    /// The requested value was already stored.
    AlreadySet,
}

impl SetOutcome {
    /// Returns true if the operation changed the stored value.
    #[must_use]
    pub fn changed(self) -> bool {
        matches!(self, Self::Changed)
    }

    /// Folds two outcomes: the combination changed if either part did.
    #[must_use]
    pub fn combine(self, other: Self) -> Self {
        if self.changed() || other.changed() {
            Self::Changed
        } else {
            Self::AlreadySet
        }
    }
}

/// A scalar property with an initialized/uninitialized bit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Property<T> {
    value: Option<T>,
}

impl<T> Default for Property<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

impl<T: Clone + PartialEq> Property<T> {
    /// Creates an uninitialized property.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a property already holding `value`.
    #[must_use]
    pub fn with_value(value: T) -> Self {
        Self { value: Some(value) }
    }

    /// Returns true once a value has been stored.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.value.is_some()
    }

    /// Reads the stored value.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::NotInitialized`] if nothing was ever stored.
    /// The `what` label names the property in the error.
    pub fn get(&self, what: &'static str) -> ModelResult<T> {
        self.value
            .clone()
            .ok_or(ModelError::NotInitialized(what))
    }

    /// Reads the stored value without the error path.
    #[must_use]
    pub fn peek(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Stores a value, reporting whether anything changed.
    pub fn set(&mut self, value: T) -> SetOutcome {
        if self.value.as_ref() == Some(&value) {
            SetOutcome::AlreadySet
        } else {
            self.value = Some(value);
            SetOutcome::Changed
        }
    }

    /// Returns the property to the uninitialized state.
    pub fn clear(&mut self) {
        self.value = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_before_write_fails() {
        let cell: Property<i8> = Property::new();
        assert_eq!(cell.get("level"), Err(ModelError::NotInitialized("level")));
        assert!(!cell.is_initialized());
    }

    #[test]
    fn first_write_initializes() {
        let mut cell = Property::new();
        assert_eq!(cell.set(0i8), SetOutcome::Changed);
        assert!(cell.is_initialized());
        assert_eq!(cell.get("level"), Ok(0));
    }

    #[test]
    fn zero_is_distinguishable_from_uninitialized() {
        // The whole point of the cell: a stored zero reads back fine.
        let mut cell = Property::new();
        cell.set(0i8);
        assert_eq!(cell.get("bias"), Ok(0));
    }

    #[test]
    fn rewriting_same_value_reports_already_set() {
        let mut cell = Property::new();
        cell.set(-25i8);
        assert_eq!(cell.set(-25), SetOutcome::AlreadySet);
        assert_eq!(cell.set(-24), SetOutcome::Changed);
    }

    #[test]
    fn clear_returns_to_uninitialized() {
        let mut cell = Property::new();
        cell.set(true);
        cell.clear();
        assert!(!cell.is_initialized());
    }

    #[test]
    fn combine_folds_outcomes() {
        assert!(SetOutcome::Changed
            .combine(SetOutcome::AlreadySet)
            .changed());
        assert!(!SetOutcome::AlreadySet
            .combine(SetOutcome::AlreadySet)
            .changed());
    }
}
