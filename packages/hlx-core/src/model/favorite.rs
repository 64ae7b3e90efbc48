//! Named favorites.

use serde::{Deserialize, Serialize};

use crate::error::ModelResult;
use crate::model::ids::FavoriteId;
use crate::model::property::{Property, SetOutcome};
use crate::model::validate_name;

/// One named favorite slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    identifier: FavoriteId,
    name: Property<String>,
}

impl Favorite {
    /// Creates an uninitialized favorite.
    #[must_use]
    pub fn new(identifier: FavoriteId) -> Self {
        Self {
            identifier,
            name: Property::new(),
        }
    }

    /// Returns the favorite identifier.
    #[must_use]
    pub fn identifier(&self) -> FavoriteId {
        self.identifier
    }

    /// Reads the favorite name.
    pub fn name(&self) -> ModelResult<String> {
        self.name.get("favorite name")
    }

    /// Sets the favorite name.
    pub fn set_name(&mut self, name: &str) -> ModelResult<SetOutcome> {
        validate_name(name)?;
        Ok(self.name.set(name.to_string()))
    }
}

/// The favorite collection, dense in `[1, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorites {
    favorites: Vec<Favorite>,
}

impl Favorites {
    /// Creates `max` uninitialized favorites.
    #[must_use]
    pub fn new(max: u8) -> Self {
        Self {
            favorites: FavoriteId::all(max).map(Favorite::new).collect(),
        }
    }

    /// Highest favorite identifier.
    #[must_use]
    pub fn max(&self) -> u8 {
        self.favorites.len() as u8
    }

    /// Looks up a favorite.
    pub fn favorite(&self, id: FavoriteId) -> ModelResult<&Favorite> {
        id.check_max(self.max())?;
        Ok(&self.favorites[usize::from(id.get()) - 1])
    }

    /// Looks up a favorite for mutation.
    pub fn favorite_mut(&mut self, id: FavoriteId) -> ModelResult<&mut Favorite> {
        id.check_max(self.max())?;
        Ok(&mut self.favorites[usize::from(id.get()) - 1])
    }

    /// Iterates favorites in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Favorite> {
        self.favorites.iter()
    }

    /// Looks a favorite up by its name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Favorite> {
        self.favorites
            .iter()
            .find(|f| f.name().ok().as_deref() == Some(name))
    }
}
