//! Groups: logical aggregations of zones with derived state.
//!
//! A group has no state of its own beyond a name and an unordered member
//! set. Volume, mute, and source are derived from the members: volume is
//! the arithmetic mean rounded half-away-from-zero, mute is true only when
//! every member is muted, and source is defined only when every member
//! shares one.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, ModelResult};
use crate::model::ids::{GroupId, SourceId, ZoneId};
use crate::model::property::{Property, SetOutcome};
use crate::model::validate_name;
use crate::model::volume::Level;
use crate::model::zone::Zones;

/// Source derivation for a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GroupSource {
    /// Every member zone shares this source.
    Single(SourceId),
    /// Members disagree (or some have no source yet); the wire reports `X`.
    Mixed,
}

/// The derived volume/mute/source triple for a non-empty group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DerivedState {
    /// Mean member volume, rounded half-away-from-zero. `None` until at
    /// least one member has a volume.
    pub volume: Option<Level>,
    /// True iff every member is muted.
    pub mute: bool,
    /// The shared source, or `Mixed`.
    pub source: GroupSource,
}

/// One logical aggregation of zones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    identifier: GroupId,
    name: Property<String>,
    members: BTreeSet<ZoneId>,
}

impl Group {
    /// Creates an uninitialized, empty group.
    #[must_use]
    pub fn new(identifier: GroupId) -> Self {
        Self {
            identifier,
            name: Property::new(),
            members: BTreeSet::new(),
        }
    }

    /// Returns the group identifier.
    #[must_use]
    pub fn identifier(&self) -> GroupId {
        self.identifier
    }

    /// Reads the group name.
    pub fn name(&self) -> ModelResult<String> {
        self.name.get("group name")
    }

    /// Sets the group name.
    pub fn set_name(&mut self, name: &str) -> ModelResult<SetOutcome> {
        validate_name(name)?;
        Ok(self.name.set(name.to_string()))
    }

    /// Returns the member zone identifiers in ascending order.
    pub fn members(&self) -> impl Iterator<Item = ZoneId> + '_ {
        self.members.iter().copied()
    }

    /// Number of member zones.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// True when the group has no members. Empty groups have undefined
    /// derived state and reject mutating commands.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// True when `zone` is a member.
    #[must_use]
    pub fn contains(&self, zone: ZoneId) -> bool {
        self.members.contains(&zone)
    }

    /// Adds a member zone.
    pub fn add_zone(&mut self, zone: ZoneId) -> SetOutcome {
        if self.members.insert(zone) {
            SetOutcome::Changed
        } else {
            SetOutcome::AlreadySet
        }
    }

    /// Removes a member zone.
    pub fn remove_zone(&mut self, zone: ZoneId) -> SetOutcome {
        if self.members.remove(&zone) {
            SetOutcome::Changed
        } else {
            SetOutcome::AlreadySet
        }
    }

    /// Recomputes the derived volume/mute/source triple from member zones.
    ///
    /// # Errors
    ///
    /// Fails with [`ModelError::EmptyGroup`] when the member set is empty.
    pub fn derive_state(&self, zones: &Zones) -> ModelResult<DerivedState> {
        if self.members.is_empty() {
            return Err(ModelError::EmptyGroup(self.identifier.get()));
        }

        let mut level_sum: i32 = 0;
        let mut level_count: i32 = 0;
        let mut all_muted = true;
        let mut source = None;
        let mut mixed = false;

        for id in &self.members {
            let zone = zones.zone(*id)?;

            if let Ok(level) = zone.volume().level() {
                level_sum += i32::from(level);
                level_count += 1;
            }

            // A member whose mute was never reported counts as unmuted.
            if !zone.volume().mute().unwrap_or(false) {
                all_muted = false;
            }

            match (source, zone.source_opt()) {
                (_, None) => mixed = true,
                (None, Some(s)) => source = Some(s),
                (Some(prev), Some(s)) if prev != s => mixed = true,
                _ => {}
            }
        }

        let volume = if level_count > 0 {
            Some(mean_half_away_from_zero(level_sum, level_count))
        } else {
            None
        };

        let source = match (mixed, source) {
            (false, Some(s)) => GroupSource::Single(s),
            _ => GroupSource::Mixed,
        };

        Ok(DerivedState {
            volume,
            mute: all_muted,
            source,
        })
    }
}

/// Integer mean of `sum / count`, rounded half-away-from-zero.
fn mean_half_away_from_zero(sum: i32, count: i32) -> Level {
    debug_assert!(count > 0);
    let doubled = 2 * sum.abs() + count;
    let magnitude = doubled / (2 * count);
    let rounded = if sum < 0 { -magnitude } else { magnitude };
    rounded as Level
}

/// The group collection, dense in `[1, max]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Groups {
    groups: Vec<Group>,
}

impl Groups {
    /// Creates `max` uninitialized groups.
    #[must_use]
    pub fn new(max: u8) -> Self {
        Self {
            groups: GroupId::all(max).map(Group::new).collect(),
        }
    }

    /// Highest group identifier.
    #[must_use]
    pub fn max(&self) -> u8 {
        self.groups.len() as u8
    }

    /// Looks up a group.
    pub fn group(&self, id: GroupId) -> ModelResult<&Group> {
        id.check_max(self.max())?;
        Ok(&self.groups[usize::from(id.get()) - 1])
    }

    /// Looks up a group for mutation.
    pub fn group_mut(&mut self, id: GroupId) -> ModelResult<&mut Group> {
        id.check_max(self.max())?;
        Ok(&mut self.groups[usize::from(id.get()) - 1])
    }

    /// Iterates groups in identifier order.
    pub fn iter(&self) -> impl Iterator<Item = &Group> {
        self.groups.iter()
    }

    /// Identifiers of every group containing `zone`.
    pub fn containing(&self, zone: ZoneId) -> Vec<GroupId> {
        self.groups
            .iter()
            .filter(|g| g.contains(zone))
            .map(Group::identifier)
            .collect()
    }

    /// Looks a group up by its name.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<&Group> {
        self.groups
            .iter()
            .find(|g| g.name().ok().as_deref() == Some(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ids::SourceId;

    fn fixture() -> (Group, Zones) {
        let mut group = Group::new(GroupId::new(1).unwrap());
        group.add_zone(ZoneId::new(2).unwrap());
        group.add_zone(ZoneId::new(3).unwrap());
        (group, Zones::new(8))
    }

    #[test]
    fn membership_is_a_set() {
        let mut group = Group::new(GroupId::new(1).unwrap());
        let zone = ZoneId::new(4).unwrap();
        assert_eq!(group.add_zone(zone), SetOutcome::Changed);
        assert_eq!(group.add_zone(zone), SetOutcome::AlreadySet);
        assert_eq!(group.member_count(), 1);
        assert_eq!(group.remove_zone(zone), SetOutcome::Changed);
        assert_eq!(group.remove_zone(zone), SetOutcome::AlreadySet);
        assert!(group.is_empty());
    }

    #[test]
    fn empty_group_has_no_derived_state() {
        let group = Group::new(GroupId::new(5).unwrap());
        let zones = Zones::new(8);
        assert_eq!(
            group.derive_state(&zones),
            Err(ModelError::EmptyGroup(5))
        );
    }

    #[test]
    fn volume_is_rounded_mean() {
        let (group, mut zones) = fixture();
        zones
            .zone_mut(ZoneId::new(2).unwrap())
            .unwrap()
            .volume_mut()
            .set_level(-20)
            .unwrap();
        zones
            .zone_mut(ZoneId::new(3).unwrap())
            .unwrap()
            .volume_mut()
            .set_level(-40)
            .unwrap();

        let state = group.derive_state(&zones).unwrap();
        assert_eq!(state.volume, Some(-30));
    }

    #[test]
    fn volume_mean_rounds_half_away_from_zero() {
        let (group, mut zones) = fixture();
        zones
            .zone_mut(ZoneId::new(2).unwrap())
            .unwrap()
            .volume_mut()
            .set_level(-20)
            .unwrap();
        zones
            .zone_mut(ZoneId::new(3).unwrap())
            .unwrap()
            .volume_mut()
            .set_level(-41)
            .unwrap();

        // Mean -30.5 rounds away from zero to -31.
        let state = group.derive_state(&zones).unwrap();
        assert_eq!(state.volume, Some(-31));
    }

    #[test]
    fn mute_requires_every_member() {
        let (group, mut zones) = fixture();
        zones
            .zone_mut(ZoneId::new(2).unwrap())
            .unwrap()
            .volume_mut()
            .set_mute(true);

        assert!(!group.derive_state(&zones).unwrap().mute);

        zones
            .zone_mut(ZoneId::new(3).unwrap())
            .unwrap()
            .volume_mut()
            .set_mute(true);
        assert!(group.derive_state(&zones).unwrap().mute);
    }

    #[test]
    fn source_is_mixed_unless_shared() {
        let (group, mut zones) = fixture();
        zones
            .zone_mut(ZoneId::new(2).unwrap())
            .unwrap()
            .set_source(SourceId::new(4).unwrap());
        zones
            .zone_mut(ZoneId::new(3).unwrap())
            .unwrap()
            .set_source(SourceId::new(5).unwrap());

        assert_eq!(
            group.derive_state(&zones).unwrap().source,
            GroupSource::Mixed
        );

        zones
            .zone_mut(ZoneId::new(3).unwrap())
            .unwrap()
            .set_source(SourceId::new(4).unwrap());
        assert_eq!(
            group.derive_state(&zones).unwrap().source,
            GroupSource::Single(SourceId::new(4).unwrap())
        );
    }

    #[test]
    fn unreported_member_source_means_mixed() {
        let (group, mut zones) = fixture();
        zones
            .zone_mut(ZoneId::new(2).unwrap())
            .unwrap()
            .set_source(SourceId::new(4).unwrap());
        // Zone 3 never reported a source.
        assert_eq!(
            group.derive_state(&zones).unwrap().source,
            GroupSource::Mixed
        );
    }

    #[test]
    fn find_by_name_matches_initialized_names_only() {
        let mut groups = Groups::new(10);
        groups
            .group_mut(GroupId::new(3).unwrap())
            .unwrap()
            .set_name("Downstairs")
            .unwrap();

        assert_eq!(
            groups.find_by_name("Downstairs").map(|g| g.identifier().get()),
            Some(3)
        );
        assert!(groups.find_by_name("Upstairs").is_none());
    }

    #[test]
    fn containing_finds_groups_by_member() {
        let mut groups = Groups::new(10);
        let zone = ZoneId::new(6).unwrap();
        groups
            .group_mut(GroupId::new(2).unwrap())
            .unwrap()
            .add_zone(zone);
        groups
            .group_mut(GroupId::new(9).unwrap())
            .unwrap()
            .add_zone(zone);

        let ids: Vec<u8> = groups.containing(zone).iter().map(|g| g.get()).collect();
        assert_eq!(ids, vec![2, 9]);
    }

    #[test]
    fn rounding_helper_handles_signs() {
        assert_eq!(mean_half_away_from_zero(-61, 2), -31);
        assert_eq!(mean_half_away_from_zero(-60, 2), -30);
        assert_eq!(mean_half_away_from_zero(61, 2), 31);
        assert_eq!(mean_half_away_from_zero(0, 3), 0);
    }
}
