//! Typed group → member-set maps for desired and observed state.

use std::collections::{btree_map, BTreeMap, BTreeSet};

use crate::address::MemberAddress;
use crate::group_key::GroupId;

/// Members of one group.
pub type MemberSet = BTreeSet<MemberAddress>;

/// Immutable mapping from group to its member set.
///
/// Built once per run through [`MembershipMapBuilder`] and never mutated
/// afterwards. Used for both the roster-derived desired state and the
/// directory-reported observed state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MembershipMap {
    groups: BTreeMap<GroupId, MemberSet>,
}

impl MembershipMap {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> MembershipMapBuilder {
        MembershipMapBuilder::default()
    }

    /// Returns the members of a group, if the group is present.
    #[must_use]
    pub fn get(&self, group: &GroupId) -> Option<&MemberSet> {
        self.groups.get(group)
    }

    /// Whether the group has an entry (possibly empty).
    #[must_use]
    pub fn contains_group(&self, group: &GroupId) -> bool {
        self.groups.contains_key(group)
    }

    /// Iterates over the groups.
    pub fn groups(&self) -> impl Iterator<Item = &GroupId> {
        self.groups.keys()
    }

    /// Iterates over group entries.
    pub fn iter(&self) -> btree_map::Iter<'_, GroupId, MemberSet> {
        self.groups.iter()
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total number of memberships across all groups.
    #[must_use]
    pub fn total_members(&self) -> usize {
        self.groups.values().map(BTreeSet::len).sum()
    }
}

impl<'a> IntoIterator for &'a MembershipMap {
    type Item = (&'a GroupId, &'a MemberSet);
    type IntoIter = btree_map::Iter<'a, GroupId, MemberSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Accumulates memberships before freezing them into a [`MembershipMap`].
#[derive(Debug, Default)]
pub struct MembershipMapBuilder {
    groups: BTreeMap<GroupId, MemberSet>,
}

impl MembershipMapBuilder {
    /// Ensures the group has an entry, even if it stays empty.
    pub fn insert_group(&mut self, group: GroupId) -> &mut Self {
        self.groups.entry(group).or_default();
        self
    }

    /// Unions members into the entry for a group, creating it if absent.
    pub fn extend<I>(&mut self, group: GroupId, members: I) -> &mut Self
    where
        I: IntoIterator<Item = MemberAddress>,
    {
        self.groups.entry(group).or_default().extend(members);
        self
    }

    /// Freezes the accumulated state.
    #[must_use]
    pub fn build(self) -> MembershipMap {
        MembershipMap {
            groups: self.groups,
        }
    }
}

impl FromIterator<(GroupId, MemberSet)> for MembershipMap {
    fn from_iter<T: IntoIterator<Item = (GroupId, MemberSet)>>(iter: T) -> Self {
        let mut builder = MembershipMap::builder();
        for (group, members) in iter {
            builder.extend(group, members);
        }
        builder.build()
    }
}
