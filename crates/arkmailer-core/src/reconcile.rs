//! Reconciliation of desired against observed group membership.
//!
//! Compares the roster-derived membership with what the directory reports
//! and derives, per group, the addresses to add and to remove. Observed
//! addresses are matched against the raw desired addresses, desired addresses
//! against the normalized observed ones (see [`crate::address`]).

use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::address::MemberAddress;
use crate::group_key::GroupId;
use crate::membership::{MemberSet, MembershipMap};

/// Membership changes for one group.
///
/// `to_add` and `to_remove` are always disjoint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OperationSet {
    /// Desired addresses missing from the group.
    pub to_add: MemberSet,
    /// Observed addresses no longer desired.
    pub to_remove: MemberSet,
}

impl OperationSet {
    /// Whether the group is already in sync.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.to_add.is_empty() && self.to_remove.is_empty()
    }

    /// Total number of operations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.to_add.len() + self.to_remove.len()
    }
}

/// Operations for every group of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationPlan {
    groups: BTreeMap<GroupId, OperationSet>,
}

impl ReconciliationPlan {
    /// Returns the operations for a group.
    #[must_use]
    pub fn get(&self, group: &GroupId) -> Option<&OperationSet> {
        self.groups.get(group)
    }

    /// Iterates over groups and their operations.
    pub fn iter(&self) -> impl Iterator<Item = (&GroupId, &OperationSet)> {
        self.groups.iter()
    }

    /// Number of groups in the plan.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether the plan covers no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Whether no group needs any change.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        self.groups.values().all(OperationSet::is_empty)
    }

    /// Total additions across all groups.
    #[must_use]
    pub fn total_adds(&self) -> usize {
        self.groups.values().map(|ops| ops.to_add.len()).sum()
    }

    /// Total removals across all groups.
    #[must_use]
    pub fn total_removes(&self) -> usize {
        self.groups.values().map(|ops| ops.to_remove.len()).sum()
    }
}

impl IntoIterator for ReconciliationPlan {
    type Item = (GroupId, OperationSet);
    type IntoIter = std::collections::btree_map::IntoIter<GroupId, OperationSet>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.into_iter()
    }
}

/// Stateless engine deriving membership operations.
pub struct ReconciliationEngine;

impl ReconciliationEngine {
    /// Derives the operations for every group in `desired`.
    ///
    /// Groups only present in `observed` are left alone. A desired group
    /// with an empty member set drains every observed member.
    #[must_use]
    pub fn reconcile(desired: &MembershipMap, observed: &MembershipMap) -> ReconciliationPlan {
        let empty = MemberSet::new();

        let groups = desired
            .iter()
            .map(|(group, desired_members)| {
                let observed_members = observed.get(group).unwrap_or(&empty);
                let ops = Self::reconcile_group(desired_members, observed_members);
                debug!(
                    group = %group,
                    to_add = ops.to_add.len(),
                    to_remove = ops.to_remove.len(),
                    "Group reconciled"
                );
                (group.clone(), ops)
            })
            .collect();

        ReconciliationPlan { groups }
    }

    /// Derives the operations for a single group.
    ///
    /// An observed address is kept when it or its normalized form is one of
    /// the desired addresses as written. A desired address is added only when
    /// it is not observed and its normalized form matches no normalized
    /// observed address.
    #[must_use]
    pub fn reconcile_group(desired: &MemberSet, observed: &MemberSet) -> OperationSet {
        let observed_normalized: BTreeSet<String> =
            observed.iter().map(MemberAddress::normalized).collect();

        let to_remove = observed
            .iter()
            .filter(|member| {
                !desired.contains(*member) && !desired.contains(member.normalized().as_str())
            })
            .cloned()
            .collect();

        let to_add = desired
            .iter()
            .filter(|member| {
                !observed.contains(*member) && !observed_normalized.contains(&member.normalized())
            })
            .cloned()
            .collect();

        OperationSet { to_add, to_remove }
    }
}
