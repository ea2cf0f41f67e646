//! Per-run record of applied membership changes.

use std::collections::BTreeMap;

use crate::address::MemberAddress;
use crate::group_key::GroupId;
use crate::membership::MemberSet;

/// A group that could not be verified or created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailedGroup {
    pub group: GroupId,
    pub reason: String,
}

/// Outcome of a reconciliation run.
///
/// Only successful or classified outcomes are recorded per address; transient
/// failures are counted per group.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultLedger {
    /// Addresses added, per group.
    pub added: BTreeMap<GroupId, MemberSet>,
    /// Addresses removed, per group.
    pub removed: BTreeMap<GroupId, MemberSet>,
    /// Addresses the directory rejected as non-existent accounts, per group.
    pub invalid: BTreeMap<GroupId, MemberSet>,
    /// Groups skipped because they could not be ensured.
    pub failed_groups: Vec<FailedGroup>,
    /// Transient operation failures, per group.
    pub transient_failures: BTreeMap<GroupId, usize>,
}

impl ResultLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a successful addition.
    pub fn record_added(&mut self, group: &GroupId, address: MemberAddress) {
        self.added.entry(group.clone()).or_default().insert(address);
    }

    /// Records a successful removal.
    pub fn record_removed(&mut self, group: &GroupId, address: MemberAddress) {
        self.removed.entry(group.clone()).or_default().insert(address);
    }

    /// Records an address the directory does not know.
    pub fn record_invalid(&mut self, group: &GroupId, address: MemberAddress) {
        self.invalid.entry(group.clone()).or_default().insert(address);
    }

    /// Records a group that could not be ensured.
    pub fn record_failed_group(&mut self, group: &GroupId, reason: impl Into<String>) {
        self.failed_groups.push(FailedGroup {
            group: group.clone(),
            reason: reason.into(),
        });
    }

    /// Counts a failed operation for a group.
    pub fn record_transient_failure(&mut self, group: &GroupId) {
        *self.transient_failures.entry(group.clone()).or_insert(0) += 1;
    }

    /// Total addresses added.
    #[must_use]
    pub fn added_count(&self) -> usize {
        self.added.values().map(MemberSet::len).sum()
    }

    /// Total addresses removed.
    #[must_use]
    pub fn removed_count(&self) -> usize {
        self.removed.values().map(MemberSet::len).sum()
    }

    /// Total addresses rejected as invalid.
    #[must_use]
    pub fn invalid_count(&self) -> usize {
        self.invalid.values().map(MemberSet::len).sum()
    }

    /// Total transient failures across all groups.
    #[must_use]
    pub fn transient_failure_count(&self) -> usize {
        self.transient_failures.values().sum()
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty()
            && self.removed.is_empty()
            && self.invalid.is_empty()
            && self.failed_groups.is_empty()
            && self.transient_failures.is_empty()
    }
}
