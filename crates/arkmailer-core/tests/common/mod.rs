//! Shared fixtures for arkmailer-core integration tests.

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Mutex;
use std::time::Duration;

use arkmailer_core::{
    AddOutcome, GroupDirectory, GroupId, MemberAddress, MemberSet, MembershipMap,
    ObservedStateSource, RemoveOutcome, RosterRecord, SyncConfig, SyncError, SyncResult,
};
use async_trait::async_trait;

/// In-memory group directory with injectable failures.
#[derive(Default)]
pub struct InMemoryDirectory {
    groups: Mutex<BTreeMap<GroupId, MemberSet>>,
    created: Mutex<Vec<(GroupId, String, String)>>,
    unknown_accounts: BTreeSet<String>,
    failing_groups: BTreeSet<GroupId>,
    failing_addresses: BTreeSet<String>,
    calls: Mutex<Vec<String>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str, members: &[&str]) -> Self {
        self.groups
            .lock()
            .unwrap()
            .insert(group_id(group), addresses(members));
        self
    }

    /// Addresses the directory rejects as non-existent accounts.
    pub fn with_unknown_account(mut self, address: &str) -> Self {
        self.unknown_accounts.insert(address.to_string());
        self
    }

    /// Groups whose ensure call fails.
    pub fn with_failing_group(mut self, group: &str) -> Self {
        self.failing_groups.insert(group_id(group));
        self
    }

    /// Addresses whose add/remove calls fail transiently.
    pub fn with_failing_address(mut self, address: &str) -> Self {
        self.failing_addresses.insert(address.to_string());
        self
    }

    pub fn members(&self, group: &str) -> Option<MemberSet> {
        self.groups.lock().unwrap().get(&group_id(group)).cloned()
    }

    pub fn created_groups(&self) -> Vec<(GroupId, String, String)> {
        self.created.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObservedStateSource for InMemoryDirectory {
    async fn fetch_observed(&self) -> SyncResult<MembershipMap> {
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .map(|(g, m)| (g.clone(), m.clone()))
            .collect())
    }
}

#[async_trait]
impl GroupDirectory for InMemoryDirectory {
    async fn ensure_group_exists(
        &self,
        group: &GroupId,
        display_name: &str,
        description: &str,
    ) -> SyncResult<()> {
        self.calls.lock().unwrap().push(format!("ensure {group}"));
        if self.failing_groups.contains(group) {
            return Err(SyncError::group(group.as_str(), "HTTP 403: forbidden"));
        }
        let mut groups = self.groups.lock().unwrap();
        if !groups.contains_key(group) {
            groups.insert(group.clone(), MemberSet::new());
            self.created.lock().unwrap().push((
                group.clone(),
                display_name.to_string(),
                description.to_string(),
            ));
        }
        Ok(())
    }

    async fn add_member(&self, group: &GroupId, address: &MemberAddress) -> SyncResult<AddOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("add {group} {address}"));
        if self.failing_addresses.contains(address.as_str()) {
            return Err(SyncError::operation(group.as_str(), address.as_str(), "HTTP 500"));
        }
        if self.unknown_accounts.contains(address.as_str()) {
            return Ok(AddOutcome::InvalidAddress);
        }
        let mut groups = self.groups.lock().unwrap();
        let members = groups.entry(group.clone()).or_default();
        if members.insert(address.clone()) {
            Ok(AddOutcome::Added)
        } else {
            Ok(AddOutcome::AlreadyMember)
        }
    }

    async fn remove_member(
        &self,
        group: &GroupId,
        address: &MemberAddress,
    ) -> SyncResult<RemoveOutcome> {
        self.calls
            .lock()
            .unwrap()
            .push(format!("remove {group} {address}"));
        if self.failing_addresses.contains(address.as_str()) {
            return Err(SyncError::operation(group.as_str(), address.as_str(), "HTTP 500"));
        }
        let mut groups = self.groups.lock().unwrap();
        let removed = groups
            .get_mut(group)
            .is_some_and(|members| members.remove(address));
        if removed {
            Ok(RemoveOutcome::Removed)
        } else {
            Ok(RemoveOutcome::NotAMember)
        }
    }
}

pub fn group_id(raw: &str) -> GroupId {
    GroupId::parse(raw).unwrap()
}

pub fn addresses(raw: &[&str]) -> MemberSet {
    raw.iter().filter_map(|a| MemberAddress::new(a)).collect()
}

pub fn pupil(cohort: &str, addresses: &str) -> RosterRecord {
    RosterRecord::new("LLN", cohort, addresses)
}

pub fn test_config() -> SyncConfig {
    SyncConfig::builder()
        .domain("deark.be")
        .pacing_delay(Duration::ZERO)
        .build()
        .unwrap()
}
