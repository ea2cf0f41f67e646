//! Boundary traits between the reconciliation pipeline and its collaborators.
//!
//! Each external system is reached through a narrow capability trait so the
//! pipeline can run against real connectors or in-memory fakes.

use async_trait::async_trait;

use crate::address::MemberAddress;
use crate::error::SyncResult;
use crate::group_key::GroupId;
use crate::membership::MembershipMap;
use crate::report::Report;
use crate::roster::RosterRecord;

/// Result of adding a member to a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddOutcome {
    /// The member was added.
    Added,
    /// The member was already present.
    AlreadyMember,
    /// The directory does not know the address.
    InvalidAddress,
}

/// Result of removing a member from a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    /// The member was removed.
    Removed,
    /// The member was already absent.
    NotAMember,
}

/// Source of the authoritative roster.
#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Fetch the current roster snapshot.
    ///
    /// Failures are reported as [`crate::SyncError::Fetch`].
    async fn fetch_roster(&self) -> SyncResult<Vec<RosterRecord>>;
}

/// Source of the current directory membership.
#[async_trait]
pub trait ObservedStateSource: Send + Sync {
    /// Fetch every managed group and its members.
    ///
    /// Implementations drain all pages before returning. Failures are
    /// reported as [`crate::SyncError::Fetch`].
    async fn fetch_observed(&self) -> SyncResult<MembershipMap>;
}

/// Mutating access to the group directory.
#[async_trait]
pub trait GroupDirectory: Send + Sync {
    /// Make sure the group exists, creating it when absent.
    async fn ensure_group_exists(
        &self,
        group: &GroupId,
        display_name: &str,
        description: &str,
    ) -> SyncResult<()>;

    /// Add a member to a group.
    async fn add_member(&self, group: &GroupId, address: &MemberAddress) -> SyncResult<AddOutcome>;

    /// Remove a member from a group.
    async fn remove_member(
        &self,
        group: &GroupId,
        address: &MemberAddress,
    ) -> SyncResult<RemoveOutcome>;
}

/// Destination of the run report.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver a rendered report.
    async fn deliver(&self, report: &Report) -> SyncResult<()>;
}
