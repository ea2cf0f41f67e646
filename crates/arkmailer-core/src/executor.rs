//! Application of a reconciliation plan against the group directory.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::group_key::GroupId;
use crate::ledger::ResultLedger;
use crate::reconcile::{OperationSet, ReconciliationPlan};
use crate::traits::{AddOutcome, GroupDirectory, RemoveOutcome};

/// Applies membership operations group by group.
///
/// Groups are processed strictly sequentially. Within a group the group is
/// ensured first, then all removals run, then all additions. A failing group
/// or address never aborts the run.
pub struct SyncExecutor {
    directory: Arc<dyn GroupDirectory>,
    pacing_delay: Duration,
    dry_run: bool,
}

impl SyncExecutor {
    /// Creates an executor using the pacing and dry-run settings of `config`.
    pub fn new(directory: Arc<dyn GroupDirectory>, config: &SyncConfig) -> Self {
        Self {
            directory,
            pacing_delay: config.pacing_delay,
            dry_run: config.dry_run,
        }
    }

    /// Applies a whole plan and returns the ledger of the run.
    pub async fn run(&self, plan: &ReconciliationPlan) -> ResultLedger {
        let mut ledger = ResultLedger::new();

        info!(
            groups = plan.len(),
            to_add = plan.total_adds(),
            to_remove = plan.total_removes(),
            dry_run = self.dry_run,
            "Applying reconciliation plan"
        );

        if self.dry_run {
            for (group, ops) in plan.iter() {
                log_planned(group, ops);
            }
            return ledger;
        }

        for (group, ops) in plan.iter() {
            self.execute(group, ops, &mut ledger).await;

            if !self.pacing_delay.is_zero() {
                tokio::time::sleep(self.pacing_delay).await;
            }
        }

        info!(
            added = ledger.added_count(),
            removed = ledger.removed_count(),
            invalid = ledger.invalid_count(),
            failed_groups = ledger.failed_groups.len(),
            transient_failures = ledger.transient_failure_count(),
            "Reconciliation plan applied"
        );

        ledger
    }

    /// Applies the operations of one group, recording outcomes in `ledger`.
    pub async fn execute(&self, group: &GroupId, ops: &OperationSet, ledger: &mut ResultLedger) {
        info!(group = %group, "Synchronising group");

        if let Err(e) = self
            .directory
            .ensure_group_exists(group, &group.display_name(), &group.description())
            .await
        {
            error!(group = %group, error = %e, "Group unavailable, skipping");
            ledger.record_failed_group(group, e.to_string());
            return;
        }

        for address in &ops.to_remove {
            match self.directory.remove_member(group, address).await {
                Ok(RemoveOutcome::Removed) => {
                    info!(group = %group, address = %address, "Member removed");
                    ledger.record_removed(group, address.clone());
                }
                Ok(RemoveOutcome::NotAMember) => {
                    debug!(group = %group, address = %address, "Member already absent");
                }
                Err(e) => {
                    warn!(group = %group, address = %address, error = %e, "Failed to remove member");
                    ledger.record_transient_failure(group);
                }
            }
        }

        for address in &ops.to_add {
            match self.directory.add_member(group, address).await {
                Ok(AddOutcome::Added) => {
                    info!(group = %group, address = %address, "Member added");
                    ledger.record_added(group, address.clone());
                }
                Ok(AddOutcome::AlreadyMember) => {
                    debug!(group = %group, address = %address, "Member already present");
                }
                Ok(AddOutcome::InvalidAddress) => {
                    warn!(group = %group, address = %address, "Address rejected by directory");
                    ledger.record_invalid(group, address.clone());
                }
                Err(e) => {
                    warn!(group = %group, address = %address, error = %e, "Failed to add member");
                    ledger.record_transient_failure(group);
                }
            }
        }

        debug!(group = %group, "Group synchronised");
    }
}

fn log_planned(group: &GroupId, ops: &OperationSet) {
    if ops.is_empty() {
        debug!(group = %group, "No changes planned");
        return;
    }
    for address in &ops.to_remove {
        info!(group = %group, address = %address, "Would remove member");
    }
    for address in &ops.to_add {
        info!(group = %group, address = %address, "Would add member");
    }
}
