//! Plain-text run report rendered from a [`ResultLedger`].

use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fmt::Write;

use crate::group_key::GroupId;
use crate::ledger::ResultLedger;
use crate::membership::MemberSet;

/// Subject prefix of every report.
pub const REPORT_SUBJECT_PREFIX: &str = "Arkmailer Sync Report";

/// A rendered report, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub subject: String,
    pub body: String,
}

impl Report {
    /// Renders the report for a run.
    ///
    /// The body lists added, removed and invalid addresses per group, with a
    /// "none" heading for each empty section, followed by groups that could
    /// not be synchronised and transient failure counts, when any.
    #[must_use]
    pub fn from_ledger(ledger: &ResultLedger, run_date: NaiveDate) -> Self {
        let subject = format!(
            "{REPORT_SUBJECT_PREFIX} - {}",
            run_date.format("%d/%m/%Y")
        );

        let mut body = String::new();
        render_section(
            &mut body,
            &ledger.added,
            "Addresses Added",
            "No Addresses Added",
            "Added to group",
            "",
        );
        render_section(
            &mut body,
            &ledger.removed,
            "Addresses Removed",
            "No Addresses Removed",
            "Removed from group",
            "",
        );
        render_section(
            &mut body,
            &ledger.invalid,
            "Invalid/Non-Existent Addresses",
            "No Invalid Addresses Found",
            "Rejected by group",
            " (not added/does not exist)",
        );

        if !ledger.failed_groups.is_empty() {
            let _ = writeln!(body, "\n--- Groups Not Synchronised ---");
            for failed in &ledger.failed_groups {
                let _ = writeln!(body, "- {}: {}", failed.group, failed.reason);
            }
        }

        if !ledger.transient_failures.is_empty() {
            let _ = writeln!(body, "\n--- Operations Failed (will retry next run) ---");
            for (group, count) in &ledger.transient_failures {
                let _ = writeln!(body, "- {group}: {count}");
            }
        }

        Self { subject, body }
    }
}

fn render_section(
    body: &mut String,
    entries: &BTreeMap<GroupId, MemberSet>,
    heading: &str,
    empty_heading: &str,
    group_label: &str,
    member_note: &str,
) {
    if entries.is_empty() {
        let _ = writeln!(body, "\n--- {empty_heading} ---");
        return;
    }

    let _ = writeln!(body, "\n--- {heading} ---");
    for (group, members) in entries {
        let _ = writeln!(body, "\n{group_label} {group}:");
        for member in members {
            let _ = writeln!(body, "- {member}{member_note}");
        }
    }
}
