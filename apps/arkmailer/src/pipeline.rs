//! One reconciliation run, from roster fetch to report delivery.

use std::sync::Arc;

use arkmailer_core::{
    AggregationStats, GroupDirectory, ObservedStateSource, ReconciliationEngine, Report,
    ReportSink, ResultLedger, RosterAggregator, RosterSource, SyncConfig, SyncExecutor,
    SyncResult,
};
use chrono::NaiveDate;
use tracing::{error, info, warn};

/// External collaborators of a run.
pub struct Collaborators<'a> {
    pub roster: &'a dyn RosterSource,
    pub observed: &'a dyn ObservedStateSource,
    pub directory: Arc<dyn GroupDirectory>,
    /// `None` disables report delivery.
    pub report_sink: Option<&'a dyn ReportSink>,
}

/// What a finished run produced.
#[derive(Debug)]
pub struct RunSummary {
    pub stats: AggregationStats,
    pub ledger: ResultLedger,
    /// Whether the report reached its sink.
    pub report_delivered: bool,
}

/// Runs the pipeline once.
///
/// Only a failed roster or directory fetch ends the run with an error; no
/// report is produced in that case. Report delivery failures are logged and
/// do not fail the run. A dry run never delivers a report.
///
/// # Errors
///
/// Returns [`arkmailer_core::SyncError::Fetch`] if either input cannot be
/// acquired.
pub async fn run(
    config: &SyncConfig,
    collaborators: Collaborators<'_>,
    run_date: NaiveDate,
) -> SyncResult<RunSummary> {
    let records = collaborators.roster.fetch_roster().await?;
    let aggregation = RosterAggregator::new(config).aggregate(&records);

    let observed = collaborators.observed.fetch_observed().await?;
    info!(
        desired_groups = aggregation.desired.len(),
        observed_groups = observed.len(),
        "Inputs loaded"
    );

    let plan = ReconciliationEngine::reconcile(&aggregation.desired, &observed);
    if plan.is_noop() {
        info!("Directory already matches the roster");
    }

    let ledger = SyncExecutor::new(collaborators.directory, config)
        .run(&plan)
        .await;

    let report = Report::from_ledger(&ledger, run_date);
    let report_delivered = match collaborators.report_sink {
        _ if config.dry_run => {
            info!("Dry run, report not sent");
            false
        }
        Some(sink) => match sink.deliver(&report).await {
            Ok(()) => {
                info!(subject = %report.subject, "Report delivered");
                true
            }
            Err(e) => {
                error!(error = %e, "Report delivery failed");
                false
            }
        },
        None => {
            warn!("Report delivery disabled");
            false
        }
    };
    info!("{}\n{}", report.subject, report.body);

    Ok(RunSummary {
        stats: aggregation.stats,
        ledger,
        report_delivered,
    })
}
