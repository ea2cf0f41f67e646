//! arkmailer - keeps the per-cohort parent mailing groups in line with the
//! WISA roster.
//!
//! One invocation performs one run: fetch the roster and the current group
//! membership, apply the difference, mail a report. Scheduling is left to
//! cron or a systemd timer.

use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use clap::Parser;
use tracing::{error, info};

use arkmailer_core::{GroupKeyDeriver, ReportSink};
use arkmailer_google::{DirectoryClient, GmailSender, GoogleClient, TokenCache, DEFAULT_BASE_URL};
use arkmailer_wisa::{WisaClient, WisaConfig, DEFAULT_TIMEOUT};

mod config;
mod error;
mod lock;
mod logging;
mod pipeline;

use config::AppConfig;
use error::{AppError, AppResult};
use lock::RunLock;
use pipeline::Collaborators;

/// Synchronise parent mailing groups with the school roster
#[derive(Parser, Debug)]
#[command(name = "arkmailer")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Compute and log the changes without applying them
    #[arg(long)]
    dry_run: bool,

    /// Only synchronise this cohort code (e.g. "ArkLS-1 blauw")
    #[arg(long, value_name = "CODE")]
    cohort: Option<String>,

    /// Do not mail the run report
    #[arg(long)]
    no_report: bool,
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = logging::init_logging(
        &config.log_filter,
        config.log_format,
        config.log_file.as_deref(),
    ) {
        eprintln!("Error: {e}");
        std::process::exit(e.exit_code());
    }

    let started = Instant::now();
    info!(
        started_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        dry_run = cli.dry_run,
        "Sync run started"
    );

    let result = run(cli, config).await;

    let elapsed = started.elapsed().as_secs();
    info!(
        finished_at = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        elapsed = %format!("{}h {}m {}s", elapsed / 3600, elapsed % 3600 / 60, elapsed % 60),
        "Sync run finished"
    );

    if let Err(e) = result {
        error!(error = %e, "Sync run failed");
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli, config: AppConfig) -> AppResult<()> {
    let lock = RunLock::acquire(&config.lock_file)?;
    info!(lock = %lock.path().display(), "Run lock held");

    let sync_config = config.sync_config(cli.dry_run, cli.cohort)?;
    if let Some(cohort) = &sync_config.test_filter {
        info!(cohort = %cohort, "Restricted to a single cohort");
    }

    let roster = WisaClient::new(WisaConfig {
        base_url: config.wisa_url.clone(),
        username: config.wisa_username.clone(),
        password: config.wisa_password.clone(),
        institution_numbers: config.institution_numbers.clone(),
        timeout: DEFAULT_TIMEOUT,
        snapshot_path: config.roster_snapshot_path.clone(),
    })
    .map_err(|e| AppError::Setup(e.to_string()))?;

    let directory_tokens = Arc::new(TokenCache::new(
        &config.directory_token_file,
        Some(config.directory_credentials.clone()),
        config.directory_scopes.clone(),
    ));
    let directory_http = GoogleClient::new(directory_tokens, DEFAULT_BASE_URL)
        .map_err(|e| AppError::Setup(e.to_string()))?;
    let directory = Arc::new(DirectoryClient::new(
        Arc::new(directory_http),
        GroupKeyDeriver::from_config(&sync_config),
    ));

    let sender = match (&config.report, cli.no_report) {
        (Some(report), false) => {
            let tokens = Arc::new(TokenCache::new(
                &report.token_file,
                report.credentials.clone(),
                report.scopes.clone(),
            ));
            let http = GoogleClient::new(tokens, DEFAULT_BASE_URL)
                .map_err(|e| AppError::Setup(e.to_string()))?;
            Some(GmailSender::new(
                Arc::new(http),
                report.sender.clone(),
                report.receiver.clone(),
            ))
        }
        _ => None,
    };

    let summary = pipeline::run(
        &sync_config,
        Collaborators {
            roster: &roster,
            observed: directory.as_ref(),
            directory: directory.clone(),
            report_sink: sender.as_ref().map(|s| s as &dyn ReportSink),
        },
        Local::now().date_naive(),
    )
    .await?;

    info!(
        records = summary.stats.records,
        groups = summary.stats.groups,
        added = summary.ledger.added_count(),
        removed = summary.ledger.removed_count(),
        invalid = summary.ledger.invalid_count(),
        failed_groups = summary.ledger.failed_groups.len(),
        transient_failures = summary.ledger.transient_failure_count(),
        report_sent = summary.report_delivered,
        "Sync run summary"
    );

    Ok(())
}
