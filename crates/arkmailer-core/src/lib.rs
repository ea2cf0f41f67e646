//! # Arkmailer Core
//!
//! Reconciliation of mailing-group membership against an authoritative
//! school roster.
//!
//! ## Pipeline
//!
//! ```text
//! ┌──────────────┐   ┌──────────────────┐   ┌──────────────────┐
//! │ RosterSource │──►│ RosterAggregator │──►│                  │
//! └──────────────┘   └──────────────────┘   │ Reconciliation   │
//! ┌─────────────────────┐                   │ Engine           │
//! │ ObservedStateSource │──────────────────►│                  │
//! └─────────────────────┘                   └────────┬─────────┘
//!                                                    ▼
//!                    ┌────────────┐   ┌──────────────┐   ┌────────────┐
//!                    │ ReportSink │◄──│ ResultLedger │◄──│SyncExecutor│
//!                    └────────────┘   └──────────────┘   └────────────┘
//! ```
//!
//! The external systems sit behind the traits in [`traits`]; everything in
//! between is pure and deterministic apart from the executor's calls.
//!
//! ## Example
//!
//! ```ignore
//! use arkmailer_core::{ReconciliationEngine, RosterAggregator, SyncConfig, SyncExecutor};
//!
//! let config = SyncConfig::builder().domain("school.be").build()?;
//! let desired = RosterAggregator::new(&config).aggregate(&records).desired;
//! let plan = ReconciliationEngine::reconcile(&desired, &observed);
//! let ledger = SyncExecutor::new(directory, &config).run(&plan).await;
//! ```

pub mod address;
pub mod config;
pub mod error;
pub mod executor;
pub mod group_key;
pub mod ledger;
pub mod membership;
pub mod reconcile;
pub mod report;
pub mod roster;
pub mod traits;

pub use address::{normalize, split_addresses, MemberAddress};
pub use config::{SyncConfig, SyncConfigBuilder};
pub use error::{SyncError, SyncResult};
pub use executor::SyncExecutor;
pub use group_key::{GroupId, GroupKeyDeriver};
pub use ledger::{FailedGroup, ResultLedger};
pub use membership::{MemberSet, MembershipMap, MembershipMapBuilder};
pub use reconcile::{OperationSet, ReconciliationEngine, ReconciliationPlan};
pub use report::Report;
pub use roster::{Aggregation, AggregationStats, RosterAggregator, RosterRecord};
pub use traits::{
    AddOutcome, GroupDirectory, ObservedStateSource, RemoveOutcome, ReportSink, RosterSource,
};
