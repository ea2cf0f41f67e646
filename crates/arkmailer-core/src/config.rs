//! Run configuration for the reconciliation pipeline.

use std::time::Duration;

use crate::error::{SyncError, SyncResult};

/// Cohort-family prefixes stripped from cohort codes, in match order.
pub const DEFAULT_COHORT_PREFIXES: &[&str] = &["arkls-", "arkks-"];

/// Segment between the cohort and the domain of every managed group.
pub const DEFAULT_GROUP_SUFFIX: &str = "ouders";

/// Roster record type that marks a pupil.
pub const STUDENT_RECORD_TYPE: &str = "lln";

/// Cohort whose records are included regardless of their record type.
///
/// The roster does not fill the type field reliably for this cohort.
pub const DEFAULT_EXCEPTION_COHORT: &str = "ArkKS-K1 Kikker";

/// Default pause between two groups.
pub const DEFAULT_PACING_DELAY: Duration = Duration::from_secs(1);

/// Immutable configuration shared by all pipeline stages.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Mail domain of the managed groups.
    pub domain: String,
    /// Segment appended to the cleaned cohort code.
    pub group_suffix: String,
    /// Recognised cohort-family prefixes, first match wins.
    pub cohort_prefixes: Vec<String>,
    /// Cohort included even when its records carry another type.
    pub exception_cohort: Option<String>,
    /// Restricts the run to a single cohort code.
    pub test_filter: Option<String>,
    /// Pause inserted after each group.
    pub pacing_delay: Duration,
    /// Compute the plan without applying it.
    pub dry_run: bool,
}

impl SyncConfig {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> SyncConfigBuilder {
        SyncConfigBuilder::default()
    }
}

/// Builder for [`SyncConfig`].
#[derive(Debug, Clone)]
pub struct SyncConfigBuilder {
    domain: Option<String>,
    group_suffix: String,
    cohort_prefixes: Vec<String>,
    exception_cohort: Option<String>,
    test_filter: Option<String>,
    pacing_delay: Duration,
    dry_run: bool,
}

impl Default for SyncConfigBuilder {
    fn default() -> Self {
        Self {
            domain: None,
            group_suffix: DEFAULT_GROUP_SUFFIX.to_string(),
            cohort_prefixes: DEFAULT_COHORT_PREFIXES
                .iter()
                .map(ToString::to_string)
                .collect(),
            exception_cohort: Some(DEFAULT_EXCEPTION_COHORT.to_string()),
            test_filter: None,
            pacing_delay: DEFAULT_PACING_DELAY,
            dry_run: false,
        }
    }
}

impl SyncConfigBuilder {
    /// Sets the group mail domain.
    #[must_use]
    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the group suffix segment.
    #[must_use]
    pub fn group_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.group_suffix = suffix.into();
        self
    }

    /// Replaces the cohort prefix list.
    #[must_use]
    pub fn cohort_prefixes<I, S>(mut self, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cohort_prefixes = prefixes.into_iter().map(Into::into).collect();
        self
    }

    /// Sets or clears the exception cohort.
    #[must_use]
    pub fn exception_cohort(mut self, cohort: Option<String>) -> Self {
        self.exception_cohort = cohort.filter(|c| !c.trim().is_empty());
        self
    }

    /// Sets or clears the single-cohort test filter.
    #[must_use]
    pub fn test_filter(mut self, filter: Option<String>) -> Self {
        self.test_filter = filter.filter(|f| !f.trim().is_empty());
        self
    }

    /// Sets the pause between groups.
    #[must_use]
    pub fn pacing_delay(mut self, delay: Duration) -> Self {
        self.pacing_delay = delay;
        self
    }

    /// Enables or disables dry-run mode.
    #[must_use]
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Validates and builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Configuration`] if the domain or the group suffix
    /// is missing or malformed.
    pub fn build(self) -> SyncResult<SyncConfig> {
        let domain = self
            .domain
            .map(|d| d.trim().to_lowercase())
            .filter(|d| !d.is_empty())
            .ok_or_else(|| SyncError::configuration("group mail domain is required"))?;

        if domain.contains('@') || domain.chars().any(char::is_whitespace) {
            return Err(SyncError::configuration(format!(
                "invalid group mail domain: {domain}"
            )));
        }

        let group_suffix = self.group_suffix.trim().to_lowercase();
        if group_suffix.is_empty() || group_suffix.chars().any(char::is_whitespace) {
            return Err(SyncError::configuration(format!(
                "invalid group suffix: {:?}",
                self.group_suffix
            )));
        }

        Ok(SyncConfig {
            domain,
            group_suffix,
            cohort_prefixes: self.cohort_prefixes,
            exception_cohort: self.exception_cohort,
            test_filter: self.test_filter,
            pacing_delay: self.pacing_delay,
            dry_run: self.dry_run,
        })
    }
}
