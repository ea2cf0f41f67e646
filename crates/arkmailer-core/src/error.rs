//! Sync error types.

use thiserror::Error;

/// Errors that can occur during a reconciliation run.
///
/// The variants follow the containment levels of a run: [`SyncError::Fetch`]
/// aborts the whole run, [`SyncError::Group`] skips a single group and
/// [`SyncError::Operation`] skips a single address.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Configuration is missing or invalid.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// A cohort code could not be turned into a group identifier.
    #[error("Invalid cohort code: {cohort:?}")]
    InvalidCohort { cohort: String },

    /// A string is not a valid group identifier.
    #[error("Invalid group identifier: {value:?}")]
    InvalidGroupId { value: String },

    /// Roster or observed-state acquisition failed.
    #[error("Fetch of {source_name} failed: {message}")]
    Fetch {
        source_name: String,
        message: String,
    },

    /// A group could not be verified or created.
    #[error("Group {group} unavailable: {message}")]
    Group { group: String, message: String },

    /// A single membership operation failed.
    #[error("Operation on {group} for {address} failed: {message}")]
    Operation {
        group: String,
        address: String,
        message: String,
    },

    /// The report could not be delivered.
    #[error("Report delivery failed: {message}")]
    Report { message: String },
}

impl SyncError {
    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an invalid cohort error.
    pub fn invalid_cohort(cohort: impl Into<String>) -> Self {
        Self::InvalidCohort {
            cohort: cohort.into(),
        }
    }

    /// Create an invalid group identifier error.
    pub fn invalid_group_id(value: impl Into<String>) -> Self {
        Self::InvalidGroupId {
            value: value.into(),
        }
    }

    /// Create a fetch error.
    pub fn fetch(source_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            message: message.into(),
        }
    }

    /// Create a group error.
    pub fn group(group: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Group {
            group: group.into(),
            message: message.into(),
        }
    }

    /// Create an operation error.
    pub fn operation(
        group: impl Into<String>,
        address: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::Operation {
            group: group.into(),
            address: address.into(),
            message: message.into(),
        }
    }

    /// Create a report delivery error.
    pub fn report(message: impl Into<String>) -> Self {
        Self::Report {
            message: message.into(),
        }
    }

    /// Check if this error must abort the whole run.
    #[must_use]
    pub fn is_fatal_for_run(&self) -> bool {
        matches!(
            self,
            SyncError::Configuration { .. } | SyncError::Fetch { .. }
        )
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
