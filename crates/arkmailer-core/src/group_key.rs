//! Group identifiers and their derivation from roster cohort codes.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};

/// Canonical address of a managed group.
///
/// Always lower-case and free of whitespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GroupId(String);

impl GroupId {
    /// Parses a group address as reported by the directory.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidGroupId`] when the value is blank, contains
    /// whitespace or has no `@`.
    pub fn parse(value: &str) -> SyncResult<Self> {
        let cleaned = value.trim().to_lowercase();
        if cleaned.is_empty()
            || cleaned.chars().any(char::is_whitespace)
            || !cleaned.contains('@')
        {
            return Err(SyncError::invalid_group_id(value));
        }
        Ok(Self(cleaned))
    }

    /// Returns the group address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the part before the `@`.
    #[must_use]
    pub fn local_part(&self) -> &str {
        self.0.split_once('@').map_or(self.0.as_str(), |(local, _)| local)
    }

    /// Human readable name used when the group has to be created.
    ///
    /// This is the first dot-separated segment of the local part with its
    /// first character upper-cased, e.g. `k1kikker.ouders@…` → `K1kikker`.
    #[must_use]
    pub fn display_name(&self) -> String {
        let segment = self.local_part().split('.').next().unwrap_or_default();
        let mut chars = segment.chars();
        match chars.next() {
            Some(first) => first
                .to_uppercase()
                .chain(chars.flat_map(char::to_lowercase))
                .collect(),
            None => String::new(),
        }
    }

    /// Description used when the group has to be created.
    #[must_use]
    pub fn description(&self) -> String {
        format!("Automatically synchronised group for {}", self.0)
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for GroupId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for GroupId {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<GroupId> for String {
    fn from(value: GroupId) -> Self {
        value.0
    }
}

/// Maps cohort codes onto group identifiers.
#[derive(Debug, Clone)]
pub struct GroupKeyDeriver {
    prefixes: Vec<String>,
    suffix: String,
    domain: String,
}

impl GroupKeyDeriver {
    /// Creates a deriver; prefixes, suffix and domain are lower-cased.
    #[must_use]
    pub fn new<I, S>(domain: &str, suffix: &str, prefixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|p| p.as_ref().trim().to_lowercase())
                .filter(|p| !p.is_empty())
                .collect(),
            suffix: suffix.trim().to_lowercase(),
            domain: domain.trim().to_lowercase(),
        }
    }

    /// Creates a deriver from the run configuration.
    #[must_use]
    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(&config.domain, &config.group_suffix, &config.cohort_prefixes)
    }

    /// Derives the group identifier for a cohort code.
    ///
    /// At most one recognised prefix is stripped, the first match in
    /// configuration order wins.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InvalidCohort`] when nothing is left of the cohort
    /// code after cleaning.
    pub fn derive(&self, cohort_code: &str) -> SyncResult<GroupId> {
        let lowered = cohort_code.trim().to_lowercase();

        let stripped = self
            .prefixes
            .iter()
            .find_map(|prefix| lowered.strip_prefix(prefix.as_str()))
            .unwrap_or(lowered.as_str());

        let cleaned: String = stripped.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(SyncError::invalid_cohort(cohort_code));
        }

        GroupId::parse(&format!("{cleaned}.{}@{}", self.suffix, self.domain))
    }

    /// The `.suffix@domain` tail shared by every managed group.
    #[must_use]
    pub fn convention_tail(&self) -> String {
        format!(".{}@{}", self.suffix, self.domain)
    }

    /// Whether a directory group follows the managed naming convention.
    #[must_use]
    pub fn matches_convention(&self, group_address: &str) -> bool {
        group_address
            .trim()
            .to_lowercase()
            .ends_with(&self.convention_tail())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deriver() -> GroupKeyDeriver {
        GroupKeyDeriver::new("deark.be", "ouders", ["arkls-", "arkks-"])
    }

    #[test]
    fn test_derive_primary_school_cohort() {
        let id = deriver().derive("ArkLS-1 blauw").unwrap();
        assert_eq!(id.as_str(), "1blauw.ouders@deark.be");
    }

    #[test]
    fn test_derive_kindergarten_cohort() {
        let id = deriver().derive("ArkKS-K1 Kikker").unwrap();
        assert_eq!(id.as_str(), "k1kikker.ouders@deark.be");
    }

    #[test]
    fn test_derive_without_prefix() {
        let id = deriver().derive("  Zorg Klas ").unwrap();
        assert_eq!(id.as_str(), "zorgklas.ouders@deark.be");
    }

    #[test]
    fn test_only_one_prefix_stripped() {
        let id = deriver().derive("ArkLS-ArkKS-3").unwrap();
        assert_eq!(id.as_str(), "arkks-3.ouders@deark.be");
    }

    #[test]
    fn test_derive_is_deterministic_and_case_insensitive() {
        let a = deriver().derive("ARKLS-2 GROEN").unwrap();
        let b = deriver().derive("arkls-2 groen").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_derive_rejects_empty_input() {
        assert!(matches!(
            deriver().derive("   "),
            Err(SyncError::InvalidCohort { .. })
        ));
        assert!(matches!(
            deriver().derive("ArkLS-"),
            Err(SyncError::InvalidCohort { .. })
        ));
    }

    #[test]
    fn test_matches_convention() {
        let deriver = deriver();
        assert!(deriver.matches_convention("1blauw.ouders@deark.be"));
        assert!(deriver.matches_convention("1Blauw.Ouders@DeArk.be"));
        assert!(!deriver.matches_convention("personeel@deark.be"));
        assert!(!deriver.matches_convention("1blauw.ouders@other.be"));
    }

    #[test]
    fn test_display_name() {
        let id = GroupId::parse("k1kikker.ouders@deark.be").unwrap();
        assert_eq!(id.display_name(), "K1kikker");

        let id = GroupId::parse("1blauw.ouders@deark.be").unwrap();
        assert_eq!(id.display_name(), "1blauw");
    }

    #[test]
    fn test_group_id_parse() {
        let id = GroupId::parse(" 1Blauw.Ouders@DeArk.be ").unwrap();
        assert_eq!(id.as_str(), "1blauw.ouders@deark.be");
        assert_eq!(id.local_part(), "1blauw.ouders");

        assert!(GroupId::parse("").is_err());
        assert!(GroupId::parse("no-at-sign").is_err());
        assert!(GroupId::parse("a b@deark.be").is_err());
    }
}
