//! Roster records and their aggregation into desired group membership.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::address::split_addresses;
use crate::config::{SyncConfig, STUDENT_RECORD_TYPE};
use crate::group_key::GroupKeyDeriver;
use crate::membership::MembershipMap;

/// One entry of the roster snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RosterRecord {
    /// Record type tag, `LLN` for pupils.
    #[serde(rename = "TYPE", default)]
    pub record_type: String,
    /// Class code of the pupil.
    #[serde(rename = "KLASCODE", default)]
    pub cohort_code: String,
    /// Comma-delimited contact addresses.
    #[serde(rename = "MAILADRESSEN", default)]
    pub raw_addresses: String,
}

impl RosterRecord {
    /// Creates a record.
    pub fn new(
        record_type: impl Into<String>,
        cohort_code: impl Into<String>,
        raw_addresses: impl Into<String>,
    ) -> Self {
        Self {
            record_type: record_type.into(),
            cohort_code: cohort_code.into(),
            raw_addresses: raw_addresses.into(),
        }
    }

    /// Whether the record type marks a pupil.
    #[must_use]
    pub fn is_student(&self) -> bool {
        self.record_type.trim().to_lowercase() == STUDENT_RECORD_TYPE
    }
}

/// Counters collected while aggregating a roster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AggregationStats {
    /// Records in the snapshot.
    pub records: usize,
    /// Records that passed the type check.
    pub qualifying: usize,
    /// Qualifying records outside the test filter.
    pub filtered_out: usize,
    /// Qualifying records without cohort or addresses.
    pub incomplete: usize,
    /// Records whose cohort code could not be derived.
    pub invalid_cohort: usize,
    /// Groups in the resulting map.
    pub groups: usize,
    /// Memberships in the resulting map.
    pub memberships: usize,
}

/// Result of aggregating a roster.
#[derive(Debug, Clone)]
pub struct Aggregation {
    /// Desired group membership.
    pub desired: MembershipMap,
    /// Aggregation counters.
    pub stats: AggregationStats,
}

/// Folds roster records into the desired membership map.
#[derive(Debug, Clone)]
pub struct RosterAggregator {
    deriver: GroupKeyDeriver,
    exception_cohort: Option<String>,
    test_filter: Option<String>,
}

impl RosterAggregator {
    /// Creates an aggregator from the run configuration.
    #[must_use]
    pub fn new(config: &SyncConfig) -> Self {
        Self {
            deriver: GroupKeyDeriver::from_config(config),
            exception_cohort: config.exception_cohort.clone(),
            test_filter: config
                .test_filter
                .as_ref()
                .map(|f| f.trim().to_string()),
        }
    }

    /// Whether a record takes part in the sync at all.
    #[must_use]
    pub fn qualifies(&self, record: &RosterRecord) -> bool {
        record.is_student()
            || self
                .exception_cohort
                .as_deref()
                .is_some_and(|cohort| record.cohort_code == cohort)
    }

    /// Builds the desired membership map.
    ///
    /// A record whose address field yields no address contributes nothing and
    /// creates no group entry.
    pub fn aggregate(&self, records: &[RosterRecord]) -> Aggregation {
        let mut stats = AggregationStats {
            records: records.len(),
            ..Default::default()
        };
        let mut builder = MembershipMap::builder();

        for record in records {
            if !self.qualifies(record) {
                continue;
            }
            stats.qualifying += 1;

            if let Some(filter) = &self.test_filter {
                if record.cohort_code.trim() != filter.as_str() {
                    stats.filtered_out += 1;
                    continue;
                }
            }

            if record.cohort_code.is_empty() || record.raw_addresses.is_empty() {
                stats.incomplete += 1;
                continue;
            }

            let group = match self.deriver.derive(&record.cohort_code) {
                Ok(group) => group,
                Err(e) => {
                    warn!(cohort = %record.cohort_code, error = %e, "Skipping roster record");
                    stats.invalid_cohort += 1;
                    continue;
                }
            };

            let addresses: Vec<_> = split_addresses(&record.raw_addresses).collect();
            if addresses.is_empty() {
                stats.incomplete += 1;
                continue;
            }

            debug!(cohort = %record.cohort_code, group = %group, "Aggregating roster record");
            builder.extend(group, addresses);
        }

        let desired = builder.build();
        stats.groups = desired.len();
        stats.memberships = desired.total_members();

        info!(
            records = stats.records,
            qualifying = stats.qualifying,
            filtered_out = stats.filtered_out,
            incomplete = stats.incomplete,
            invalid_cohort = stats.invalid_cohort,
            groups = stats.groups,
            memberships = stats.memberships,
            "Roster aggregated"
        );

        Aggregation { desired, stats }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group_key::GroupId;

    fn config() -> SyncConfig {
        SyncConfig::builder().domain("deark.be").build().unwrap()
    }

    fn group(name: &str) -> GroupId {
        GroupId::parse(name).unwrap()
    }

    fn members(map: &MembershipMap, name: &str) -> Vec<String> {
        map.get(&group(name))
            .map(|set| set.iter().map(ToString::to_string).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_record_deserializes_from_roster_json() {
        let json = serde_json::json!([
            {"TYPE": "LLN", "KLASCODE": "ArkLS-1 blauw", "MAILADRESSEN": "a@x.be"},
            {"KLASCODE": "ArkLS-2 groen"}
        ]);
        let records: Vec<RosterRecord> = serde_json::from_value(json).unwrap();
        assert_eq!(records[0].record_type, "LLN");
        assert_eq!(records[1].record_type, "");
        assert_eq!(records[1].raw_addresses, "");
    }

    #[test]
    fn test_student_type_is_trimmed_and_case_insensitive() {
        assert!(RosterRecord::new(" Lln ", "x", "y").is_student());
        assert!(!RosterRecord::new("PERS", "x", "y").is_student());
    }

    #[test]
    fn test_aggregate_unions_addresses_per_group() {
        let records = vec![
            RosterRecord::new("LLN", "ArkLS-2 groen", "x@gmail.com, Y@school.org"),
            RosterRecord::new("LLN", "ArkLS-2 groen", "y@school.org"),
        ];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert_eq!(
            members(&aggregation.desired, "2groen.ouders@deark.be"),
            vec!["x@gmail.com", "y@school.org"]
        );
        assert_eq!(aggregation.stats.groups, 1);
        assert_eq!(aggregation.stats.memberships, 2);
    }

    #[test]
    fn test_non_students_are_ignored() {
        let records = vec![RosterRecord::new("PERS", "ArkLS-1 blauw", "t@deark.be")];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert!(aggregation.desired.is_empty());
        assert_eq!(aggregation.stats.qualifying, 0);
    }

    #[test]
    fn test_exception_cohort_included_regardless_of_type() {
        let records = vec![
            RosterRecord::new("", "ArkKS-K1 Kikker", "k@gmail.com"),
            RosterRecord::new("???", "ArkKS-K1 Kikker", "l@gmail.com"),
        ];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert_eq!(
            members(&aggregation.desired, "k1kikker.ouders@deark.be"),
            vec!["k@gmail.com", "l@gmail.com"]
        );
    }

    #[test]
    fn test_exception_cohort_requires_exact_match() {
        let records = vec![RosterRecord::new("", "arkks-k1 kikker", "k@gmail.com")];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);
        assert!(aggregation.desired.is_empty());
    }

    #[test]
    fn test_exception_cohort_can_be_disabled() {
        let config = SyncConfig::builder()
            .domain("deark.be")
            .exception_cohort(None)
            .build()
            .unwrap();
        let records = vec![RosterRecord::new("", "ArkKS-K1 Kikker", "k@gmail.com")];
        assert!(RosterAggregator::new(&config)
            .aggregate(&records)
            .desired
            .is_empty());
    }

    #[test]
    fn test_incomplete_records_are_skipped() {
        let records = vec![
            RosterRecord::new("LLN", "", "a@x.be"),
            RosterRecord::new("LLN", "ArkLS-1 blauw", ""),
        ];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert!(aggregation.desired.is_empty());
        assert_eq!(aggregation.stats.incomplete, 2);
    }

    #[test]
    fn test_blank_address_pieces_create_no_entry() {
        let records = vec![RosterRecord::new("LLN", "ArkLS-1 blauw", " , ")];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert!(!aggregation
            .desired
            .contains_group(&group("1blauw.ouders@deark.be")));
        assert_eq!(aggregation.stats.incomplete, 1);
    }

    #[test]
    fn test_test_filter_scopes_to_one_cohort() {
        let config = SyncConfig::builder()
            .domain("deark.be")
            .test_filter(Some(" ArkLS-1 blauw ".into()))
            .build()
            .unwrap();
        let records = vec![
            RosterRecord::new("LLN", "ArkLS-1 blauw ", "a@x.be"),
            RosterRecord::new("LLN", "ArkLS-2 groen", "b@x.be"),
        ];
        let aggregation = RosterAggregator::new(&config).aggregate(&records);

        assert_eq!(aggregation.desired.len(), 1);
        assert!(aggregation
            .desired
            .contains_group(&group("1blauw.ouders@deark.be")));
        assert_eq!(aggregation.stats.filtered_out, 1);
    }

    #[test]
    fn test_invalid_cohort_is_skipped() {
        let records = vec![
            RosterRecord::new("LLN", "ArkLS-", "a@x.be"),
            RosterRecord::new("LLN", "ArkLS-3", "b@x.be"),
        ];
        let aggregation = RosterAggregator::new(&config()).aggregate(&records);

        assert_eq!(aggregation.stats.invalid_cohort, 1);
        assert_eq!(aggregation.desired.len(), 1);
    }
}
