//! Member addresses and provider-aware address normalization.

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Canonical consumer mail domain.
pub const PRIMARY_CONSUMER_DOMAIN: &str = "gmail.com";

/// Historical alias of [`PRIMARY_CONSUMER_DOMAIN`].
pub const ALIAS_CONSUMER_DOMAIN: &str = "googlemail.com";

/// Returns the canonical form of an address used for equivalence checks.
///
/// Consumer mail addresses ignore dots and `+tag` suffixes in the local part,
/// and the alias domain delivers to the same mailbox as the primary one. All
/// other addresses are only lower-cased. Input without an `@` is returned
/// lower-cased; normalization never fails.
#[must_use]
pub fn normalize(address: &str) -> String {
    let lowered = address.to_lowercase();

    let Some((local, domain)) = lowered.rsplit_once('@') else {
        return lowered;
    };

    if domain != PRIMARY_CONSUMER_DOMAIN && domain != ALIAS_CONSUMER_DOMAIN {
        return lowered;
    }

    let local = local.split_once('+').map_or(local, |(head, _)| head);
    let local: String = local.chars().filter(|c| *c != '.').collect();

    format!("{local}@{PRIMARY_CONSUMER_DOMAIN}")
}

/// A lower-cased member address in the raw form used for directory calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberAddress(String);

impl MemberAddress {
    /// Creates an address from raw input, trimming and lower-casing it.
    ///
    /// Returns `None` for blank input.
    #[must_use]
    pub fn new(raw: &str) -> Option<Self> {
        let cleaned = raw.trim().to_lowercase();
        if cleaned.is_empty() {
            None
        } else {
            Some(Self(cleaned))
        }
    }

    /// Returns the raw address.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the normalized form used for equivalence checks.
    #[must_use]
    pub fn normalized(&self) -> String {
        normalize(&self.0)
    }

    /// Whether two addresses reach the same mailbox.
    #[must_use]
    pub fn is_equivalent(&self, other: &MemberAddress) -> bool {
        self.0 == other.0 || self.normalized() == other.normalized()
    }
}

impl fmt::Display for MemberAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for MemberAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for MemberAddress {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Splits a comma-delimited address field into member addresses.
///
/// Pieces are trimmed and lower-cased; empty pieces are dropped.
pub fn split_addresses(raw: &str) -> impl Iterator<Item = MemberAddress> + '_ {
    raw.split(',').filter_map(MemberAddress::new)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dots_and_plus_tag_are_ignored_for_consumer_domain() {
        assert_eq!(normalize("a.b+tag@gmail.com"), "ab@gmail.com");
        assert_eq!(normalize("ab@gmail.com"), "ab@gmail.com");
        assert_eq!(normalize("a.b+tag@gmail.com"), normalize("ab@gmail.com"));
    }

    #[test]
    fn test_alias_domain_rewritten_to_primary() {
        assert_eq!(normalize("a.b@googlemail.com"), "ab@gmail.com");
        assert_eq!(normalize("A.B+Kids@GoogleMail.com"), "ab@gmail.com");
    }

    #[test]
    fn test_other_domains_only_case_folded() {
        assert_eq!(normalize("A.B@Example.com"), "a.b@example.com");
        assert_eq!(normalize("x+y@school.org"), "x+y@school.org");
    }

    #[test]
    fn test_plus_only_cut_at_first_occurrence() {
        assert_eq!(normalize("a+b+c@gmail.com"), "a@gmail.com");
    }

    #[test]
    fn test_trailing_dot_in_local_part() {
        assert_eq!(normalize("a.@gmail.com"), "a@gmail.com");
    }

    #[test]
    fn test_malformed_input_returned_unchanged() {
        assert_eq!(normalize("Not An Address"), "not an address");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_subdomain_of_consumer_domain_untouched() {
        assert_eq!(normalize("a.b@mail.gmail.com"), "a.b@mail.gmail.com");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for input in ["a.b+x@googlemail.com", "Q.R@school.org", "plain"] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn test_member_address_trims_and_lowercases() {
        let address = MemberAddress::new("  Jan.Peeters@Gmail.com ").unwrap();
        assert_eq!(address.as_str(), "jan.peeters@gmail.com");
        assert_eq!(address.normalized(), "janpeeters@gmail.com");
        assert!(MemberAddress::new("   ").is_none());
    }

    #[test]
    fn test_equivalence() {
        let a = MemberAddress::new("jan.peeters@gmail.com").unwrap();
        let b = MemberAddress::new("janpeeters+school@googlemail.com").unwrap();
        let c = MemberAddress::new("jan.peeters@school.org").unwrap();
        assert!(a.is_equivalent(&b));
        assert!(!a.is_equivalent(&c));
    }

    #[test]
    fn test_split_addresses() {
        let addresses: Vec<_> = split_addresses(" X@gmail.com, ,y@school.org,, ")
            .map(|a| a.to_string())
            .collect();
        assert_eq!(addresses, vec!["x@gmail.com", "y@school.org"]);
    }
}
