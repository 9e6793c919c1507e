// Copyright (c) 2025 - Cowboy AI, Inc.
//! Pure Validation Functions - Address Invariants
//!
//! Syntactic checks used by [`Address`](super::Address) and by the importer
//! when it reads the server address from the command line.
//!
//! All functions are total: malformed input yields `false` (or `None`),
//! never a panic or an error.

use ipnetwork::Ipv4Network;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Prefix length used for every block and network the importer creates
pub const DEFAULT_PREFIX: u8 = 24;

/// Minimum number of dot-separated labels a hostname needs to pass
/// [`is_valid_fqdn`]
pub const MIN_FQDN_LABELS: usize = 3;

/// Check that `s` is a dotted-quad IPv4 address
///
/// # Rules
/// - Exactly four decimal octets, each 0-255
/// - No surrounding whitespace, signs, or trailing garbage
pub fn is_valid_ipv4(s: &str) -> bool {
    parse_ipv4(s).is_some()
}

/// Check that `s` is `<ipv4>/<prefix>` with a prefix length in `0..=32`
///
/// Host bits in the network part are tolerated; membership is decided by
/// masking in [`is_member_of_subnet`].
pub fn is_valid_subnet(s: &str) -> bool {
    parse_subnet(s).is_some()
}

/// CIDR containment test: `ip & mask == network & mask`
///
/// Returns `false` when either side fails to parse.
pub fn is_member_of_subnet(ip: &str, subnet: &str) -> bool {
    match (parse_ipv4(ip), parse_subnet(subnet)) {
        (Some(ip), Some(network)) => network.contains(ip),
        _ => false,
    }
}

/// Minimal FQDN shape check: at least three non-empty dot-separated labels
///
/// Deliberately weak. It does not check label characters or lengths, it only
/// rejects names that are obviously not fully qualified (`host`, `host.lan`).
pub fn is_valid_fqdn(s: &str) -> bool {
    s.split('.').filter(|label| !label.is_empty()).count() >= MIN_FQDN_LABELS
}

/// Server addresses may be given either as an IPv4 address or a FQDN
pub fn is_valid_host(s: &str) -> bool {
    is_valid_ipv4(s) || is_valid_fqdn(s)
}

/// The `/24` containing `ip`, built from its first three octets
/// (`a.b.c.d` → `a.b.c.0/24`)
///
/// Purely textual: the result still has to pass [`is_valid_subnet`].
/// Returns `None` when `ip` has no dot at all.
pub fn default_subnet(ip: &str) -> Option<String> {
    ip.rsplit_once('.')
        .map(|(head, _)| format!("{}.0/{}", head, DEFAULT_PREFIX))
}

pub(crate) fn parse_ipv4(s: &str) -> Option<Ipv4Addr> {
    Ipv4Addr::from_str(s).ok()
}

pub(crate) fn parse_subnet(s: &str) -> Option<Ipv4Network> {
    let (network, prefix) = s.split_once('/')?;

    // u8::from_str accepts a leading '+', CIDR notation does not
    if prefix.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let prefix = prefix.parse::<u8>().ok()?;

    Ipv4Network::new(parse_ipv4(network)?, prefix).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("255.255.255.255" ; "broadcast")]
    #[test_case("1.1.1.1" ; "plain")]
    #[test_case("30.25.255.10" ; "mixed octets")]
    #[test_case("0.0.0.0" ; "unspecified")]
    fn test_valid_ipv4(ip: &str) {
        assert!(is_valid_ipv4(ip));
    }

    #[test_case("0.0.0.256" ; "octet overflow")]
    #[test_case("-1.1.1.1" ; "negative octet")]
    #[test_case("1.1.1.1.1" ; "five octets")]
    #[test_case("1000.80.10.2" ; "four digit octet")]
    #[test_case("" ; "empty")]
    #[test_case(" 1.1.1.1" ; "leading whitespace")]
    #[test_case("1.1.1" ; "three octets")]
    #[test_case("Not Listed" ; "placeholder")]
    fn test_invalid_ipv4(ip: &str) {
        assert!(!is_valid_ipv4(ip));
    }

    #[test_case("255.255.255.0/24")]
    #[test_case("1.1.1.0/31")]
    #[test_case("30.25.255.0/28")]
    #[test_case("0.0.0.0/32")]
    #[test_case("0.0.0.0/0")]
    fn test_valid_subnet(subnet: &str) {
        assert!(is_valid_subnet(subnet));
    }

    #[test_case("10.0.0.0" ; "missing prefix")]
    #[test_case("10.0.0.0/33" ; "prefix too long")]
    #[test_case("10.0.0.0/" ; "empty prefix")]
    #[test_case("10.0.0.0/+24" ; "signed prefix")]
    #[test_case("10.0.0.0/24/8" ; "extra part")]
    #[test_case("10.0.0/24" ; "short network")]
    #[test_case("1.1.1.1.0/24" ; "network from five octet ip")]
    fn test_invalid_subnet(subnet: &str) {
        assert!(!is_valid_subnet(subnet));
    }

    #[test_case("255.255.255.255", "255.255.255.0/24")]
    #[test_case("1.1.1.1", "1.1.1.0/31")]
    #[test_case("30.25.255.10", "30.25.255.0/28")]
    #[test_case("0.0.0.0", "0.0.0.0/32")]
    #[test_case("10.1.2.3", "10.1.2.99/24" ; "host bits in network")]
    fn test_member_of_subnet(ip: &str, subnet: &str) {
        assert!(is_member_of_subnet(ip, subnet));
    }

    #[test]
    fn test_not_member_of_subnet() {
        assert!(!is_member_of_subnet("1.1.1.2", "1.1.1.0/31"));
        assert!(!is_member_of_subnet("10.0.1.1", "10.0.0.0/24"));
        assert!(!is_member_of_subnet("garbage", "10.0.0.0/24"));
        assert!(!is_member_of_subnet("10.0.0.1", "garbage"));
    }

    #[test]
    fn test_fqdn_label_count() {
        assert!(is_valid_fqdn("web01.example.com"));
        assert!(is_valid_fqdn("a.b.c.d"));
        assert!(!is_valid_fqdn("example.com"));
        assert!(!is_valid_fqdn("localhost"));
        assert!(!is_valid_fqdn("a..b"));
        assert!(!is_valid_fqdn(""));
    }

    #[test]
    fn test_default_subnet() {
        assert_eq!(default_subnet("10.0.0.5").as_deref(), Some("10.0.0.0/24"));
        assert_eq!(default_subnet("1.1.1.1.1").as_deref(), Some("1.1.1.1.0/24"));
        assert_eq!(default_subnet("nodots"), None);
    }

    #[test]
    fn test_valid_host() {
        assert!(is_valid_host("10.255.255.50"));
        assert!(is_valid_host("bam.corp.example"));
        assert!(!is_valid_host("bam"));
    }
}
