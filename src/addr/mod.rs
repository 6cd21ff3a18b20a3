//! Sentinel address parsing, normalization, and list bookkeeping.
//!
//! Pure, value-level functions: no I/O, no locking. `sentinel::SentinelSpec`
//! is the only place these are wired into mutable, observed state.

use std::collections::HashMap;
use std::fmt;

/// A `(host, port)` pair, optionally carrying descriptive metadata (e.g. a
/// reporting sentinel's name) that is preserved across transformations but
/// excluded from equality.
///
/// IPv6 literals are accepted as an opaque host string; this type does not
/// validate IP syntax.
#[derive(Debug, Clone)]
pub struct SentinelAddr {
    pub host: String,
    pub port: u16,
    pub meta: Option<String>,
}

impl SentinelAddr {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        SentinelAddr {
            host: host.into(),
            port,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    /// Parses `(host, port)` where `port` may already be an integer or a
    /// decimal string; both forms must compare equal once parsed.
    pub fn parse(host: impl Into<String>, port: impl ParsePort) -> Result<Self, ParsePortError> {
        Ok(SentinelAddr::new(host, port.parse_port()?))
    }
}

impl PartialEq for SentinelAddr {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.port == other.port
    }
}
impl Eq for SentinelAddr {}

impl fmt::Display for SentinelAddr {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// A port that may arrive as a native integer or a decimal string.
pub trait ParsePort {
    fn parse_port(self) -> Result<u16, ParsePortError>;
}

impl ParsePort for u16 {
    fn parse_port(self) -> Result<u16, ParsePortError> {
        Ok(self)
    }
}

impl ParsePort for &str {
    fn parse_port(self) -> Result<u16, ParsePortError> {
        self.parse::<u16>().map_err(|_| ParsePortError(self.to_owned()))
    }
}

impl ParsePort for String {
    fn parse_port(self) -> Result<u16, ParsePortError> {
        self.as_str().to_owned().parse::<u16>().map_err(|_| ParsePortError(self))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsePortError(pub String);

impl fmt::Display for ParsePortError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid port: `{}`", self.0)
    }
}
impl std::error::Error for ParsePortError {}

/// An ordered, duplicate-free sequence of sentinel addresses. The first
/// entry is the preferred sentinel to try.
pub type SentinelAddrList = Vec<SentinelAddr>;

/// Master name → sentinel address list.
pub type SentinelAddrMap = HashMap<String, SentinelAddrList>;

/// Appends each of `addrs` not already present in `list`, preserving input
/// order and first-occurrence metadata.
pub fn add_back(list: &SentinelAddrList, addrs: impl IntoIterator<Item = SentinelAddr>) -> SentinelAddrList {
    let mut result = list.clone();
    for addr in addrs {
        if !result.contains(&addr) {
            result.push(addr);
        }
    }
    result
}

/// Ensures `addr` is the first element of the returned list. If it already
/// is, returns `list` unchanged (by value; no reallocation-free fast path is
/// promised, only behavioral equivalence). Otherwise removes any prior
/// occurrence and prepends, preserving its metadata if `addr` itself carries
/// none.
pub fn add_front(list: &SentinelAddrList, addr: SentinelAddr) -> SentinelAddrList {
    if list.first() == Some(&addr) {
        return list.clone();
    }
    let mut result: SentinelAddrList = list.iter().filter(|a| **a != addr).cloned().collect();
    result.insert(0, addr);
    result
}

/// Drops all occurrences of `addr` from `list`.
pub fn remove(list: &SentinelAddrList, addr: &SentinelAddr) -> SentinelAddrList {
    list.iter().filter(|a| *a != addr).cloned().collect()
}

/// Normalizes every key to its already-qualified string form (a no-op for
/// this crate's plain `String` keys; kept for symmetry with the qualified
/// master-name handling the resolver performs elsewhere) and deduplicates
/// every value list while preserving first-occurrence metadata.
pub fn clean(map: &SentinelAddrMap) -> SentinelAddrMap {
    map.iter()
        .map(|(name, list)| (name.clone(), dedup_preserving_first(list)))
        .collect()
}

fn dedup_preserving_first(list: &SentinelAddrList) -> SentinelAddrList {
    let mut result = SentinelAddrList::new();
    for addr in list {
        if !result.contains(addr) {
            result.push(addr.clone());
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(host: &str, port: u16) -> SentinelAddr {
        SentinelAddr::new(host, port)
    }

    #[test]
    fn port_string_and_integer_forms_compare_equal() {
        let from_int = SentinelAddr::parse("ip1", 1_u16).unwrap();
        let from_str = SentinelAddr::parse("ip1", "1").unwrap();
        assert_eq!(from_int, from_str);
    }

    #[test]
    fn address_utility_scenario() {
        let list: SentinelAddrList = vec![];
        let list = add_back(
            &list,
            vec![
                SentinelAddr::parse("ip1", 1_u16).unwrap(),
                SentinelAddr::parse("ip2", "2").unwrap(),
                SentinelAddr::parse("ip3", 3_u16).unwrap(),
            ],
        );
        let list = add_front(&list, SentinelAddr::parse("ip2", 2_u16).unwrap());
        let list = add_back(
            &list,
            vec![
                SentinelAddr::parse("ip3", 3_u16).unwrap(),
                SentinelAddr::parse("ip6", 6_u16).unwrap(),
            ],
        );

        assert_eq!(
            list,
            vec![addr("ip2", 2), addr("ip1", 1), addr("ip3", 3), addr("ip6", 6)]
        );
    }

    #[test]
    fn add_front_on_existing_head_is_unchanged() {
        let list = vec![addr("ip1", 1), addr("ip2", 2)];
        assert_eq!(add_front(&list, addr("ip1", 1)), list);
    }

    #[test]
    fn add_back_never_introduces_duplicates() {
        let list = vec![addr("ip1", 1)];
        let list = add_back(&list, vec![addr("ip1", 1), addr("ip2", 2), addr("ip1", 1)]);
        assert_eq!(list, vec![addr("ip1", 1), addr("ip2", 2)]);
    }

    #[test]
    fn remove_drops_all_occurrences() {
        let list = vec![addr("ip1", 1), addr("ip2", 2), addr("ip1", 1)];
        assert_eq!(remove(&list, &addr("ip1", 1)), vec![addr("ip2", 2)]);
    }

    #[test]
    fn clean_dedups_each_value_list() {
        let mut map = SentinelAddrMap::new();
        map.insert(
            "myservice".to_owned(),
            vec![addr("ip1", 1), addr("ip1", 1), addr("ip2", 2)],
        );
        let cleaned = clean(&map);
        assert_eq!(cleaned["myservice"], vec![addr("ip1", 1), addr("ip2", 2)]);
    }
}
