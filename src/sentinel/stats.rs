//! Resolve/sentinel counters. Pure value types updated via `ArcSwap::rcu`
//! from `sentinel::spec::SentinelSpec`, using a snapshot-and-replace
//! approach rather than interior atomics per field.

use std::collections::HashMap;
use std::time::Duration;

/// Cumulative outcome counters for one `(sentinel_addr)` observed while
/// resolving any master.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SentinelStats {
    pub n_ok: u64,
    pub n_ignorant: u64,
    pub n_unreachable: u64,
    pub n_misidentified: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SentinelOutcome {
    Ok,
    Ignorant,
    Unreachable,
    Misidentified,
}

impl SentinelStats {
    pub fn bump(self, outcome: SentinelOutcome) -> SentinelStats {
        let mut next = self;
        match outcome {
            SentinelOutcome::Ok => next.n_ok += 1,
            SentinelOutcome::Ignorant => next.n_ignorant += 1,
            SentinelOutcome::Unreachable => next.n_unreachable += 1,
            SentinelOutcome::Misidentified => next.n_misidentified += 1,
        }
        next
    }
}

pub type SentinelStatsMap = HashMap<String, SentinelStats>;

/// Returns a copy of `map` with `outcome` recorded against `addr_key`.
pub fn record_sentinel_outcome(map: &SentinelStatsMap, addr_key: &str, outcome: SentinelOutcome) -> SentinelStatsMap {
    let mut next = map.clone();
    let entry = next.entry(addr_key.to_owned()).or_default();
    *entry = entry.bump(outcome);
    next
}

/// Cumulative resolution-level counters for one master name.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ResolveStats {
    pub n_calls: u64,
    pub n_success: u64,
    pub n_timeout: u64,
    pub n_rounds: u64,
    pub n_retries: u64,
    /// Incremented only when `reset_master_addr` actually changes the
    /// cached address, not on every successful resolution.
    pub n_changes: u64,
    pub last_elapsed: Option<Duration>,
}

pub type ResolveStatsMap = HashMap<String, ResolveStats>;

pub fn record_success(map: &ResolveStatsMap, master_name: &str, rounds: u64, retries: u64, elapsed: Duration) -> ResolveStatsMap {
    let mut next = map.clone();
    let entry = next.entry(master_name.to_owned()).or_default();
    entry.n_calls += 1;
    entry.n_success += 1;
    entry.n_rounds += rounds;
    entry.n_retries += retries;
    entry.last_elapsed = Some(elapsed);
    next
}

pub fn record_timeout(map: &ResolveStatsMap, master_name: &str, rounds: u64, retries: u64, elapsed: Duration) -> ResolveStatsMap {
    let mut next = map.clone();
    let entry = next.entry(master_name.to_owned()).or_default();
    entry.n_calls += 1;
    entry.n_timeout += 1;
    entry.n_rounds += rounds;
    entry.n_retries += retries;
    entry.last_elapsed = Some(elapsed);
    next
}
