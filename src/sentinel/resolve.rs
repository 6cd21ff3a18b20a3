//! The master-resolution algorithm proper: attempt rounds over the tracked
//! sentinel list, first-candidate-wins selection, `ROLE` confirmation, and
//! the retry/timeout loop around all of it.

use crate::addr::{self, SentinelAddr, SentinelAddrList};
use crate::sentinel::config::{ConnOpts, SentinelOptions};
use crate::sentinel::conn::{ConnectionProvider, SentinelDescriptor};
use crate::sentinel::stats::{SentinelOutcome, SentinelStats};
use crate::{Error, Result};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// What one successful `resolve_master_addr` call produced.
pub struct ResolveOutcome {
    pub addr: SentinelAddr,
    pub reporting_sentinel: SentinelAddr,
    pub updated_sentinels: SentinelAddrList,
    pub rounds: u64,
    pub retries: u64,
    pub elapsed: Duration,
    pub stat_updates: Vec<(String, SentinelOutcome)>,
}

fn addr_key(addr: &SentinelAddr) -> String {
    format!("{addr}")
}

enum ConfirmOutcome {
    Master,
    NotMaster,
    Unreachable,
}

fn confirm_master(candidate: &SentinelAddr, conn_opts: &ConnOpts, provider: &dyn ConnectionProvider) -> ConfirmOutcome {
    let mut conn = match provider.connect(candidate, conn_opts) {
        Ok(conn) => conn,
        Err(_) => return ConfirmOutcome::Unreachable,
    };
    match conn.role() {
        Ok(role) if role.eq_ignore_ascii_case("master") => ConfirmOutcome::Master,
        Ok(_) => ConfirmOutcome::NotMaster,
        // A connection/parse failure mid-ROLE is not fatal to the overall
        // resolve call; it is indistinguishable from an honest demotion that
        // happened between `get-master-addr-by-name` and `ROLE`.
        Err(_) => ConfirmOutcome::Unreachable,
    }
}

struct RoundResult {
    confirmed: Option<(SentinelAddr, SentinelAddr)>,
    stat_updates: Vec<(String, SentinelOutcome)>,
    discovered_sentinels: Vec<SentinelAddr>,
}

/// Runs one attempt round: iterates `sentinels` in order, querying
/// `SENTINEL sentinels` from every visited address (when
/// `add_missing_sentinels` is set) regardless of that address's answer to
/// `get-master-addr-by-name`. The first non-ignorant, non-error master
/// reply ends the search for a candidate; it is confirmed with `ROLE`
/// immediately, and the round ends there either way — a failed
/// confirmation produces no candidate for the round rather than resuming
/// the scan for a different one.
fn attempt_round(
    master_name: &str,
    sentinels: &SentinelAddrList,
    options: &SentinelOptions,
    provider: &dyn ConnectionProvider,
) -> RoundResult {
    let mut stat_updates = Vec::new();
    let mut discovered_sentinels = Vec::new();

    for sentinel in sentinels {
        let mut conn = match provider.connect(sentinel, &options.conn_opts) {
            Ok(conn) => conn,
            Err(e) => {
                log::debug!("cannot connect to sentinel {sentinel}: {e}");
                stat_updates.push((addr_key(sentinel), SentinelOutcome::Unreachable));
                continue;
            }
        };

        if options.add_missing_sentinels {
            if let Ok(descriptors) = conn.sentinels(master_name) {
                discovered_sentinels.extend(descriptors_to_addrs(&descriptors));
            }
        }

        let reply = conn.get_master_addr_by_name(master_name);
        let candidate = match reply {
            Ok(Some((host, port))) => {
                stat_updates.push((addr_key(sentinel), SentinelOutcome::Ok));
                match SentinelAddr::parse(host, port) {
                    Ok(addr) => addr,
                    Err(_) => continue,
                }
            }
            Ok(None) => {
                log::debug!("sentinel {sentinel} does not know master `{master_name}`");
                stat_updates.push((addr_key(sentinel), SentinelOutcome::Ignorant));
                continue;
            }
            Err(e) => {
                log::debug!("sentinel {sentinel} failed `get-master-addr-by-name`: {e}");
                stat_updates.push((addr_key(sentinel), SentinelOutcome::Unreachable));
                continue;
            }
        };

        // The first usable reply ends the round, confirmed or not.
        return match confirm_master(&candidate, &options.conn_opts, provider) {
            ConfirmOutcome::Master => {
                log::debug!("sentinel {sentinel} reports master `{master_name}` at {candidate}, confirmed via ROLE");
                RoundResult {
                    confirmed: Some((candidate, sentinel.clone())),
                    stat_updates,
                    discovered_sentinels,
                }
            }
            ConfirmOutcome::NotMaster => {
                log::warn!("candidate master {candidate} reported by {sentinel} failed ROLE confirmation");
                stat_updates.push((addr_key(&candidate), SentinelOutcome::Misidentified));
                RoundResult {
                    confirmed: None,
                    stat_updates,
                    discovered_sentinels,
                }
            }
            ConfirmOutcome::Unreachable => {
                stat_updates.push((addr_key(&candidate), SentinelOutcome::Unreachable));
                RoundResult {
                    confirmed: None,
                    stat_updates,
                    discovered_sentinels,
                }
            }
        };
    }

    RoundResult {
        confirmed: None,
        stat_updates,
        discovered_sentinels,
    }
}

fn descriptors_to_addrs(descriptors: &[SentinelDescriptor]) -> Vec<SentinelAddr> {
    descriptors
        .iter()
        .filter_map(|d| {
            let ip = d.ip.clone()?;
            let port = d.port.clone()?;
            SentinelAddr::parse(ip, port).ok()
        })
        .collect()
}

/// Runs the full retry loop for one `master_name`. `sentinels` must already
/// be non-empty — the caller (`SentinelSpec::resolve_master_addr`) is
/// responsible for `Error::NoSentinelAddrsInSpec`.
pub fn resolve_master_addr(
    master_name: &str,
    sentinels: &SentinelAddrList,
    options: &SentinelOptions,
    provider: &dyn ConnectionProvider,
) -> Result<ResolveOutcome> {
    let t0 = Instant::now();
    let mut rounds: u64 = 0;
    let mut retries: u64 = 0;
    let mut working_list = sentinels.clone();
    let mut cumulative: HashMap<String, SentinelStats> = HashMap::new();
    let mut all_stat_updates = Vec::new();

    loop {
        rounds += 1;
        let round = attempt_round(master_name, &working_list, options, provider);

        for (key, outcome) in &round.stat_updates {
            let entry = cumulative.entry(key.clone()).or_default();
            *entry = entry.bump(*outcome);
        }
        all_stat_updates.extend(round.stat_updates);

        if !round.discovered_sentinels.is_empty() {
            working_list = addr::add_back(&working_list, round.discovered_sentinels);
        }

        if let Some((candidate, reporting)) = round.confirmed {
            working_list = addr::add_front(&working_list, reporting.clone());
            return Ok(ResolveOutcome {
                addr: candidate,
                reporting_sentinel: reporting,
                updated_sentinels: working_list,
                rounds,
                retries,
                elapsed: t0.elapsed(),
                stat_updates: all_stat_updates,
            });
        }

        let elapsed = t0.elapsed();
        if elapsed >= options.resolve_timeout {
            log::warn!(
                "resolution of master `{master_name}` timed out after {elapsed:?} across {rounds} round(s)"
            );
            let sentinel_errors = cumulative
                .into_iter()
                .map(|(addr, s)| (addr, s.n_ok, s.n_ignorant, s.n_unreachable, s.n_misidentified))
                .collect();
            return Err(Error::ResolveTimeout(crate::error::ResolveTimeoutData {
                master_name: master_name.to_owned(),
                elapsed,
                attempts: rounds as usize,
                retries: retries as usize,
                sentinel_errors,
            }));
        }

        retries += 1;
        std::thread::sleep(options.retry_delay.min(options.resolve_timeout.saturating_sub(elapsed)));
    }
}
