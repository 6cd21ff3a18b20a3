//! `SentinelSpec`: the resolver entity. Four independently mutated cells —
//! tracked sentinel addresses, last-resolved master addresses, resolve
//! stats, sentinel stats — each held behind an `ArcSwap` and updated via
//! `rcu`, a lock-free compare-and-swap model chosen so concurrent resolvers
//! contend only on the cell swap, never on a lock.

use crate::addr::{self, SentinelAddr, SentinelAddrList, SentinelAddrMap};
use crate::sentinel::callbacks::{Callbacks, Handler, ResolveErrorDetail, ResolveEvent};
use crate::sentinel::config::SentinelOptions;
use crate::sentinel::conn::ConnectionProvider;
use crate::sentinel::resolve;
use crate::sentinel::stats::{ResolveStats, ResolveStatsMap, SentinelStatsMap};
use crate::{Error, Result};
use arc_swap::ArcSwap;
use std::collections::HashMap;
use std::sync::Arc;

/// Master name → last confirmed address, cached so a plain `get_master_addr`
/// read never performs I/O.
type ResolvedAddrMap = HashMap<String, SentinelAddr>;

pub struct SentinelSpec {
    sentinel_addrs: ArcSwap<SentinelAddrMap>,
    resolved_addrs: ArcSwap<ResolvedAddrMap>,
    resolve_stats: ArcSwap<ResolveStatsMap>,
    sentinel_stats: ArcSwap<SentinelStatsMap>,
    options: SentinelOptions,
    provider: Arc<dyn ConnectionProvider + Send + Sync>,
    callbacks: Callbacks,
}

impl SentinelSpec {
    pub fn new(
        initial: SentinelAddrMap,
        options: SentinelOptions,
        provider: Arc<dyn ConnectionProvider + Send + Sync>,
    ) -> Self {
        SentinelSpec {
            sentinel_addrs: ArcSwap::from_pointee(addr::clean(&initial)),
            resolved_addrs: ArcSwap::from_pointee(ResolvedAddrMap::new()),
            resolve_stats: ArcSwap::from_pointee(ResolveStatsMap::new()),
            sentinel_stats: ArcSwap::from_pointee(SentinelStatsMap::new()),
            options,
            provider,
            callbacks: Callbacks::new(),
        }
    }

    pub fn register_callback(&mut self, handler: Handler) {
        self.callbacks.register(handler);
    }

    /// Read-only snapshot of the tracked sentinel list for one master. No I/O.
    pub fn get_sentinel_addrs(&self, master_name: &str) -> SentinelAddrList {
        self.sentinel_addrs
            .load()
            .get(master_name)
            .cloned()
            .unwrap_or_default()
    }

    /// Read-only snapshot of every tracked master's sentinel list. No I/O.
    pub fn get_all_sentinel_addrs(&self) -> SentinelAddrMap {
        (**self.sentinel_addrs.load()).clone()
    }

    /// The last confirmed master address for `master_name`, or `None` if it
    /// has never been resolved. Never performs I/O; call
    /// [`SentinelSpec::resolve_master_addr`] to actually contact Sentinels.
    pub fn get_master_addr(&self, master_name: &str) -> Option<SentinelAddr> {
        self.resolved_addrs.load().get(master_name).cloned()
    }

    pub fn resolve_stats(&self, master_name: &str) -> ResolveStats {
        self.resolve_stats.load().get(master_name).copied().unwrap_or_default()
    }

    pub fn sentinel_stats_snapshot(&self) -> SentinelStatsMap {
        (**self.sentinel_stats.load()).clone()
    }

    pub fn add_back(&self, master_name: &str, addrs: impl IntoIterator<Item = SentinelAddr>) {
        let addrs: Vec<_> = addrs.into_iter().collect();
        let previous = self.get_sentinel_addrs(master_name);
        self.sentinel_addrs.rcu(|map| {
            let mut next = (**map).clone();
            let entry = next.entry(master_name.to_owned()).or_default();
            *entry = addr::add_back(entry, addrs.clone());
            next
        });
        self.dispatch_addrs_change_if_changed(master_name, previous);
    }

    pub fn add_front(&self, master_name: &str, new_head: SentinelAddr) {
        let previous = self.get_sentinel_addrs(master_name);
        self.sentinel_addrs.rcu(|map| {
            let mut next = (**map).clone();
            let entry = next.entry(master_name.to_owned()).or_default();
            *entry = addr::add_front(entry, new_head.clone());
            next
        });
        self.dispatch_addrs_change_if_changed(master_name, previous);
    }

    pub fn remove(&self, master_name: &str, target: &SentinelAddr) {
        let previous = self.get_sentinel_addrs(master_name);
        self.sentinel_addrs.rcu(|map| {
            let mut next = (**map).clone();
            if let Some(entry) = next.get_mut(master_name) {
                *entry = addr::remove(entry, target);
            }
            next
        });
        self.dispatch_addrs_change_if_changed(master_name, previous);
    }

    /// Compares `previous` against the sentinel list now on file for
    /// `master_name` and fires `ResolveEvent::AddrsChange` only if they
    /// differ.
    fn dispatch_addrs_change_if_changed(&self, master_name: &str, previous: SentinelAddrList) {
        let current = self.get_sentinel_addrs(master_name);
        if current != previous {
            self.callbacks.dispatch(
                &ResolveEvent::AddrsChange {
                    master_name: master_name.to_owned(),
                    previous,
                    current,
                },
                None,
            );
        }
    }

    /// Replaces the resolved master address for `master_name` with `addr`.
    /// Fires `on-resolve-change` and increments `n_changes` only when the
    /// value actually differs from what was cached before; returns whether
    /// it changed. This is the only way the resolved address map is
    /// mutated — `resolve_master_addr`'s success path calls it internally,
    /// and callers may call it directly (e.g. to force a known address
    /// without resolving, or to clear/override a stale entry).
    pub fn reset_master_addr(&self, master_name: &str, addr: SentinelAddr) -> bool {
        self.reset_master_addr_with_handler(master_name, addr, None)
    }

    /// Resolves the current master address for `master_name`, merging
    /// `request_opts` over this spec's own options (request ∘ spec ∘
    /// process-default — the process-default layer lives in
    /// `SentinelOptions::default()`).
    pub fn resolve_master_addr(
        &self,
        master_name: &str,
        request_opts: Option<&SentinelOptions>,
        per_call_handler: Option<&Handler>,
    ) -> Result<SentinelAddr> {
        let options = match request_opts {
            Some(r) => r.merge_over(&self.options),
            None => self.options.clone(),
        };

        let sentinels = self.get_sentinel_addrs(master_name);
        if sentinels.is_empty() {
            self.callbacks.dispatch(
                &ResolveEvent::Error {
                    master_name: master_name.to_owned(),
                    detail: ResolveErrorDetail::NoSentinelAddrs,
                },
                per_call_handler,
            );
            return Err(Error::NoSentinelAddrsInSpec {
                master_name: master_name.to_owned(),
            });
        }

        match resolve::resolve_master_addr(master_name, &sentinels, &options, self.provider.as_ref()) {
            Ok(outcome) => {
                self.apply_stat_updates(&outcome.stat_updates);
                self.resolve_stats.rcu(|map| {
                    crate::sentinel::stats::record_success(
                        map,
                        master_name,
                        outcome.rounds,
                        outcome.retries,
                        outcome.elapsed,
                    )
                });
                self.sentinel_addrs.rcu(|map| {
                    let mut next = (**map).clone();
                    next.insert(master_name.to_owned(), outcome.updated_sentinels.clone());
                    next
                });

                self.reset_master_addr_with_handler(master_name, outcome.addr.clone(), per_call_handler);

                self.callbacks.dispatch(
                    &ResolveEvent::Success {
                        master_name: master_name.to_owned(),
                        addr: outcome.addr.clone(),
                        elapsed: outcome.elapsed,
                        rounds: outcome.rounds,
                    },
                    per_call_handler,
                );

                Ok(outcome.addr)
            }
            Err(Error::ResolveTimeout(data)) => {
                self.resolve_stats.rcu(|map| {
                    crate::sentinel::stats::record_timeout(
                        map,
                        master_name,
                        data.attempts as u64,
                        data.retries as u64,
                        data.elapsed,
                    )
                });
                self.callbacks.dispatch(
                    &ResolveEvent::Error {
                        master_name: master_name.to_owned(),
                        detail: ResolveErrorDetail::Timeout {
                            elapsed: data.elapsed,
                            rounds: data.attempts as u64,
                            retries: data.retries as u64,
                        },
                    },
                    per_call_handler,
                );
                Err(Error::ResolveTimeout(data))
            }
            Err(other) => Err(other),
        }
    }

    /// Shared implementation behind `reset_master_addr`: also routes a
    /// per-call handler (if any) to the `on-resolve-change` event, since
    /// only `resolve_master_addr`'s success path has one to pass.
    fn reset_master_addr_with_handler(&self, master_name: &str, addr: SentinelAddr, per_call_handler: Option<&Handler>) -> bool {
        let previous = self
            .resolved_addrs
            .rcu(|map| {
                let mut next = (**map).clone();
                next.insert(master_name.to_owned(), addr.clone());
                next
            })
            .get(master_name)
            .cloned();

        let changed = previous.as_ref() != Some(&addr);
        if changed {
            self.resolve_stats.rcu(|map| {
                let mut next = (**map).clone();
                next.entry(master_name.to_owned()).or_default().n_changes += 1;
                next
            });
            self.callbacks.dispatch(
                &ResolveEvent::Change {
                    master_name: master_name.to_owned(),
                    previous,
                    current: addr,
                },
                per_call_handler,
            );
        }
        changed
    }

    fn apply_stat_updates(&self, updates: &[(String, crate::sentinel::stats::SentinelOutcome)]) {
        if updates.is_empty() {
            return;
        }
        self.sentinel_stats.rcu(|map| {
            let mut next = (**map).clone();
            for (key, outcome) in updates {
                let entry = next.entry(key.clone()).or_default();
                *entry = entry.bump(*outcome);
            }
            next
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentinel::conn::TcpConnectionProvider;
    use std::time::Duration;

    fn spec_with(master: &str, sentinels: Vec<SentinelAddr>) -> SentinelSpec {
        let mut map = SentinelAddrMap::new();
        map.insert(master.to_owned(), sentinels);
        SentinelSpec::new(map, SentinelOptions::default(), Arc::new(TcpConnectionProvider))
    }

    #[test]
    fn empty_sentinel_list_fails_fast() {
        let spec = SentinelSpec::new(SentinelAddrMap::new(), SentinelOptions::default(), Arc::new(TcpConnectionProvider));
        let err = spec.resolve_master_addr("mymaster", None, None).unwrap_err();
        assert!(matches!(err, Error::NoSentinelAddrsInSpec { .. }));
    }

    #[test]
    fn timeout_records_resolve_stats() {
        let spec = spec_with("mymaster", vec![SentinelAddr::new("unreachable", 1)]);
        let opts = SentinelOptions::default()
            .with_resolve_timeout(Duration::from_millis(60))
            .with_retry_delay(Duration::from_millis(10));
        let err = spec.resolve_master_addr("mymaster", Some(&opts), None).unwrap_err();
        assert!(matches!(err, Error::ResolveTimeout(_)));
        assert!(spec.resolve_stats("mymaster").n_timeout >= 1);
    }

    #[test]
    fn get_master_addr_is_a_pure_cache_read() {
        let spec = spec_with("mymaster", vec![SentinelAddr::new("unreachable", 1)]);
        assert_eq!(spec.get_master_addr("mymaster"), None);
    }

    #[test]
    fn reset_master_addr_reports_whether_the_value_changed() {
        let spec = spec_with("mymaster", vec![]);
        assert!(spec.reset_master_addr("mymaster", SentinelAddr::new("10.0.0.1", 6379)));
        assert!(!spec.reset_master_addr("mymaster", SentinelAddr::new("10.0.0.1", 6379)));
        assert!(spec.reset_master_addr("mymaster", SentinelAddr::new("10.0.0.2", 6379)));
        assert_eq!(spec.get_master_addr("mymaster"), Some(SentinelAddr::new("10.0.0.2", 6379)));
        assert_eq!(spec.resolve_stats("mymaster").n_changes, 2);
    }

    #[test]
    fn add_back_fires_addrs_change_only_when_the_list_actually_grows() {
        let mut spec = spec_with("mymaster", vec![SentinelAddr::new("s1", 26379)]);
        let fired = std::sync::Arc::new(std::sync::atomic::AtomicUsize::new(0));
        {
            let fired = fired.clone();
            spec.register_callback(Box::new(move |event| {
                if matches!(event, ResolveEvent::AddrsChange { .. }) {
                    fired.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                }
            }));
        }

        spec.add_back("mymaster", vec![SentinelAddr::new("s1", 26379)]);
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 0);

        spec.add_back("mymaster", vec![SentinelAddr::new("s2", 26379)]);
        assert_eq!(fired.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_fires_addrs_change_with_before_and_after_values() {
        let mut spec = spec_with(
            "mymaster",
            vec![SentinelAddr::new("s1", 26379), SentinelAddr::new("s2", 26379)],
        );
        let captured: std::sync::Arc<std::sync::Mutex<Option<(SentinelAddrList, SentinelAddrList)>>> =
            std::sync::Arc::new(std::sync::Mutex::new(None));
        {
            let captured = captured.clone();
            spec.register_callback(Box::new(move |event| {
                if let ResolveEvent::AddrsChange { previous, current, .. } = event {
                    *captured.lock().unwrap() = Some((previous.clone(), current.clone()));
                }
            }));
        }

        spec.remove("mymaster", &SentinelAddr::new("s1", 26379));

        let (previous, current) = captured.lock().unwrap().clone().expect("event should have fired");
        assert_eq!(previous, vec![SentinelAddr::new("s1", 26379), SentinelAddr::new("s2", 26379)]);
        assert_eq!(current, vec![SentinelAddr::new("s2", 26379)]);
    }
}
