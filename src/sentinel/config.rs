//! Resolver configuration: plain builder structs with `Default` impls,
//! merged caller-request ∘ spec ∘ process-default.

use std::time::Duration;

/// Per-connection settings used whenever the resolver opens a transient
/// connection to a Sentinel or a candidate master.
#[derive(Debug, Clone)]
pub struct ConnOpts {
    pub connect_timeout: Option<Duration>,
}

impl Default for ConnOpts {
    fn default() -> Self {
        ConnOpts {
            connect_timeout: Some(crate::sentinel::conn::default_connect_timeout()),
        }
    }
}

impl ConnOpts {
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Merges `self` (the more specific layer) over `base`, taking `self`'s
    /// field whenever it is `Some`.
    pub fn merge_over(&self, base: &ConnOpts) -> ConnOpts {
        ConnOpts {
            connect_timeout: self.connect_timeout.or(base.connect_timeout),
        }
    }
}

/// Resolver-wide behavior knobs, merged request-opts ∘ spec-opts ∘
/// process-defaults.
#[derive(Debug, Clone)]
pub struct SentinelOptions {
    /// Maximum wall-clock time a single `resolve_master_addr` call may spend
    /// across every retry before failing with `Error::ResolveTimeout`.
    pub resolve_timeout: Duration,
    /// Delay before starting the next attempt round after a round with no
    /// candidate.
    pub retry_delay: Duration,
    /// When set, newly reported sentinels surfaced via `SENTINEL sentinels`
    /// are merged into the tracked address list.
    pub add_missing_sentinels: bool,
    pub conn_opts: ConnOpts,
}

impl Default for SentinelOptions {
    fn default() -> Self {
        SentinelOptions {
            resolve_timeout: Duration::from_millis(500),
            retry_delay: Duration::from_millis(50),
            add_missing_sentinels: true,
            conn_opts: ConnOpts::default(),
        }
    }
}

impl SentinelOptions {
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = timeout;
        self
    }

    pub fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    pub fn with_add_missing_sentinels(mut self, enabled: bool) -> Self {
        self.add_missing_sentinels = enabled;
        self
    }

    /// Merges `self` (the caller's per-request override) over `base` (the
    /// resolver's own default), field by field. Only `conn_opts` recurses;
    /// the rest are whole-value overrides — non-nested scalars are replaced
    /// outright, never partially blended.
    pub fn merge_over(&self, base: &SentinelOptions) -> SentinelOptions {
        SentinelOptions {
            resolve_timeout: self.resolve_timeout,
            retry_delay: self.retry_delay,
            add_missing_sentinels: self.add_missing_sentinels,
            conn_opts: self.conn_opts.merge_over(&base.conn_opts),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conn_opts_merge_prefers_more_specific_layer() {
        let specific = ConnOpts { connect_timeout: None };
        let base = ConnOpts {
            connect_timeout: Some(Duration::from_millis(10)),
        };
        assert_eq!(specific.merge_over(&base).connect_timeout, Some(Duration::from_millis(10)));
    }
}
