//! Resolution-lifecycle observers, dispatched at three scopes — process-wide,
//! one `SentinelSpec` instance, and a single `resolve_master_addr` call —
//! mirroring a three-tier hook registration: per-request callbacks plus a
//! process-global hook list.

use crate::addr::{SentinelAddr, SentinelAddrList};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Mutex, OnceLock};
use std::time::Duration;

/// A successful resolution, a change in the resolved master address, a
/// change to the tracked sentinel list, or a failed resolution attempt.
#[derive(Debug, Clone)]
pub enum ResolveEvent {
    Success {
        master_name: String,
        addr: SentinelAddr,
        elapsed: Duration,
        rounds: u64,
    },
    Change {
        master_name: String,
        previous: Option<SentinelAddr>,
        current: SentinelAddr,
    },
    /// The tracked sentinel list for `master_name` changed, via `add_back`,
    /// `add_front`, `remove`, or the address-bookkeeping a successful
    /// resolution performs.
    AddrsChange {
        master_name: String,
        previous: SentinelAddrList,
        current: SentinelAddrList,
    },
    /// A `resolve_master_addr` call failed outright, either because no
    /// sentinel addresses were tracked for `master_name` or because the
    /// retry loop ran out of time.
    Error {
        master_name: String,
        detail: ResolveErrorDetail,
    },
}

#[derive(Debug, Clone)]
pub enum ResolveErrorDetail {
    NoSentinelAddrs,
    Timeout { elapsed: Duration, rounds: u64, retries: u64 },
}

pub type Handler = Box<dyn Fn(&ResolveEvent) + Send + Sync>;

fn process_handlers() -> &'static Mutex<Vec<Handler>> {
    static HANDLERS: OnceLock<Mutex<Vec<Handler>>> = OnceLock::new();
    HANDLERS.get_or_init(|| Mutex::new(Vec::new()))
}

/// Registers a handler invoked for every `ResolveEvent` raised by any
/// `SentinelSpec` in this process. Intended for process-wide metrics/logging
/// wiring done once at startup.
pub fn register_process_handler(handler: Handler) {
    process_handlers().lock().unwrap().push(handler);
}

#[cfg(test)]
pub(crate) fn clear_process_handlers_for_test() {
    process_handlers().lock().unwrap().clear();
}

/// Handlers scoped to one `SentinelSpec` instance, plus an optional
/// per-call handler supplied to a single `resolve_master_addr` invocation.
#[derive(Default)]
pub struct Callbacks {
    instance: Vec<Handler>,
}

impl Callbacks {
    pub fn new() -> Self {
        Callbacks { instance: Vec::new() }
    }

    pub fn register(&mut self, handler: Handler) {
        self.instance.push(handler);
    }

    /// Fires `event` through the process layer, this instance's layer, and
    /// `per_call` (if given), in that order. Each handler is isolated with
    /// `catch_unwind`: a panicking observer must not abort resolution or
    /// prevent later observers from running.
    pub fn dispatch(&self, event: &ResolveEvent, per_call: Option<&Handler>) {
        for handler in process_handlers().lock().unwrap().iter() {
            invoke_guarded(handler, event);
        }
        for handler in &self.instance {
            invoke_guarded(handler, event);
        }
        if let Some(handler) = per_call {
            invoke_guarded(handler, event);
        }
    }
}

fn invoke_guarded(handler: &Handler, event: &ResolveEvent) {
    let outcome = catch_unwind(AssertUnwindSafe(|| handler(event)));
    if outcome.is_err() {
        log::warn!("resolve-event handler panicked; continuing with remaining observers");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn instance_and_per_call_handlers_both_fire() {
        let instance_count = Arc::new(AtomicUsize::new(0));
        let per_call_count = Arc::new(AtomicUsize::new(0));

        let mut callbacks = Callbacks::new();
        {
            let instance_count = instance_count.clone();
            callbacks.register(Box::new(move |_event| {
                instance_count.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let per_call: Handler = {
            let per_call_count = per_call_count.clone();
            Box::new(move |_event| {
                per_call_count.fetch_add(1, Ordering::SeqCst);
            })
        };

        let event = ResolveEvent::Error {
            master_name: "mymaster".into(),
            detail: ResolveErrorDetail::Timeout {
                elapsed: Duration::from_millis(1),
                rounds: 1,
                retries: 0,
            },
        };
        callbacks.dispatch(&event, Some(&per_call));

        assert_eq!(instance_count.load(Ordering::SeqCst), 1);
        assert_eq!(per_call_count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn a_panicking_handler_does_not_stop_the_remaining_observers() {
        clear_process_handlers_for_test();
        let ran_after = Arc::new(AtomicUsize::new(0));

        let mut callbacks = Callbacks::new();
        callbacks.register(Box::new(|_event| panic!("boom")));
        {
            let ran_after = ran_after.clone();
            callbacks.register(Box::new(move |_event| {
                ran_after.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let event = ResolveEvent::Success {
            master_name: "mymaster".into(),
            addr: SentinelAddr::new("10.0.0.1", 6379),
            elapsed: Duration::from_millis(1),
            rounds: 1,
        };
        callbacks.dispatch(&event, None);

        assert_eq!(ran_after.load(Ordering::SeqCst), 1);
    }
}
