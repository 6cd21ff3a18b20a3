//! Sentinel-based master resolution: options, counters, lifecycle
//! callbacks, the transient-connection collaborator, the resolution
//! algorithm, and the `SentinelSpec` entity that ties them together behind
//! lock-free CAS cells.

pub mod callbacks;
pub mod config;
pub mod conn;
pub mod resolve;
pub mod spec;
pub mod stats;

pub use callbacks::{Handler, ResolveErrorDetail, ResolveEvent};
pub use config::{ConnOpts, SentinelOptions};
pub use conn::{ConnectionProvider, SentinelConn, SentinelDescriptor, TcpConnectionProvider};
pub use spec::SentinelSpec;
pub use stats::{ResolveStats, SentinelOutcome, SentinelStats};
