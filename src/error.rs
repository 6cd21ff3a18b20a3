use std::fmt;
use std::time::Duration;

/// All error kinds raised by the core.
///
/// A flat, hand-rolled enum: one variant per failure kind, carrying
/// whatever structured data a caller needs to decide how to recover, with
/// `Display`/`From` impls instead of a derive macro.
#[derive(Debug)]
pub enum Error {
    /// A string argument started with a NUL byte while blob markers were enabled.
    ReservedNull,
    /// No encoder rule matched the argument and blob markers were disabled.
    UnsupportedArgType,
    /// `resolve_master_addr` was called for a master with an empty sentinel list.
    NoSentinelAddrsInSpec { master_name: String },
    /// Resolution exceeded its timeout without producing a confirmed master.
    ResolveTimeout(ResolveTimeoutData),
    /// The external serialization codec failed to freeze or thaw a value.
    Codec(String),
    /// Transport-level I/O failure that escaped the resolver's per-sentinel
    /// statistics (e.g. a wire-writer sink error).
    Io(String),
}

/// Data carried by [`Error::ResolveTimeout`].
#[derive(Debug, Clone, Default)]
pub struct ResolveTimeoutData {
    pub master_name: String,
    pub elapsed: Duration,
    pub attempts: usize,
    pub retries: usize,
    /// Per-sentinel outcome counts observed during this resolution, as
    /// `(address, n_ok, n_ignorant, n_unreachable, n_misidentified)`.
    pub sentinel_errors: Vec<(String, u64, u64, u64, u64)>,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::ReservedNull => f.write_str("argument starts with a reserved NUL byte"),
            Error::UnsupportedArgType => f.write_str("unsupported argument type"),
            Error::NoSentinelAddrsInSpec { master_name } => f.write_fmt(format_args!(
                "no sentinel addresses configured for master `{master_name}`"
            )),
            Error::ResolveTimeout(data) => f.write_fmt(format_args!(
                "resolution of master `{}` timed out after {:?} ({} attempts, {} retries)",
                data.master_name, data.elapsed, data.attempts, data.retries
            )),
            Error::Codec(e) => f.write_fmt(format_args!("codec error: {e}")),
            Error::Io(e) => f.write_fmt(format_args!("IO error: {e}")),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Codec(e.to_string())
    }
}

/// Library general result type.
pub type Result<T> = std::result::Result<T, Error>;
