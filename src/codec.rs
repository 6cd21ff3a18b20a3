//! The serialization codec external collaborator.
//!
//! Blob serialization is deliberately not reinvented here: this module only
//! defines the `freeze`/`thaw` contract the argument encoder and
//! [`crate::resp::arg::Frozen`] wrapper depend on, plus one concrete
//! implementation (`JsonCodec`) behind the optional `json` feature, backed
//! by `serde_json`.

use crate::Result;
use serde::Serialize;
use std::cell::Cell;

/// Options steering a [`Codec`]'s `freeze` call.
///
/// `Dynamic` resolves from the thread-local "current freeze options" set by
/// [`bind_freeze_opts`]; if none is bound it behaves like `Default`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CodecOpts {
    #[default]
    Default,
    Compact,
    Dynamic,
}

thread_local! {
    static CURRENT_FREEZE_OPTS: Cell<Option<CodecOpts>> = const { Cell::new(None) };
}

impl CodecOpts {
    /// Resolves `Dynamic` against the thread-local ambient value bound by
    /// [`bind_freeze_opts`]. Any other variant resolves to itself.
    ///
    /// This is the one piece of thread-local ambient state in the crate,
    /// kept narrowly scoped for compatibility with code that resolves
    /// "current" codec options implicitly rather than threading them
    /// through every call.
    pub fn resolve(self) -> CodecOpts {
        match self {
            CodecOpts::Dynamic => {
                CURRENT_FREEZE_OPTS.with(|cell| cell.get().unwrap_or_default())
            }
            other => other,
        }
    }
}

/// RAII guard restoring the previous ambient freeze options on drop.
pub struct FreezeOptsGuard {
    previous: Option<CodecOpts>,
}

impl Drop for FreezeOptsGuard {
    fn drop(&mut self) {
        CURRENT_FREEZE_OPTS.with(|cell| cell.set(self.previous));
    }
}

/// Binds `opts` as the ambient freeze options for the current thread until
/// the returned guard is dropped.
pub fn bind_freeze_opts(opts: CodecOpts) -> FreezeOptsGuard {
    let previous = CURRENT_FREEZE_OPTS.with(|cell| cell.replace(Some(opts)));
    FreezeOptsGuard { previous }
}

/// External codec collaborator: `freeze(value, opts) -> bytes`,
/// `thaw(bytes) -> value`. Opaque other than deterministic output for
/// identical inputs and options.
pub trait Codec {
    fn freeze<T: Serialize + ?Sized>(&self, value: &T, opts: CodecOpts) -> Result<Vec<u8>>;
    fn thaw<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T>;
}

/// Default codec implementation, backed by `serde_json` (mirroring the
/// teacher's optional `json` feature).
#[cfg(feature = "json")]
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

#[cfg(feature = "json")]
impl Codec for JsonCodec {
    fn freeze<T: Serialize + ?Sized>(&self, value: &T, opts: CodecOpts) -> Result<Vec<u8>> {
        match opts.resolve() {
            CodecOpts::Compact => Ok(serde_json::to_vec(value)?),
            _ => Ok(serde_json::to_vec(value)?),
        }
    }

    fn thaw<T: serde::de::DeserializeOwned>(&self, bytes: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(bytes)?)
    }
}
