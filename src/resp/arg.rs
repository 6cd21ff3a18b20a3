//! Polymorphic argument encoding: host values → [`Arg`] → wire bytes.
//!
//! A tagged-variant enum rather than runtime type dispatch: conversions
//! happen once at the boundary and [`write_bulk_arg`] is a single match,
//! which keeps the hot path branch-predictable and keeps the marker policy
//! in one place.

use crate::codec::{Codec, CodecOpts};
use crate::resp::wire;
use crate::{Error, Result};
use serde::Serialize;
use std::borrow::Cow;
use std::io::{self, Write};

/// `ba-nil`: full payload for a marker-enabled null.
pub const MARKER_NIL: [u8; 2] = [0x00, 0x5F];
/// `ba-bin`: prefix for a marker-enabled raw byte array.
pub const MARKER_BIN: [u8; 2] = [0x00, 0x3C];
/// `ba-npy`: prefix for a marker-enabled serialized blob.
pub const MARKER_NPY: [u8; 6] = [0x00, 0x3E, 0x4E, 0x50, 0x59, 0x00];

/// A byte array wrapped to bypass serialization and marker logic entirely.
///
/// Idempotent: wrapping already takes ownership of the bytes, so there is
/// nothing left to re-wrap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBytes(pub Vec<u8>);

impl RawBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        RawBytes(bytes)
    }
}

/// A value serialized ahead of time with a fixed set of codec options.
///
/// Re-wrapping with the same `opts` ([`Frozen::rewrap`]) is a no-op; with
/// different `opts` it re-serializes. Construction is where codec errors
/// surface, never at write time, so a partially-written request is never
/// left on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Frozen {
    opts: CodecOpts,
    bytes: Vec<u8>,
}

impl Frozen {
    pub fn new<C: Codec, T: Serialize + ?Sized>(
        codec: &C,
        opts: CodecOpts,
        value: &T,
    ) -> Result<Self> {
        let bytes = codec.freeze(value, opts)?;
        Ok(Frozen { opts, bytes })
    }

    /// Re-serializes only if `opts` differs from the options this value was
    /// originally frozen with.
    pub fn rewrap<C: Codec, T: Serialize + ?Sized>(
        self,
        codec: &C,
        opts: CodecOpts,
        value: &T,
    ) -> Result<Self> {
        if opts == self.opts {
            Ok(self)
        } else {
            Frozen::new(codec, opts, value)
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn opts(&self) -> CodecOpts {
        self.opts
    }
}

/// A keyword-like name: `"name"`, or `"ns/name"` when namespaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeywordArg {
    pub ns: Option<&'static str>,
    pub name: &'static str,
}

impl KeywordArg {
    pub const fn unqualified(name: &'static str) -> Self {
        KeywordArg { ns: None, name }
    }

    pub const fn qualified(ns: &'static str, name: &'static str) -> Self {
        KeywordArg { ns: Some(ns), name }
    }

    fn to_qualified_string(self) -> String {
        match self.ns {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.to_owned(),
        }
    }
}

/// A single command argument, already classified by kind.
///
/// Construct these at the boundary (via the `From`/`ToArg` conversions
/// below) rather than matching on a native Rust type inside the writer.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Str(Cow<'static, str>),
    Int(i64),
    Float(f64),
    /// An explicitly-wrapped raw byte array: never marker-prefixed.
    Raw(RawBytes),
    /// An unwrapped byte array: marker-prefixed iff markers are enabled,
    /// otherwise written verbatim.
    Bytes(Vec<u8>),
    Frozen(Frozen),
    Null,
    /// Codec output for a value with no other applicable rule.
    Other(Vec<u8>),
}

pub trait ToArg {
    fn to_arg(self) -> Arg;
}

macro_rules! impl_to_arg_int {
    ($($t:ty),+) => {
        $(impl ToArg for $t {
            fn to_arg(self) -> Arg { Arg::Int(self as i64) }
        })+
    };
}
impl_to_arg_int!(i8, i16, i32, i64, u8, u16, u32);

macro_rules! impl_to_arg_float {
    ($($t:ty),+) => {
        $(impl ToArg for $t {
            fn to_arg(self) -> Arg { Arg::Float(self as f64) }
        })+
    };
}
impl_to_arg_float!(f32, f64);

impl ToArg for &'static str {
    fn to_arg(self) -> Arg {
        Arg::Str(Cow::Borrowed(self))
    }
}

impl ToArg for String {
    fn to_arg(self) -> Arg {
        Arg::Str(Cow::Owned(self))
    }
}

impl ToArg for char {
    fn to_arg(self) -> Arg {
        let mut buf = [0u8; 4];
        Arg::Str(Cow::Owned(self.encode_utf8(&mut buf).to_owned()))
    }
}

impl ToArg for KeywordArg {
    fn to_arg(self) -> Arg {
        Arg::Str(Cow::Owned(self.to_qualified_string()))
    }
}

impl ToArg for RawBytes {
    fn to_arg(self) -> Arg {
        Arg::Raw(self)
    }
}

impl ToArg for Vec<u8> {
    fn to_arg(self) -> Arg {
        Arg::Bytes(self)
    }
}

impl ToArg for Frozen {
    fn to_arg(self) -> Arg {
        Arg::Frozen(self)
    }
}

impl ToArg for () {
    fn to_arg(self) -> Arg {
        Arg::Null
    }
}

impl<T: ToArg> ToArg for Option<T> {
    fn to_arg(self) -> Arg {
        match self {
            Some(v) => v.to_arg(),
            None => Arg::Null,
        }
    }
}

/// Eagerly serializes `value` via `codec` and wraps the result as
/// [`Arg::Other`], for types with no more specific rule. Codec errors
/// surface here, at construction, not at write time.
pub fn other_arg<C: Codec, T: Serialize + ?Sized>(
    codec: &C,
    opts: CodecOpts,
    value: &T,
) -> Result<Arg> {
    Ok(Arg::Other(codec.freeze(value, opts)?))
}

/// Writes a single argument in RESP3 bulk form, dispatching on `arg`'s kind
/// and `markers_enabled`. This is the one place marker policy is decided.
pub fn write_bulk_arg(w: &mut impl Write, arg: &Arg, markers_enabled: bool) -> Result<()> {
    match arg {
        Arg::Str(s) => {
            if markers_enabled && s.as_bytes().first() == Some(&0) {
                return Err(Error::ReservedNull);
            }
            wire::write_bulk_bytes(w, s.as_bytes()).map_err(Error::from)
        }
        Arg::Int(i) => wire::write_simple_long(w, *i).map_err(Error::from),
        Arg::Float(f) => wire::write_bulk_double(w, *f).map_err(Error::from),
        Arg::Raw(raw) => wire::write_bulk_bytes(w, &raw.0).map_err(Error::from),
        Arg::Bytes(bytes) => {
            if markers_enabled {
                wire::write_bulk_bytes_marked(w, &MARKER_BIN, bytes).map_err(Error::from)
            } else {
                wire::write_bulk_bytes(w, bytes).map_err(Error::from)
            }
        }
        Arg::Frozen(frozen) => {
            if markers_enabled {
                wire::write_bulk_bytes_marked(w, &MARKER_NPY, &frozen.bytes).map_err(Error::from)
            } else {
                wire::write_bulk_bytes(w, &frozen.bytes).map_err(Error::from)
            }
        }
        Arg::Null => {
            if markers_enabled {
                write_marker_only(w, &MARKER_NIL).map_err(Error::from)
            } else {
                Err(Error::UnsupportedArgType)
            }
        }
        Arg::Other(bytes) => {
            if markers_enabled {
                wire::write_bulk_bytes_marked(w, &MARKER_NPY, bytes).map_err(Error::from)
            } else {
                Err(Error::UnsupportedArgType)
            }
        }
    }
}

fn write_marker_only(w: &mut impl Write, marker: &[u8]) -> io::Result<()> {
    wire::write_bulk_len(w, marker.len() as i64)?;
    w.write_all(marker)?;
    w.write_all(b"\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::JsonCodec;

    fn written(arg: &Arg, markers_enabled: bool) -> Vec<u8> {
        let mut buf = Vec::new();
        write_bulk_arg(&mut buf, arg, markers_enabled).unwrap();
        buf
    }

    #[test]
    fn str_arg_encodes_as_bulk_string() {
        assert_eq!(written(&"str".to_arg(), true), b"$3\r\nstr\r\n");
    }

    #[test]
    fn int_arg_encodes_as_simple_long() {
        assert_eq!(written(&1_i64.to_arg(), true), b":1\r\n");
    }

    #[test]
    fn float_arg_encodes_as_bulk_double() {
        assert_eq!(written(&4.0_f64.to_arg(), true), b"$3\r\n4.0\r\n");
    }

    #[test]
    fn keyword_arg_encodes_qualified_form() {
        let kw = KeywordArg::qualified("ns", "kw");
        assert_eq!(written(&kw.to_arg(), true), b"$5\r\nns/kw\r\n");
        let kw = KeywordArg::unqualified("kw");
        assert_eq!(written(&kw.to_arg(), true), b"$2\r\nkw\r\n");
    }

    #[test]
    fn char_arg_encodes_utf8() {
        assert_eq!(written(&'x'.to_arg(), true), b"$1\r\nx\r\n");
    }

    #[test]
    fn reserved_null_rejected_when_markers_enabled() {
        let mut buf = Vec::new();
        let err = write_bulk_arg(&mut buf, &"\0oops".to_owned().to_arg(), true).unwrap_err();
        assert!(matches!(err, Error::ReservedNull));
        assert!(buf.is_empty());
    }

    #[test]
    fn reserved_null_allowed_when_markers_disabled() {
        let mut buf = Vec::new();
        write_bulk_arg(&mut buf, &"\0ok".to_owned().to_arg(), false).unwrap();
        assert_eq!(buf, b"$3\r\n\0ok\r\n");
    }

    #[test]
    fn null_with_markers_on_emits_nil_marker() {
        assert_eq!(written(&Arg::Null, true), b"$2\r\n\x00_\r\n");
    }

    #[test]
    fn null_with_markers_off_is_unsupported() {
        let mut buf = Vec::new();
        let err = write_bulk_arg(&mut buf, &Arg::Null, false).unwrap_err();
        assert!(matches!(err, Error::UnsupportedArgType));
    }

    #[test]
    fn unwrapped_bytes_marked_vs_verbatim() {
        let bytes = vec![97_u8, 98, 99];
        assert_eq!(written(&bytes.clone().to_arg(), true), b"$5\r\n\x00<abc\r\n");
        assert_eq!(written(&bytes.to_arg(), false), b"$3\r\nabc\r\n");
    }

    #[test]
    fn raw_bytes_never_marker_prefixed() {
        let raw = RawBytes::new(vec![97, 98, 99]);
        assert_eq!(written(&raw.clone().to_arg(), true), b"$3\r\nabc\r\n");
        assert_eq!(written(&raw.to_arg(), false), b"$3\r\nabc\r\n");
    }

    #[test]
    fn non_marker_rule_output_is_markers_flag_independent() {
        for markers_enabled in [true, false] {
            assert_eq!(written(&"str".to_arg(), markers_enabled), b"$3\r\nstr\r\n");
            assert_eq!(written(&1_i64.to_arg(), markers_enabled), b":1\r\n");
            assert_eq!(written(&4.0_f64.to_arg(), markers_enabled), b"$3\r\n4.0\r\n");
            let raw = RawBytes::new(vec![1, 2, 3]);
            assert_eq!(written(&raw.to_arg(), markers_enabled), b"$3\r\n\x01\x02\x03\r\n");
        }
    }

    #[cfg(feature = "json")]
    #[test]
    fn frozen_is_idempotent_under_same_opts() {
        let codec = JsonCodec;
        let value = vec![1, 2, 3];
        let frozen = Frozen::new(&codec, CodecOpts::Default, &value).unwrap();
        let rewrapped = frozen.clone().rewrap(&codec, CodecOpts::Default, &value).unwrap();
        assert_eq!(frozen, rewrapped);
    }

    #[cfg(feature = "json")]
    #[test]
    fn frozen_reserializes_under_different_opts() {
        let codec = JsonCodec;
        let value = vec![1, 2, 3];
        let frozen = Frozen::new(&codec, CodecOpts::Default, &value).unwrap();
        let rewrapped = frozen.rewrap(&codec, CodecOpts::Compact, &value).unwrap();
        assert_eq!(rewrapped.opts(), CodecOpts::Compact);
    }

    #[cfg(feature = "json")]
    #[test]
    fn frozen_marked_when_enabled_and_verbatim_when_disabled() {
        let codec = JsonCodec;
        let value = vec![1, 2, 3];
        let frozen = Frozen::new(&codec, CodecOpts::Default, &value).unwrap();
        let marked = written(&frozen.clone().to_arg(), true);
        let verbatim = written(&frozen.to_arg(), false);
        assert!(marked.windows(MARKER_NPY.len()).any(|w| w == MARKER_NPY));
        assert!(!verbatim.windows(MARKER_NPY.len()).any(|w| w == MARKER_NPY));
    }

    #[cfg(feature = "json")]
    #[test]
    fn other_fails_without_markers_and_succeeds_with_them() {
        let codec = JsonCodec;
        let arg = other_arg(&codec, CodecOpts::Default, &42).unwrap();
        let mut buf = Vec::new();
        assert!(write_bulk_arg(&mut buf, &arg, false).is_err());
        buf.clear();
        write_bulk_arg(&mut buf, &arg, true).unwrap();
        assert!(!buf.is_empty());
    }
}
