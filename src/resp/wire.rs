//! Low-level RESP3 writers.
//!
//! Pure functions over a generic [`std::io::Write`] sink: no buffering
//! policy, no framing beyond a single prefix/payload, nothing Sentinel- or
//! argument-shaped. Everything above this module is built out of these four
//! writers plus [`write_bulk_bytes`] and [`write_bulk_bytes_marked`].

use std::io::{self, Write};
use std::sync::OnceLock;

const CRLF: &[u8] = b"\r\n";

const SHORT_INT_LO: i64 = -32768;
const SHORT_INT_HI: i64 = 32767;
const SHORT_LEN_HI: i64 = 255;

fn short_int_cache() -> &'static [Box<[u8]>] {
    static CACHE: OnceLock<Vec<Box<[u8]>>> = OnceLock::new();
    CACHE.get_or_init(|| {
        (SHORT_INT_LO..=SHORT_INT_HI)
            .map(|n| format_prefixed(b':', n).into_boxed_slice())
            .collect()
    })
}

fn short_len_cache(prefix: u8) -> &'static [Box<[u8]>] {
    static ARRAY_CACHE: OnceLock<Vec<Box<[u8]>>> = OnceLock::new();
    static BULK_CACHE: OnceLock<Vec<Box<[u8]>>> = OnceLock::new();
    let cache = if prefix == b'*' { &ARRAY_CACHE } else { &BULK_CACHE };
    cache.get_or_init(|| {
        (0..=SHORT_LEN_HI)
            .map(|n| format_prefixed(prefix, n).into_boxed_slice())
            .collect()
    })
}

fn format_prefixed(prefix: u8, n: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(16);
    buf.push(prefix);
    let mut itoa_buf = itoa::Buffer::new();
    buf.extend_from_slice(itoa_buf.format(n).as_bytes());
    buf.extend_from_slice(CRLF);
    buf
}

#[inline]
fn write_cached_or_format(
    w: &mut impl Write,
    prefix: u8,
    n: i64,
    cache: Option<&'static [Box<[u8]>]>,
    cache_lo: i64,
) -> io::Result<()> {
    if let Some(cache) = cache {
        if n >= cache_lo && (n - cache_lo) < cache.len() as i64 {
            return w.write_all(&cache[(n - cache_lo) as usize]);
        }
    }
    w.write_all(&[prefix])?;
    let mut itoa_buf = itoa::Buffer::new();
    w.write_all(itoa_buf.format(n).as_bytes())?;
    w.write_all(CRLF)
}

/// Writes `*<n>\r\n`.
#[inline]
pub fn write_array_len(w: &mut impl Write, n: i64) -> io::Result<()> {
    write_cached_or_format(w, b'*', n, Some(short_len_cache(b'*')), 0)
}

/// Writes `$<n>\r\n`.
#[inline]
pub fn write_bulk_len(w: &mut impl Write, n: i64) -> io::Result<()> {
    write_cached_or_format(w, b'$', n, Some(short_len_cache(b'$')), 0)
}

/// Writes `:<n>\r\n`.
#[inline]
pub fn write_simple_long(w: &mut impl Write, n: i64) -> io::Result<()> {
    write_cached_or_format(w, b':', n, Some(short_int_cache()), SHORT_INT_LO)
}

/// Writes `$<len>\r\n<decimal>\r\n` where `<decimal>` is `d`'s standard
/// textual form.
#[inline]
pub fn write_bulk_double(w: &mut impl Write, d: f64) -> io::Result<()> {
    let mut buf = dtoa::Buffer::new();
    write_bulk_bytes(w, buf.format(d).as_bytes())
}

/// Writes `$<len>\r\n<ba>\r\n` where `len = ba.len()`.
#[inline]
pub fn write_bulk_bytes(w: &mut impl Write, ba: &[u8]) -> io::Result<()> {
    write_bulk_len(w, ba.len() as i64)?;
    w.write_all(ba)?;
    w.write_all(CRLF)
}

/// Writes `$<marker.len()+payload.len()>\r\n<marker><payload>\r\n`.
///
/// Used to prefix serialized blobs with a short magic sequence without an
/// intermediate allocation that concatenates `marker` and `payload`.
#[inline]
pub fn write_bulk_bytes_marked(w: &mut impl Write, marker: &[u8], payload: &[u8]) -> io::Result<()> {
    write_bulk_len(w, (marker.len() + payload.len()) as i64)?;
    w.write_all(marker)?;
    w.write_all(payload)?;
    w.write_all(CRLF)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn written(f: impl FnOnce(&mut Vec<u8>)) -> Vec<u8> {
        let mut buf = Vec::new();
        f(&mut buf);
        buf
    }

    #[test]
    fn array_len_matches_literal_form() {
        assert_eq!(written(|w| write_array_len(w, 7).unwrap()), b"*7\r\n");
        assert_eq!(written(|w| write_array_len(w, 0).unwrap()), b"*0\r\n");
    }

    #[test]
    fn bulk_len_matches_literal_form() {
        assert_eq!(written(|w| write_bulk_len(w, 4).unwrap()), b"$4\r\n");
    }

    #[test]
    fn simple_long_matches_literal_form_in_short_range() {
        for n in [-32768_i64, -1, 0, 1, 32767] {
            let expected = format!(":{n}\r\n");
            assert_eq!(written(|w| write_simple_long(w, n).unwrap()), expected.as_bytes());
        }
    }

    #[test]
    fn simple_long_cache_and_fallback_agree() {
        // in cache
        let cached = written(|w| write_simple_long(w, 1000).unwrap());
        // out of cache, same value computed via the formatting fallback
        let formatted = written(|w| write_simple_long(w, SHORT_INT_HI + 1000).unwrap());
        assert_eq!(cached, b":1000\r\n");
        assert_eq!(formatted, format!(":{}\r\n", SHORT_INT_HI + 1000).as_bytes());
    }

    #[test]
    fn simple_long_beyond_short_range_is_correct() {
        assert_eq!(
            written(|w| write_simple_long(w, 1_000_000).unwrap()),
            b":1000000\r\n"
        );
        assert_eq!(
            written(|w| write_simple_long(w, i64::MIN).unwrap()),
            format!(":{}\r\n", i64::MIN).as_bytes()
        );
    }

    #[test]
    fn bulk_double_equals_bulk_str_of_decimal() {
        let as_double = written(|w| write_bulk_double(w, 4.0).unwrap());
        let as_str = written(|w| write_bulk_bytes(w, b"4.0").unwrap());
        assert_eq!(as_double, as_str);
        assert_eq!(as_double, b"$3\r\n4.0\r\n");
    }

    #[test]
    fn bulk_bytes_one_arg_form() {
        assert_eq!(
            written(|w| write_bulk_bytes(w, b"abc").unwrap()),
            b"$3\r\nabc\r\n"
        );
    }

    #[test]
    fn bulk_bytes_marked_form() {
        assert_eq!(
            written(|w| write_bulk_bytes_marked(w, &[0x00, 0x3C], b"abc").unwrap()),
            b"$5\r\n\x00<abc\r\n"
        );
    }
}
