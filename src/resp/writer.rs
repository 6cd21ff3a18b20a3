//! Request writer: frames a sequence of command argument lists into the
//! RESP3 array-of-bulks form and flushes exactly once.

use crate::resp::arg::{write_bulk_arg, Arg};
use crate::resp::wire;
use crate::{Error, Result};
use std::io::Write;

/// Writes `requests` to `sink` and flushes once.
///
/// Empty argument lists are skipped entirely (no bytes emitted for them). A
/// successful call produces a byte stream a RESP3 server parses as exactly
/// `k` commands, where `k` is the number of non-empty input lists, in the
/// same order they were given.
pub fn write_requests<I, A>(
    sink: &mut impl Write,
    requests: impl IntoIterator<Item = I>,
    markers_enabled: bool,
) -> Result<()>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    // Encode into a scratch buffer first: the contract promises no bytes
    // reach the sink in the error case, and `sink` may be a live socket we
    // cannot un-write to.
    let mut scratch = Vec::new();
    for request in requests {
        let args: Vec<Arg> = request.into_iter().map(Into::into).collect();
        if args.is_empty() {
            continue;
        }
        wire::write_array_len(&mut scratch, args.len() as i64).map_err(Error::from)?;
        for arg in &args {
            write_bulk_arg(&mut scratch, arg, markers_enabled)?;
        }
    }
    sink.write_all(&scratch).map_err(Error::from)?;
    sink.flush().map_err(Error::from)
}
