//! RESP3 request encoding: wire primitives, the argument encoder, and the
//! request writer built on top of them.

pub mod arg;
pub mod wire;
pub mod writer;

pub use arg::{Arg, Frozen, KeywordArg, RawBytes, ToArg};
pub use writer::write_requests;

macro_rules! impl_arg_from {
    ($($t:ty),+) => {
        $(impl From<$t> for Arg {
            fn from(v: $t) -> Arg { ToArg::to_arg(v) }
        })+
    };
}
impl_arg_from!(
    i8, i16, i32, i64, u8, u16, u32, f32, f64, &'static str, String, char, KeywordArg, RawBytes,
    Vec<u8>, Frozen
);

impl From<()> for Arg {
    fn from((): ()) -> Arg {
        Arg::Null
    }
}

impl<T: ToArg> From<Option<T>> for Arg {
    fn from(v: Option<T>) -> Arg {
        v.to_arg()
    }
}
