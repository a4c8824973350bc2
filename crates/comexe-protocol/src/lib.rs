//! Typed event argument codec built on top of `comexe_blobstore`.
//!
//! An event is a run of blobs: `START(arg_count), ARG_1, …, ARG_n, END`.
//! The first argument is always the target handler name; the effective
//! call arity is `arg_count - 1`. See `SPEC_FULL.md` §3/§4.D.

mod dispatch;
mod encode;
mod error;
mod frame;

pub use comexe_blobstore::Value;
pub use dispatch::{dispatch_all, resolve_handler};
pub use encode::{encode_event, encode_event_values};
pub use error::{CodecError, Result};
pub use frame::{decode_frame, Frame, TAG_END, TAG_START};
