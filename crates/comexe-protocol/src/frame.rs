//! The two framing blobs that bracket an event's argument list. These are
//! written as raw bytes rather than through [`comexe_blobstore::Value`];
//! tags `6` and `7` are reserved for exactly this purpose so the blob store
//! never has to know about event framing.

use comexe_blobstore::{BlobStore, Key, Value};

use crate::error::CodecError;

pub const TAG_START: u8 = 6;
pub const TAG_END: u8 = 7;

/// A single decoded blob from an event stream: either framing or a value.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Start { arg_count: u32 },
    Arg(Value),
    End,
}

pub(crate) fn push_start(store: &mut BlobStore, arg_count: u32) -> Key {
    let mut payload = Vec::with_capacity(5);
    payload.push(TAG_START);
    payload.extend_from_slice(&arg_count.to_le_bytes());
    store.push_blob(&payload)
}

pub(crate) fn push_end(store: &mut BlobStore) -> Key {
    store.push_blob(&[TAG_END])
}

/// Decodes one blob's raw bytes into a [`Frame`]. Returns
/// [`CodecError::UnknownVariant`] for malformed or unrecognised payloads.
pub fn decode_frame(bytes: &[u8]) -> Result<Frame, CodecError> {
    let &tag = bytes.first().ok_or(CodecError::UnknownVariant(0xff))?;
    match tag {
        TAG_START => {
            let rest = &bytes[1..];
            if rest.len() != 4 {
                return Err(CodecError::UnknownVariant(tag));
            }
            let arg_count = u32::from_le_bytes(rest.try_into().unwrap());
            Ok(Frame::Start { arg_count })
        }
        TAG_END => Ok(Frame::End),
        _ => Value::decode(bytes).map(Frame::Arg).ok_or(CodecError::UnknownVariant(tag)),
    }
}
