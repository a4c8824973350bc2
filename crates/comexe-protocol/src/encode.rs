//! Encodes a run of host stack slots, or an already-typed argument list,
//! into one framed event.

use comexe_blobstore::{BlobStore, Value};
use comexe_host::ScriptHost;

use crate::error::CodecError;
use crate::frame::{push_end, push_start};

/// Encodes stack positions `start..=end` of `host` as one event:
/// `START(arg_count), ARG_1, …, ARG_n, END`.
///
/// By convention the first encoded argument is the target handler name
/// (a `Value::String`); the caller is responsible for having pushed it
/// onto the host stack before `start`.
pub fn encode_event(
    store: &mut BlobStore,
    host: &dyn ScriptHost,
    start: usize,
    end: usize,
) -> Result<(), CodecError> {
    let arg_count = (end - start + 1) as u32;
    push_start(store, arg_count);
    for index in start..=end {
        let type_name = host.type_name_at(index);
        let value = match type_name {
            "number" if host.is_integer_at(index) => Value::Integer(host.pull_integer_at(index)),
            "number" => Value::Double(host.pull_double_at(index)),
            "boolean" => Value::Boolean(host.pull_boolean_at(index)),
            "nil" => Value::Nil,
            "userdata" => Value::Opaque(host.pull_opaque_at(index)),
            "string" => Value::String(host.pull_string_at(index)),
            _ => {
                return Err(CodecError::UnsupportedArgument {
                    index,
                    type_name: type_name.to_string(),
                });
            }
        };
        store.push_value(&value);
    }
    push_end(store);
    Ok(())
}

/// Encodes an event directly from already-typed values, bypassing the host
/// stack entirely. Used by runtime-internal senders (`Dispatcher::post`,
/// `broadcast`, `post_exit`, `notify_external`) that construct events from
/// Rust values rather than from a running script's stack. `values[0]` must
/// be the target handler name as a `Value::String`.
pub fn encode_event_values(store: &mut BlobStore, values: &[Value]) {
    push_start(store, values.len() as u32);
    for value in values {
        store.push_value(value);
    }
    push_end(store);
}
