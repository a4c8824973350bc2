//! Drains a blob store's event stream one event at a time, invoking the
//! matching host global for each.

use comexe_blobstore::{BlobStore, Key, Value};
use comexe_host::ScriptHost;

use crate::error::CodecError;
use crate::frame::{decode_frame, Frame};

/// Decodes and dispatches every event currently recorded in `store`,
/// starting at key 1. Stops and returns an error the moment a handler
/// resolves to nil or the stream is malformed; a host call failure is
/// logged and the drain continues with the next event.
pub fn dispatch_all(store: &BlobStore, host: &mut dyn ScriptHost) -> Result<(), CodecError> {
    let last = store.count() as Key;
    let mut key: Key = 1;
    while key <= last {
        key = dispatch_one(store, host, key)?;
    }
    Ok(())
}

/// Decodes and dispatches the single event starting at `start_key`,
/// returning the key just past it.
fn dispatch_one(store: &BlobStore, host: &mut dyn ScriptHost, start_key: Key) -> Result<Key, CodecError> {
    let mut key = start_key;

    let arg_count = match read_frame(store, key)? {
        Frame::Start { arg_count } => arg_count,
        _ => return Err(CodecError::UnknownVariant(0)),
    };
    key += 1;

    let handler_name = match read_frame(store, key)? {
        Frame::Arg(Value::String(bytes)) => String::from_utf8_lossy(&bytes).into_owned(),
        _ => return Err(CodecError::UnknownVariant(0)),
    };
    key += 1;

    let mut args = Vec::with_capacity(arg_count.saturating_sub(1) as usize);
    for _ in 1..arg_count {
        match read_frame(store, key)? {
            Frame::Arg(value) => args.push(value),
            _ => return Err(CodecError::UnknownVariant(0)),
        }
        key += 1;
    }

    match read_frame(store, key)? {
        Frame::End => {}
        _ => return Err(CodecError::UnknownVariant(0)),
    }
    key += 1;

    if host.global_is_nil(&handler_name) {
        return Err(CodecError::HandlerIsNil(handler_name));
    }

    for value in &args {
        host.push_value(value);
    }
    if let Err(call_err) = host.call_global(&handler_name, args.len()) {
        tracing::warn!(handler = %handler_name, error = %call_err, "event handler call failed; event dropped");
    }

    Ok(key)
}

fn read_frame(store: &BlobStore, key: Key) -> Result<Frame, CodecError> {
    let bytes = store.get(key).expect("event stream key within bounds during drain");
    decode_frame(bytes)
}

/// Checks that `name` resolves to a callable global without calling it.
/// Unlike the nil check `dispatch_one` performs during decode (which is
/// fatal), a caller resolving ahead of a call (e.g. before constructing
/// and posting an event) can treat an unresolved handler as the
/// recoverable "missing optional handler" case from the error taxonomy.
pub fn resolve_handler(host: &dyn ScriptHost, name: &str) -> Result<(), CodecError> {
    if host.global_is_nil(name) {
        Err(CodecError::HandlerNotFound(name.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::encode_event;
    use comexe_host::MockHost;
    use std::sync::{Arc, Mutex};

    #[test]
    fn dispatches_registered_handler_with_trailing_arguments() {
        let mut host = MockHost::new();
        let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        host.register_global("greet", move |args| {
            received_clone.lock().unwrap().extend_from_slice(args);
            Ok(())
        });

        host.push_value(&Value::String(b"greet".to_vec()));
        host.push_value(&Value::String(b"hi".to_vec()));
        let mut store = BlobStore::new(4, 64);
        encode_event(&mut store, &host, 0, 1).unwrap();

        dispatch_all(&store, &mut host).unwrap();

        assert_eq!(*received.lock().unwrap(), vec![Value::String(b"hi".to_vec())]);
    }

    #[test]
    fn nil_handler_is_fatal() {
        let mut host = MockHost::new();
        host.push_value(&Value::String(b"missing".to_vec()));
        let mut store = BlobStore::new(4, 64);
        encode_event(&mut store, &host, 0, 0).unwrap();

        let err = dispatch_all(&store, &mut host).unwrap_err();
        assert!(matches!(err, CodecError::HandlerIsNil(name) if name == "missing"));
    }

    #[test]
    fn failed_call_is_swallowed_and_drain_continues() {
        let mut host = MockHost::new();
        host.register_global("boom", |_| Err(comexe_host::HostCallError("kaboom".into())));
        let calls: Arc<Mutex<u32>> = Arc::new(Mutex::new(0));
        let calls_clone = Arc::clone(&calls);
        host.register_global("after", move |_| {
            *calls_clone.lock().unwrap() += 1;
            Ok(())
        });

        let mut store = BlobStore::new(4, 64);
        host.push_value(&Value::String(b"boom".to_vec()));
        encode_event(&mut store, &host, 0, 0).unwrap();
        host.push_value(&Value::String(b"after".to_vec()));
        encode_event(&mut store, &host, 2, 2).unwrap();

        dispatch_all(&store, &mut host).unwrap();
        assert_eq!(*calls.lock().unwrap(), 1);
    }

    #[test]
    fn resolve_handler_distinguishes_missing_from_present() {
        let mut host = MockHost::new();
        host.register_global("present", |_| Ok(()));

        assert!(resolve_handler(&host, "present").is_ok());
        let err = resolve_handler(&host, "absent").unwrap_err();
        assert!(matches!(err, CodecError::HandlerNotFound(name) if name == "absent"));
    }

    #[test]
    fn multiple_events_dispatch_in_posted_order() {
        let mut host = MockHost::new();
        let order: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let order_clone = Arc::clone(&order);
        host.register_global("tick", move |args| {
            if let Some(Value::Integer(n)) = args.first() {
                order_clone.lock().unwrap().push(*n);
            }
            Ok(())
        });

        let mut store = BlobStore::new(4, 64);
        for n in [1i64, 2, 3] {
            let name_index = host.stack_len();
            host.push_value(&Value::String(b"tick".to_vec()));
            host.push_value(&Value::Integer(n));
            encode_event(&mut store, &host, name_index, name_index + 1).unwrap();
        }

        dispatch_all(&store, &mut host).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }
}
