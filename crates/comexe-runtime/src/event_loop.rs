//! Cooperative wait loop driven by an instance's state bits.
//! See `SPEC_FULL.md` §4.H.

use comexe_blobstore::BlobStore;
use comexe_host::ScriptHost;
use comexe_protocol::{dispatch_all, CodecError};

use crate::instance::{Instance, EVENTS_PENDING, LOOP_CLOSE_REQUEST};

/// Drives one instance's event loop. Owns the `temp` half of the mailbox
/// directly, once a drain swaps it in, nothing but this loop ever touches
/// it, so decoding never contends with producers posting to `receive`.
pub struct EventLoop<'a> {
    instance: &'a Instance,
    temp: BlobStore,
}

impl<'a> EventLoop<'a> {
    pub fn new(instance: &'a Instance) -> Self {
        Self {
            instance,
            temp: BlobStore::new(instance.mailbox_initial_slots(), instance.mailbox_initial_bytes()),
        }
    }

    /// Blocks until `stoploop` is observed, draining and dispatching
    /// events as they arrive. Spurious wake-ups are handled by
    /// re-evaluating the predicate under the state mutex.
    pub fn run(&mut self, host: &mut dyn ScriptHost) {
        loop {
            self.drain(host);

            let mut state = self.instance.state_mutex.lock().unwrap();
            while *state & (EVENTS_PENDING | LOOP_CLOSE_REQUEST) == 0 {
                state = self.instance.state_condvar.wait(state).unwrap();
            }
            let should_continue = *state & LOOP_CLOSE_REQUEST == 0;
            drop(state);

            if !should_continue {
                break;
            }
        }
    }

    /// Performs exactly one `drain()` without blocking.
    pub fn run_once(&mut self, host: &mut dyn ScriptHost) {
        self.drain(host);
    }

    /// Swaps in and decodes a full batch of pending events. A malformed
    /// stream, an unsupported argument type, or a handler that resolves to
    /// nil is a non-recoverable semantic error: this terminates the process
    /// with the matching exit code rather than returning.
    fn drain(&mut self, host: &mut dyn ScriptHost) {
        {
            let mut receive = self.instance.receive.lock().unwrap();
            if receive.count() == 0 {
                return;
            }
            std::mem::swap(&mut *receive, &mut self.temp);
        }
        // event_mutex is released above before state_mutex is taken here.
        self.instance.clear_state_bit(EVENTS_PENDING);

        if let Err(err) = dispatch_all(&self.temp, host) {
            let exit_code = match &err {
                CodecError::UnsupportedArgument { .. } => 2,
                CodecError::HandlerIsNil(_) | CodecError::HandlerNotFound(_) => 3,
                CodecError::UnknownVariant(_) => 4,
            };
            tracing::error!(instance = self.instance.offset(), error = %err, exit_code, "fatal event decode failure");
            std::process::exit(exit_code);
        }

        self.temp.reset();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use comexe_blobstore::Value;
    use comexe_host::MockHost;
    use comexe_protocol::encode_event_values;
    use std::sync::{Arc, Mutex};

    #[test]
    fn run_once_dispatches_pending_events_then_returns() {
        let instance = Instance::new(1, "main".into(), None, None);
        {
            let mut receive = instance.receive.lock().unwrap();
            encode_event_values(&mut receive, &[Value::String(b"greet".to_vec()), Value::String(b"hi".to_vec())]);
        }
        instance.set_state_bit(EVENTS_PENDING);

        let received: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let received_clone = Arc::clone(&received);
        let mut host = MockHost::new();
        host.register_global("greet", move |args| {
            received_clone.lock().unwrap().extend_from_slice(args);
            Ok(())
        });

        let mut event_loop = EventLoop::new(&instance);
        event_loop.run_once(&mut host);

        assert_eq!(*received.lock().unwrap(), vec![Value::String(b"hi".to_vec())]);
        assert_eq!(instance.state_bits() & EVENTS_PENDING, 0);
    }

    #[test]
    fn run_exits_once_loop_close_request_is_observed() {
        let instance = Instance::new(1, "main".into(), None, None);
        instance.stop_loop();

        let mut host = MockHost::new();
        let mut event_loop = EventLoop::new(&instance);
        event_loop.run(&mut host); // must return promptly, not hang
    }

    #[test]
    fn events_from_a_single_producer_dispatch_in_posted_order() {
        let instance = Instance::new(1, "main".into(), None, None);
        {
            let mut receive = instance.receive.lock().unwrap();
            for n in [1i64, 2, 3] {
                encode_event_values(&mut receive, &[Value::String(b"tick".to_vec()), Value::Integer(n)]);
            }
        }
        instance.set_state_bit(EVENTS_PENDING);

        let order: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let order_clone = Arc::clone(&order);
        let mut host = MockHost::new();
        host.register_global("tick", move |args| {
            if let Some(Value::Integer(n)) = args.first() {
                order_clone.lock().unwrap().push(*n);
            }
            Ok(())
        });

        EventLoop::new(&instance).run_once(&mut host);
        assert_eq!(*order.lock().unwrap(), vec![1, 2, 3]);
    }
}
