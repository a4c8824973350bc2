//! Cross-thread enqueue paths: unicast, broadcast, parent exit
//! notification, and the external-OS-notifier bridge.
//! See `SPEC_FULL.md` §4.G.

use std::sync::Arc;

use comexe_blobstore::Value;
use comexe_protocol::encode_event_values;

use crate::application::Application;
use crate::instance::{Instance, EVENTS_PENDING};

impl Application {
    /// Enqueues `(handler_name, args…)` onto `target_offset`'s mailbox.
    /// Returns `true` iff the offset was present at the instant of lookup;
    /// a stale offset is not an error.
    ///
    /// Lookup happens under the registry mutex; encoding happens under the
    /// target's own mailbox mutex, acquired only after the registry mutex
    /// has been released. This is stricter than, but consistent with, the
    /// mandated registry-before-event ordering.
    pub fn post(&self, target_offset: usize, handler_name: &str, args: &[Value]) -> bool {
        let instance = {
            let registry = self.registry.lock().unwrap();
            match registry.get(target_offset) {
                Some(instance) => Arc::clone(instance),
                None => return false,
            }
        };
        enqueue(&instance, handler_name, args);
        true
    }

    /// Enqueues `(handler_name, args…)` onto every instance present in the
    /// registry at the moment the broadcast began. The entire fan-out runs
    /// under the registry mutex, as mandated: instances created mid-
    /// broadcast may or may not observe the event.
    pub fn broadcast(&self, handler_name: &str, args: &[Value]) {
        let registry = self.registry.lock().unwrap();
        let mut targets = 0usize;
        for (_, instance) in registry.iter() {
            enqueue(instance, handler_name, args);
            targets += 1;
        }
        tracing::debug!(handler = handler_name, targets, "broadcast fan-out complete");
    }

    /// Synthesises `(exit_event_name, exiting_offset)` into `parent`'s
    /// mailbox, bypassing the registry validity check the exiting
    /// instance's own parent reference is trusted to still resolve.
    /// `parent = None` addresses the application's root placeholder, which
    /// silently absorbs the event (nothing ever drains it).
    pub(crate) fn post_exit(&self, parent: Option<usize>, exit_event_name: &str, exiting_offset: usize) {
        let args = [Value::Integer(exiting_offset as i64)];
        match parent {
            Some(offset) => {
                let instance = {
                    let registry = self.registry.lock().unwrap();
                    registry.get(offset).map(Arc::clone)
                };
                if let Some(instance) = instance {
                    enqueue(&instance, exit_event_name, &args);
                } else {
                    tracing::debug!(offset, "exit notification dropped: parent already gone");
                }
            }
            None => enqueue(&self.root, exit_event_name, &args),
        }
    }

    /// Enqueues `(handler_name, integer_code)` onto offset 1, the main
    /// instance. This is the bridge an out-of-band OS callback on a foreign
    /// thread uses to reach the event flow.
    pub fn notify_external(&self, handler_name: &str, integer_code: i64) {
        self.post(1, handler_name, &[Value::Integer(integer_code)]);
    }
}

fn enqueue(instance: &Instance, handler_name: &str, args: &[Value]) {
    let mut values = Vec::with_capacity(args.len() + 1);
    values.push(Value::String(handler_name.as_bytes().to_vec()));
    values.extend_from_slice(args);

    {
        let mut receive = instance.receive.lock().unwrap();
        encode_event_values(&mut receive, &values);
    }
    instance.set_state_bit(EVENTS_PENDING);
}
