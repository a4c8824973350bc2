//! One OS-thread-bound scripting interpreter and its mailbox.
//! See `SPEC_FULL.md` §3/§4.E.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

use comexe_blobstore::BlobStore;

pub const ACTIVE: u8 = 1 << 0;
pub const EVENTS_PENDING: u8 = 1 << 1;
pub const LOOP_CLOSE_REQUEST: u8 = 1 << 2;

pub(crate) const MAILBOX_INITIAL_SLOTS: usize = 16;
pub(crate) const MAILBOX_INITIAL_BYTES: usize = 512;

/// References a previously-created registry reference on the owning
/// instance's scripting host (`event.seteventhandler` / `setwarningfunction`).
#[derive(Default)]
pub(crate) struct HostRefs {
    pub(crate) handler: Option<u64>,
    pub(crate) warning: Option<u64>,
}

pub struct Instance {
    /// Assigned by the registry at insertion time, which happens after
    /// this record is constructed. `create_instance` builds the record
    /// with a placeholder and fixes it up once the registry hands back a
    /// real offset, before the record is ever shared beyond that function.
    offset: AtomicUsize,
    pub(crate) module_name: String,
    pub(crate) exit_event_name: Option<String>,
    /// Weak reference into the registry; `None` means the application's
    /// root placeholder rather than a dangling offset.
    pub(crate) parent: Option<usize>,
    pub(crate) state_mutex: Mutex<u8>,
    pub(crate) state_condvar: Condvar,
    /// The producer-facing half of the mailbox. The consumer-facing
    /// `temp` buffer is *not* stored here; it is exclusively owned by
    /// the instance's `EventLoop` once swapped in, so decoding never
    /// contends with producers. See `SPEC_FULL.md` §4.H.
    pub(crate) receive: Mutex<BlobStore>,
    pub(crate) host_refs: Mutex<HostRefs>,
    pub(crate) thread: Mutex<Option<JoinHandle<()>>>,
    mailbox_initial_slots: usize,
    mailbox_initial_bytes: usize,
}

impl Instance {
    pub(crate) fn new(
        offset: usize,
        module_name: String,
        exit_event_name: Option<String>,
        parent: Option<usize>,
    ) -> Arc<Self> {
        Self::with_mailbox_capacity(
            offset,
            module_name,
            exit_event_name,
            parent,
            MAILBOX_INITIAL_SLOTS,
            MAILBOX_INITIAL_BYTES,
        )
    }

    /// Same as `new`, but with the mailbox's initial capacity taken from
    /// the owning application's configuration instead of the defaults.
    pub(crate) fn with_mailbox_capacity(
        offset: usize,
        module_name: String,
        exit_event_name: Option<String>,
        parent: Option<usize>,
        mailbox_initial_slots: usize,
        mailbox_initial_bytes: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            offset: AtomicUsize::new(offset),
            module_name,
            exit_event_name,
            parent,
            state_mutex: Mutex::new(0),
            state_condvar: Condvar::new(),
            receive: Mutex::new(BlobStore::new(mailbox_initial_slots, mailbox_initial_bytes)),
            host_refs: Mutex::new(HostRefs::default()),
            thread: Mutex::new(None),
            mailbox_initial_slots,
            mailbox_initial_bytes,
        })
    }

    /// The application's root placeholder: has mailbox and state like any
    /// instance, but offset 0 (never a valid registry offset), no parent,
    /// and is never given a thread. Exists purely so `PostExit` has a
    /// uniform destination when an instance's parent is "nothing".
    pub(crate) fn new_root() -> Arc<Self> {
        Self::new(0, "root".to_string(), None, None)
    }

    pub(crate) fn mailbox_initial_slots(&self) -> usize {
        self.mailbox_initial_slots
    }

    pub(crate) fn mailbox_initial_bytes(&self) -> usize {
        self.mailbox_initial_bytes
    }

    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Relaxed)
    }

    pub(crate) fn set_offset(&self, offset: usize) {
        self.offset.store(offset, Ordering::Relaxed);
    }

    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    pub fn exit_event_name(&self) -> Option<&str> {
        self.exit_event_name.as_deref()
    }

    pub fn parent(&self) -> Option<usize> {
        self.parent
    }

    pub(crate) fn set_state_bit(&self, bit: u8) {
        let mut state = self.state_mutex.lock().unwrap();
        *state |= bit;
        self.state_condvar.notify_all();
    }

    pub(crate) fn clear_state_bit(&self, bit: u8) {
        let mut state = self.state_mutex.lock().unwrap();
        *state &= !bit;
    }

    pub(crate) fn state_bits(&self) -> u8 {
        *self.state_mutex.lock().unwrap()
    }

    /// Sets `ACTIVE` and signals the creator, the first thing a newly
    /// spawned instance thread does.
    pub(crate) fn mark_active(&self) {
        self.set_state_bit(ACTIVE);
    }

    /// Blocks until `ACTIVE` is set, used by `create_instance` to wait for
    /// the new thread's bootstrap to report in.
    pub(crate) fn wait_until_active(&self) {
        let mut state = self.state_mutex.lock().unwrap();
        while *state & ACTIVE == 0 {
            state = self.state_condvar.wait(state).unwrap();
        }
    }

    /// `stoploop`: requests the event loop exit after finishing its
    /// current drain.
    pub fn stop_loop(&self) {
        self.set_state_bit(LOOP_CLOSE_REQUEST);
    }
}
