//! Owns the instance registry, the root placeholder, and the two pieces of
//! process-wide state every instance can read: the bootstrap script and the
//! loader configuration string. See `SPEC_FULL.md` §3/§4.F.

use std::sync::{Arc, Mutex};

use comexe_blobstore::StableIndexRegistry;

use crate::instance::Instance;

pub const REGISTRY_INITIAL_CAPACITY: usize = 16;
/// `loader_configuration` is bounded to 15 bytes, matching a fixed-size
/// host-visible buffer plus its terminator; the terminator itself is never
/// stored here since `Vec<u8>` tracks its own length.
pub const LOADER_CONFIGURATION_MAX_LEN: usize = 15;

pub struct Application {
    pub(crate) registry: Mutex<StableIndexRegistry<Arc<Instance>>>,
    pub(crate) root: Arc<Instance>,
    mailbox_initial_slots: usize,
    mailbox_initial_bytes: usize,
    loader_configuration: Mutex<Vec<u8>>,
    startup_script: Vec<u8>,
    args: Vec<String>,
}

impl Application {
    pub fn new(startup_script: Vec<u8>, args: Vec<String>) -> Arc<Self> {
        Self::with_registry_capacity(
            REGISTRY_INITIAL_CAPACITY,
            crate::instance::MAILBOX_INITIAL_SLOTS,
            crate::instance::MAILBOX_INITIAL_BYTES,
            startup_script,
            args,
        )
    }

    pub fn with_registry_capacity(
        registry_initial_capacity: usize,
        mailbox_initial_slots: usize,
        mailbox_initial_bytes: usize,
        startup_script: Vec<u8>,
        args: Vec<String>,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry: Mutex::new(StableIndexRegistry::new(registry_initial_capacity)),
            root: Instance::new_root(),
            mailbox_initial_slots,
            mailbox_initial_bytes,
            loader_configuration: Mutex::new(Vec::new()),
            startup_script,
            args,
        })
    }

    pub(crate) fn mailbox_initial_slots(&self) -> usize {
        self.mailbox_initial_slots
    }

    pub(crate) fn mailbox_initial_bytes(&self) -> usize {
        self.mailbox_initial_bytes
    }

    pub fn startup_script(&self) -> &[u8] {
        &self.startup_script
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Lock-free-to-callers snapshot read: takes the lock internally but
    /// there is no broadcast of updates to already-running instances, so
    /// callers always see either the value in effect when they were
    /// created or a later writer's value, never a torn one.
    pub fn loader_configuration(&self) -> Vec<u8> {
        self.loader_configuration.lock().unwrap().clone()
    }

    /// Rejects (returns `false`) without mutating state if `value` exceeds
    /// the 15-byte bound.
    pub fn set_loader_configuration(&self, value: &[u8]) -> bool {
        if value.len() > LOADER_CONFIGURATION_MAX_LEN {
            return false;
        }
        *self.loader_configuration.lock().unwrap() = value.to_vec();
        true
    }

    pub fn instance_count(&self) -> usize {
        self.registry.lock().unwrap().iter().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_configuration_rejects_values_over_the_bound() {
        let app = Application::new(Vec::new(), Vec::new());
        assert!(app.set_loader_configuration(b"short"));
        assert_eq!(app.loader_configuration(), b"short");
        assert!(!app.set_loader_configuration(b"this string is far too long"));
        assert_eq!(app.loader_configuration(), b"short"); // unchanged
    }

    #[test]
    fn exactly_fifteen_bytes_is_accepted() {
        let app = Application::new(Vec::new(), Vec::new());
        assert!(app.set_loader_configuration(&[b'x'; 15]));
        assert!(!app.set_loader_configuration(&[b'x'; 16]));
    }
}
