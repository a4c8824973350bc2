//! A recording/replaying [`ScriptHost`] double, letting the runtime and
//! protocol crates be exercised without an embedded interpreter.

use crate::host::{HostCallError, ScriptHost};
use comexe_blobstore::Value;
use std::collections::HashMap;

type GlobalFn = Box<dyn FnMut(&[Value]) -> Result<(), HostCallError> + Send>;

/// A test double standing in for an embedded interpreter. `push_value` /
/// `pull_value` act on a plain `Vec<Value>` stack; `call_global` looks up a
/// registered Rust closure by name and records every call it makes,
/// whether or not a closure was registered for it.
pub struct MockHost {
    stack: Vec<Value>,
    globals: HashMap<String, GlobalFn>,
    extra_slot: Option<u64>,
    preloaded: Vec<String>,
    next_ref: u64,
    live_refs: Vec<u64>,
    calls: Vec<(String, Vec<Value>)>,
    version: String,
}

impl MockHost {
    pub fn new() -> Self {
        Self {
            stack: Vec::new(),
            globals: HashMap::new(),
            extra_slot: None,
            preloaded: Vec::new(),
            next_ref: 1,
            live_refs: Vec::new(),
            calls: Vec::new(),
            version: "comexe-mockhost-test".to_string(),
        }
    }

    /// Registers a global function callable by `call_global`.
    pub fn register_global<F>(&mut self, name: impl Into<String>, handler: F)
    where
        F: FnMut(&[Value]) -> Result<(), HostCallError> + Send + 'static,
    {
        self.globals.insert(name.into(), Box::new(handler));
    }

    pub fn preloaded_modules(&self) -> &[String] {
        &self.preloaded
    }

    pub fn calls(&self) -> &[(String, Vec<Value>)] {
        &self.calls
    }

    pub fn live_ref_count(&self) -> usize {
        self.live_refs.len()
    }
}

impl Default for MockHost {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptHost for MockHost {
    fn stack_len(&self) -> usize {
        self.stack.len()
    }

    fn type_name_at(&self, index: usize) -> &'static str {
        self.stack.get(index).map(Value::type_name).unwrap_or("none")
    }

    fn is_integer_at(&self, index: usize) -> bool {
        matches!(self.stack.get(index), Some(Value::Integer(_)))
    }

    fn pull_integer_at(&self, index: usize) -> i64 {
        match self.stack.get(index) {
            Some(Value::Integer(v)) => *v,
            _ => 0,
        }
    }

    fn pull_double_at(&self, index: usize) -> f64 {
        match self.stack.get(index) {
            Some(Value::Double(v)) => *v,
            _ => 0.0,
        }
    }

    fn pull_boolean_at(&self, index: usize) -> bool {
        matches!(self.stack.get(index), Some(Value::Boolean(true)))
    }

    fn pull_opaque_at(&self, index: usize) -> u64 {
        match self.stack.get(index) {
            Some(Value::Opaque(v)) => *v,
            _ => 0,
        }
    }

    fn pull_string_at(&self, index: usize) -> Vec<u8> {
        match self.stack.get(index) {
            Some(Value::String(v)) => v.clone(),
            _ => Vec::new(),
        }
    }

    fn pull_value(&self, index: usize) -> Option<Value> {
        self.stack.get(index).cloned()
    }

    fn push_value(&mut self, value: &Value) {
        self.stack.push(value.clone());
    }

    fn call_global(&mut self, name: &str, arg_count: usize) -> Result<(), HostCallError> {
        let len = self.stack.len();
        if arg_count > len {
            return Err(HostCallError(format!(
                "call to '{name}' requested {arg_count} arguments but only {len} are on the stack"
            )));
        }
        let args = self.stack.split_off(len - arg_count);
        self.calls.push((name.to_string(), args.clone()));
        match self.globals.get_mut(name) {
            Some(handler) => handler(&args),
            None => Err(HostCallError(format!("attempt to call a nil value ('{name}')"))),
        }
    }

    fn global_is_nil(&self, name: &str) -> bool {
        !self.globals.contains_key(name)
    }

    fn set_extra_slot(&mut self, value: u64) {
        self.extra_slot = Some(value);
    }

    fn extra_slot(&self) -> Option<u64> {
        self.extra_slot
    }

    fn register_preload(&mut self, module_name: &str) {
        self.preloaded.push(module_name.to_string());
    }

    fn create_ref(&mut self) -> u64 {
        let handle = self.next_ref;
        self.next_ref += 1;
        self.live_refs.push(handle);
        handle
    }

    fn release_ref(&mut self, handle: u64) {
        self.live_refs.retain(|&h| h != handle);
    }

    fn version_string(&self) -> &str {
        &self.version
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn call_global_invokes_registered_handler_with_recorded_args() {
        let mut host = MockHost::new();
        let seen: Arc<Mutex<Vec<i64>>> = Arc::new(Mutex::new(Vec::new()));
        let seen_clone = Arc::clone(&seen);
        host.register_global("tick", move |args| {
            if let Some(Value::Integer(n)) = args.first() {
                seen_clone.lock().unwrap().push(*n);
            }
            Ok(())
        });

        host.push_value(&Value::Integer(7));
        host.call_global("tick", 1).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![7]);
        assert_eq!(host.calls(), &[("tick".to_string(), vec![Value::Integer(7)])]);
    }

    #[test]
    fn calling_undefined_global_is_an_error_and_is_nil() {
        let mut host = MockHost::new();
        assert!(host.global_is_nil("missing"));
        assert!(host.call_global("missing", 0).is_err());
    }

    #[test]
    fn refs_are_tracked_until_released() {
        let mut host = MockHost::new();
        let a = host.create_ref();
        let b = host.create_ref();
        assert_eq!(host.live_ref_count(), 2);
        host.release_ref(a);
        assert_eq!(host.live_ref_count(), 1);
        host.release_ref(b);
        assert_eq!(host.live_ref_count(), 0);
    }
}
