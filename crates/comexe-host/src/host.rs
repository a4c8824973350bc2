//! The abstract capability boundary the runtime consumes from whatever
//! scripting interpreter is embedded. Every method here is called only from
//! the thread that owns the interpreter state, see `SPEC_FULL.md` §5.
//!
//! A real embedded interpreter, such as Lua, is a leaf consumer of this
//! trait and lives outside this crate.

use comexe_blobstore::Value;

/// Error surfaced by a failed host call, carrying the interpreter's own
/// error string (retrieved the way the interpreter retrieves it after a
/// failed protected call).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCallError(pub String);

impl std::fmt::Display for HostCallError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for HostCallError {}

/// Capability surface a scripting interpreter must expose for the runtime
/// to encode/decode events and invoke named globals.
pub trait ScriptHost {
    /// Number of values currently on the interpreter's value stack.
    fn stack_len(&self) -> usize;

    /// Type category of the value at `index`: `"number"`, `"boolean"`,
    /// `"nil"`, `"userdata"`, `"string"`, or `"none"` past the end of the
    /// stack. `"number"` collapses integers and doubles into one category,
    /// matching an interpreter whose numeric values carry no static
    /// int/float distinction at the type-tag level; [`ScriptHost::is_integer_at`]
    /// is how a caller tells them apart within that category. Any other
    /// string names a type the protocol does not carry and is unsupported.
    fn type_name_at(&self, index: usize) -> &'static str;

    /// Within the `"number"` category reported by `type_name_at`, true if
    /// the value at `index` should be encoded as `Value::Integer` rather
    /// than `Value::Double`. Not meaningful, and not called, for any other
    /// category.
    fn is_integer_at(&self, index: usize) -> bool;

    /// Reads the stack slot at `index` as an integer. Only called once
    /// `type_name_at`/`is_integer_at` have identified the slot as an
    /// integer-valued number; implementations need not handle a mismatch.
    fn pull_integer_at(&self, index: usize) -> i64;

    /// Reads the stack slot at `index` as a double. Only called once
    /// `type_name_at`/`is_integer_at` have identified the slot as a
    /// double-valued number.
    fn pull_double_at(&self, index: usize) -> f64;

    /// Reads the stack slot at `index` as a boolean. Only called once
    /// `type_name_at` has reported `"boolean"` for that slot.
    fn pull_boolean_at(&self, index: usize) -> bool;

    /// Reads the stack slot at `index` as an opaque handle. Only called
    /// once `type_name_at` has reported `"userdata"` for that slot.
    fn pull_opaque_at(&self, index: usize) -> u64;

    /// Reads the stack slot at `index` as a byte string. Only called once
    /// `type_name_at` has reported `"string"` for that slot.
    fn pull_string_at(&self, index: usize) -> Vec<u8>;

    /// Reads the stack slot at `index` into a protocol [`Value`] in one
    /// step, without going through the per-category accessors above. Used
    /// to read back a value a caller already knows the shape of, such as a
    /// handler's own return value, where there is nothing to dispatch on.
    fn pull_value(&self, index: usize) -> Option<Value>;

    /// Pushes `value` onto the interpreter's stack, to be consumed by the
    /// next `call_global`.
    fn push_value(&mut self, value: &Value);

    /// Calls the global function named `name` with the top `arg_count`
    /// stack values as arguments. `Ok` on success; `Err` carries the
    /// interpreter's own error string on failure.
    fn call_global(&mut self, name: &str, arg_count: usize) -> Result<(), HostCallError>;

    /// True if `name` is not bound to a callable global.
    fn global_is_nil(&self, name: &str) -> bool;

    /// Attaches an opaque value (the owning instance's registry offset) to
    /// this interpreter state's per-state extra slot.
    fn set_extra_slot(&mut self, value: u64);

    /// Reads back the value attached by [`ScriptHost::set_extra_slot`].
    fn extra_slot(&self) -> Option<u64>;

    /// Registers `module_name` in the interpreter's preload table so a
    /// later `require(module_name)` call resolves without eager loading.
    fn register_preload(&mut self, module_name: &str);

    /// Creates a registry reference to the callable currently on top of
    /// the stack, returning an opaque handle.
    fn create_ref(&mut self) -> u64;

    /// Releases a previously created registry reference.
    fn release_ref(&mut self, handle: u64);

    /// Build-identifying text, shared by `--comexe-version` and the
    /// in-script `runtime.version()` global.
    fn version_string(&self) -> &str;
}
