mod host;
mod mock;

pub use host::{HostCallError, ScriptHost};
pub use mock::MockHost;
