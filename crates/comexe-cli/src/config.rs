//! `comexe.toml` loading. See `SPEC_FULL.md` §4.L.

use std::fs;
use std::path::Path;

use serde::Deserialize;

fn default_registry_initial_capacity() -> usize {
    comexe_runtime::REGISTRY_INITIAL_CAPACITY
}

fn default_event_buffer_slots() -> usize {
    16
}

fn default_event_buffer_bytes() -> usize {
    512
}

fn default_log_filter() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub registry_initial_capacity: usize,
    pub event_buffer_slots: usize,
    pub event_buffer_bytes: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry_initial_capacity: default_registry_initial_capacity(),
            event_buffer_slots: default_event_buffer_slots(),
            event_buffer_bytes: default_event_buffer_bytes(),
            log_filter: default_log_filter(),
        }
    }
}

impl Config {
    /// Loads `path` if it exists; a missing file falls back to defaults
    /// silently, but a present-and-unparsable file is a configuration
    /// error reported to the caller.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(err) => return Err(err).map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display())),
        };
        toml::from_str(&text).map_err(|err| anyhow::anyhow!("failed to parse {}: {err}", path.display()))
    }
}
