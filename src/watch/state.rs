// src/watch/state.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, SecondsFormat, Utc};

/// Rendering used for entries whose modification time is unavailable.
pub const UNKNOWN_MTIME: &str = "unknown";

/// Last observed modification time per tracked file.
///
/// Lives for the lifetime of one watch loop; nothing is persisted.
#[derive(Debug, Clone, Default)]
pub struct WatchState {
    seen: HashMap<PathBuf, String>,
}

impl WatchState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `mtime` for `path`. Returns true if the path was unknown or
    /// its stored value differed.
    pub fn observe(&mut self, path: &Path, mtime: String) -> bool {
        match self.seen.get_mut(path) {
            Some(prev) if *prev == mtime => false,
            Some(prev) => {
                *prev = mtime;
                true
            }
            None => {
                self.seen.insert(path.to_path_buf(), mtime);
                true
            }
        }
    }

    pub fn get(&self, path: &Path) -> Option<&str> {
        self.seen.get(path).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Stable string form of a modification time, to nanosecond precision.
pub fn format_mtime(modified: Option<SystemTime>) -> String {
    match modified {
        Some(t) => DateTime::<Utc>::from(t).to_rfc3339_opts(SecondsFormat::Nanos, true),
        None => UNKNOWN_MTIME.to_string(),
    }
}
