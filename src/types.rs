// src/types.rs

use std::fmt;

/// Kind of a filesystem entry as seen at visit time.
///
/// Anything that is neither a directory nor a regular file (sockets, FIFOs,
/// symlinks pointing nowhere) is `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Directory,
    File,
    Other,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EntryKind::Directory => "directory",
            EntryKind::File => "file",
            EntryKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Whether the task graph waits for a task before dispatching the next one.
///
/// - `Blocking`: the graph suspends until the task body completes
///   (default behaviour).
/// - `Background`: the body is spawned and the graph moves on. Dependents
///   may start as soon as it has been dispatched, and the invocation does
///   not return until every background task has finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TaskMode {
    #[default]
    Blocking,
    Background,
}

impl fmt::Display for TaskMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskMode::Blocking => f.write_str("blocking"),
            TaskMode::Background => f.write_str("background"),
        }
    }
}
