// src/watch/mod.rs

//! Polling change detection.
//!
//! This module is responsible for:
//! - Compiling the `[watch]` include/exclude globs (`patterns.rs`).
//! - Remembering the last seen modification time per file (`state.rs`).
//! - Repeating a tree walk on an interval and reporting changed files until
//!   a cancellation token fires (`poller.rs`).
//!
//! It does **not** know what a change should trigger; callers pass a
//! callback (the `autotest` task reruns the test command).

pub mod path_utils;
pub mod patterns;
pub mod poller;
pub mod state;

pub use patterns::WatchFilter;
pub use poller::{watch, Poller};
pub use state::{format_mtime, WatchState};
