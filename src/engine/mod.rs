// src/engine/mod.rs

//! Orchestration engine for treetask.
//!
//! This module ties together:
//! - the pure scheduler state machine ([`crate::dag`])
//! - task bodies, which are async closures over a shared context
//! - the async shell that dispatches ready bodies onto Tokio and feeds
//!   their outcomes back into the scheduler ([`runtime`])
//! - the session context every built-in task receives ([`session`])

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::errors::Result;

/// Canonical task name type used throughout the engine.
pub type TaskName = String;

/// Outcome of a task body for the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed,
}

pub type TaskFuture = Pin<Box<dyn Future<Output = Result<()>> + Send + 'static>>;

/// Work performed by a task. The body has finished once the returned
/// future resolves; an `Err` fails the task.
///
/// Implemented for any `Fn(Arc<C>) -> impl Future<Output = Result<()>>`,
/// so plain `async fn`s and closures can be registered directly.
pub trait TaskBody<C>: Send + Sync + 'static {
    fn call(&self, ctx: Arc<C>) -> TaskFuture;
}

impl<C, F, Fut> TaskBody<C> for F
where
    F: Fn(Arc<C>) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    fn call(&self, ctx: Arc<C>) -> TaskFuture {
        Box::pin(self(ctx))
    }
}

pub mod runtime;
pub mod session;

pub use runtime::{TaskGraph, TaskListing};
pub use session::{BuildSession, BuildSessionBuilder, EnvLookup};
