// src/watch/poller.rs

use std::future::Future;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::errors::Result;
use crate::walk::{Visit, Walker};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::WatchFilter;
use crate::watch::state::{format_mtime, WatchState};

/// Polling change detector: one tree walk per cycle, mtimes diffed
/// against the previous cycle.
pub struct Poller {
    walker: Walker,
    root: PathBuf,
    filter: WatchFilter,
    interval: Duration,
    state: WatchState,
}

impl Poller {
    pub fn new(walker: Walker, root: impl Into<PathBuf>, filter: WatchFilter, interval: Duration) -> Self {
        Self {
            walker,
            root: root.into(),
            filter,
            interval,
            state: WatchState::new(),
        }
    }

    pub fn state(&self) -> &WatchState {
        &self.state
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Walk the tree once and return every tracked file whose mtime is new
    /// or different, sorted. The first cycle reports every tracked file.
    pub async fn poll_once(&mut self) -> Result<Vec<PathBuf>> {
        let root = self.root.clone();
        let filter = self.filter.clone();
        let observed: Arc<Mutex<Vec<(PathBuf, String)>>> = Arc::default();
        let sink = Arc::clone(&observed);

        let summary = self
            .walker
            .walk(self.root.clone(), move |visit: Visit| {
                let Ok(entry) = &visit.entry else {
                    return;
                };
                let tracked = relative_str(&root, &visit.path)
                    .is_some_and(|rel| filter.matches(&rel));
                if tracked {
                    let mtime = format_mtime(entry.modified);
                    sink.lock()
                        .unwrap_or_else(|p| p.into_inner())
                        .push((visit.path.clone(), mtime));
                }
            })
            .await;

        summary.into_result()?;

        let observed = std::mem::take(&mut *observed.lock().unwrap_or_else(|p| p.into_inner()));
        let mut changed: Vec<PathBuf> = observed
            .into_iter()
            .filter_map(|(path, mtime)| self.state.observe(&path, mtime).then_some(path))
            .collect();
        changed.sort();

        debug!(tracked = self.state.len(), changed = changed.len(), "poll cycle finished");
        Ok(changed)
    }

    /// Poll until `cancel` fires, calling `on_change` once for every cycle
    /// that saw at least one change. Returns the number of cycles that
    /// triggered `on_change`.
    ///
    /// An error from the walk or from `on_change` ends the loop.
    pub async fn run<F, Fut>(&mut self, cancel: CancellationToken, mut on_change: F) -> Result<usize>
    where
        F: FnMut(Vec<PathBuf>) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let mut triggered = 0;

        loop {
            let changed = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                res = self.poll_once() => res?,
            };

            if !changed.is_empty() {
                triggered += 1;
                info!(files = changed.len(), "change detected");
                on_change(changed).await?;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }

        debug!(cycles = triggered, "watch loop cancelled");
        Ok(triggered)
    }
}

/// Watch `root` every `interval`, calling `on_change` for each cycle with
/// changes, until `cancel` fires.
pub async fn watch<F, Fut>(
    walker: Walker,
    root: impl Into<PathBuf>,
    filter: WatchFilter,
    interval: Duration,
    cancel: CancellationToken,
    on_change: F,
) -> Result<usize>
where
    F: FnMut(Vec<PathBuf>) -> Fut,
    Fut: Future<Output = Result<()>>,
{
    Poller::new(walker, root, filter, interval)
        .run(cancel, on_change)
        .await
}
