// src/walk/walker.rs

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::fs::{EntryStat, FileSystem};
use crate::types::EntryKind;

use super::fan_in::{FanIn, Release};
use super::{blocking, WalkError};

/// A regular file observed during a walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    pub kind: EntryKind,
    pub modified: Option<SystemTime>,
}

/// One call into the per-file callback.
///
/// `entry` is `Err` when stat-ing or listing `path` failed. In both cases
/// the branch stays open until `release` is dropped; move it into a spawned
/// task to keep the walk open while asynchronous work on the file runs.
#[derive(Debug)]
pub struct Visit {
    pub path: PathBuf,
    pub entry: Result<FileEntry, WalkError>,
    pub release: Release,
}

/// Totals for a finished walk.
#[derive(Debug, Clone, Default)]
pub struct WalkSummary {
    pub root: PathBuf,
    pub files: usize,
    pub directories: usize,
    pub others: usize,
    /// Entries listed by their parent but gone by the time they were stat-ed
    /// or, for directories, listed.
    pub vanished: usize,
    /// Entries that could not be stat-ed at all.
    pub failed: usize,
    /// Branches retired; equals the number of entries reached.
    pub retired: usize,
    pub errors: Vec<WalkError>,
}

impl WalkSummary {
    pub fn entries(&self) -> usize {
        self.files + self.directories + self.others + self.vanished + self.failed
    }

    /// Turn the first recorded error (if any) into an `Err`.
    pub fn into_result(self) -> Result<Self, WalkError> {
        match self.errors.first() {
            Some(err) => Err(err.clone()),
            None => Ok(self),
        }
    }
}

type OnFile = dyn Fn(Visit) + Send + Sync;

/// Asynchronous recursive directory walker.
#[derive(Clone)]
pub struct Walker {
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for Walker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Walker").field("fs", &self.fs).finish()
    }
}

impl Walker {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    /// Visit every entry under `root`, calling `on_file` once per regular
    /// file and once per failed entry.
    ///
    /// The returned future resolves exactly once, after every branch
    /// (including releases held by `on_file`) has been retired. Siblings are
    /// visited concurrently and in no particular order.
    pub async fn walk<F>(&self, root: impl Into<PathBuf>, on_file: F) -> WalkSummary
    where
        F: Fn(Visit) + Send + Sync + 'static,
    {
        let root = root.into();
        let session = Arc::new(WalkSession {
            fs: Arc::clone(&self.fs),
            on_file: Box::new(on_file),
            fan_in: FanIn::new(),
            counts: Counts::default(),
        });

        debug!(root = ?root, "walk started");
        WalkSession::scan(&session, root.clone(), true);
        session.fan_in.wait().await;

        let summary = session.summary(root);
        debug!(
            root = ?summary.root,
            files = summary.files,
            directories = summary.directories,
            errors = summary.errors.len(),
            "walk finished"
        );
        summary
    }

    /// Callback-style walk: `on_done` fires once with the summary when the
    /// whole subtree is exhausted.
    pub fn spawn_walk<F, D>(&self, root: impl Into<PathBuf>, on_file: F, on_done: D) -> JoinHandle<()>
    where
        F: Fn(Visit) + Send + Sync + 'static,
        D: FnOnce(WalkSummary) + Send + 'static,
    {
        let walker = self.clone();
        let root = root.into();
        tokio::spawn(async move {
            let summary = walker.walk(root, on_file).await;
            on_done(summary);
        })
    }
}

#[derive(Debug, Default)]
struct Counts {
    files: AtomicUsize,
    directories: AtomicUsize,
    others: AtomicUsize,
    vanished: AtomicUsize,
    failed: AtomicUsize,
}

/// State owned by a single traversal; never shared across walks.
struct WalkSession {
    fs: Arc<dyn FileSystem>,
    on_file: Box<OnFile>,
    fan_in: FanIn,
    counts: Counts,
}

impl WalkSession {
    /// Open a branch for `path` and start visiting it.
    fn scan(session: &Arc<Self>, path: PathBuf, is_root: bool) {
        let release = session.fan_in.enter();
        let session = Arc::clone(session);
        tokio::spawn(async move {
            session.visit(path, is_root, release).await;
        });
    }

    async fn visit(self: Arc<Self>, path: PathBuf, is_root: bool, release: Release) {
        let stat = {
            let fs = Arc::clone(&self.fs);
            let target = path.clone();
            blocking(move || fs.stat(&target)).await
        };

        let stat: EntryStat = match stat {
            Ok(stat) => stat,
            Err(err) if !is_root && is_not_found(&err) => {
                trace!(path = ?path, "entry vanished before stat; skipping");
                self.counts.vanished.fetch_add(1, Ordering::AcqRel);
                return;
            }
            Err(err) => {
                self.counts.failed.fetch_add(1, Ordering::AcqRel);
                self.fail(path, err, release);
                return;
            }
        };

        match stat.kind {
            EntryKind::Directory => {
                let listing = {
                    let fs = Arc::clone(&self.fs);
                    let target = path.clone();
                    blocking(move || fs.read_dir(&target)).await
                };
                match listing {
                    Ok(children) => {
                        self.counts.directories.fetch_add(1, Ordering::AcqRel);
                        trace!(path = ?path, children = children.len(), "descending");
                        for child in children {
                            Self::scan(&self, child, false);
                        }
                        // Children hold their own tokens now.
                        release.release();
                    }
                    Err(err) if !is_root && is_not_found(&err) => {
                        trace!(path = ?path, "directory vanished before listing; skipping");
                        self.counts.vanished.fetch_add(1, Ordering::AcqRel);
                    }
                    Err(err) => {
                        self.counts.directories.fetch_add(1, Ordering::AcqRel);
                        self.fail(path, err, release);
                    }
                }
            }
            EntryKind::File => {
                self.counts.files.fetch_add(1, Ordering::AcqRel);
                let entry = FileEntry {
                    path: path.clone(),
                    kind: EntryKind::File,
                    modified: stat.modified,
                };
                (self.on_file)(Visit {
                    path,
                    entry: Ok(entry),
                    release,
                });
            }
            EntryKind::Other => {
                self.counts.others.fetch_add(1, Ordering::AcqRel);
                trace!(path = ?path, "skipping non-regular entry");
            }
        }
    }

    fn fail(&self, path: PathBuf, err: anyhow::Error, release: Release) {
        let error = WalkError::new(&path, &err);
        warn!(path = ?path, error = %error, "walk error");
        self.fan_in.record_failure(error.clone());
        (self.on_file)(Visit {
            path,
            entry: Err(error),
            release,
        });
    }

    fn summary(&self, root: PathBuf) -> WalkSummary {
        WalkSummary {
            root,
            files: self.counts.files.load(Ordering::Acquire),
            directories: self.counts.directories.load(Ordering::Acquire),
            others: self.counts.others.load(Ordering::Acquire),
            vanished: self.counts.vanished.load(Ordering::Acquire),
            failed: self.counts.failed.load(Ordering::Acquire),
            retired: self.fan_in.retired(),
            errors: self.fan_in.failures(),
        }
    }
}

fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<io::Error>()
        .is_some_and(|e| e.kind() == io::ErrorKind::NotFound)
}

