// src/pipeline/minify.rs

//! Two-pass minify stage.
//!
//! 1. Deletion pass: every `*.min.<ext>` under the library root is removed,
//!    so artifacts stamped with an old version cannot survive.
//! 2. Generation pass: every source module is piped through the external
//!    minifier, prefixed with a banner, and written twice into the output
//!    directory: `<module>-<version>.min.<ext>` and
//!    `<module>-latest.min.<ext>`.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, SecondsFormat, Utc};
use tracing::{debug, info};

use crate::errors::Result;
use crate::exec::runner::{run_checked, CommandRunner, CommandSpec};
use crate::fs::FileSystem;
use crate::pipeline::classify::{Classifier, FileClass};
use crate::pipeline::version::VersionToken;
use crate::walk::{blocking, Visit, WalkError, Walker};

/// Marker used in place of the version for the always-current artifact.
pub const LATEST_MARKER: &str = "latest";

pub type MinifyFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// Source-to-source transform applied to every module.
pub trait Minifier: Send + Sync {
    fn minify(&self, source: String) -> MinifyFuture<'_>;
}

/// Minifier that pipes source through an external program's stdin and
/// reads the result from its stdout.
pub struct CommandMinifier {
    runner: Arc<dyn CommandRunner>,
    program: String,
    args: Vec<String>,
}

impl CommandMinifier {
    pub fn new(runner: Arc<dyn CommandRunner>, program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            runner,
            program: program.into(),
            args,
        }
    }
}

impl Minifier for CommandMinifier {
    fn minify(&self, source: String) -> MinifyFuture<'_> {
        Box::pin(async move {
            let spec = CommandSpec::new(&self.program)
                .args(self.args.iter().cloned())
                .stdin(source)
                .capture_stdout();
            let output = run_checked(self.runner.as_ref(), spec).await?;
            Ok(output.stdout)
        })
    }
}

/// Header stamped on every generated artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub project: String,
    pub url: String,
    pub version: VersionToken,
    pub built: DateTime<Utc>,
}

impl Banner {
    pub fn render(&self, module: &str, extension: &str) -> String {
        format!(
            "// -- {project} -- {module}.{extension}\n// {url}\n// Version: {version}\n// Built: {built}\n",
            project = self.project,
            url = self.url,
            version = self.version,
            built = self.built.to_rfc3339_opts(SecondsFormat::Secs, true),
        )
    }
}

/// File names for a module's two artifacts: (versioned, latest).
pub fn artifact_names(module: &str, version: &VersionToken, extension: &str) -> (String, String) {
    (
        format!("{module}-{version}.min.{extension}"),
        format!("{module}-{LATEST_MARKER}.min.{extension}"),
    )
}

/// What a minify run touched. Both lists are sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MinifyReport {
    pub deleted: Vec<PathBuf>,
    pub generated: Vec<PathBuf>,
}

pub struct MinifyStage {
    walker: Walker,
    classifier: Classifier,
    minifier: Arc<dyn Minifier>,
    lib_dir: PathBuf,
    output_dir: PathBuf,
}

impl MinifyStage {
    pub fn new(
        walker: Walker,
        classifier: Classifier,
        minifier: Arc<dyn Minifier>,
        lib_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            walker,
            classifier,
            minifier,
            lib_dir: lib_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    /// Run both passes. The generation pass only starts once every deletion
    /// has completed.
    pub async fn run(&self, banner: &Banner) -> Result<MinifyReport> {
        let deleted = self.delete_artifacts().await?;
        let generated = self.generate(banner).await?;
        info!(
            deleted = deleted.len(),
            generated = generated.len(),
            "Done."
        );
        Ok(MinifyReport { deleted, generated })
    }

    /// Deletion pass.
    pub async fn delete_artifacts(&self) -> Result<Vec<PathBuf>> {
        let fs = Arc::clone(self.walker.fs());
        let classifier = self.classifier.clone();
        let root = self.lib_dir.clone();
        let deleted: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let sink = Arc::clone(&deleted);

        let summary = self
            .walker
            .walk(self.lib_dir.clone(), move |visit: Visit| {
                let Visit { path, entry, release } = visit;
                // Walk errors are already recorded on the summary.
                if entry.is_err() {
                    return;
                }
                if classifier.classify(&root, &path) != FileClass::MinifiedArtifact {
                    return;
                }

                let fs = Arc::clone(&fs);
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    let target = path.clone();
                    match blocking(move || fs.remove_file(&target)).await {
                        Ok(()) => {
                            debug!(path = ?path, "removed stale artifact");
                            push(&sink, [path]);
                            release.release();
                        }
                        Err(err) => release.fail(WalkError::new(&path, &err)),
                    }
                });
            })
            .await;

        summary.into_result()?;
        Ok(drain_sorted(&deleted))
    }

    /// Generation pass.
    pub async fn generate(&self, banner: &Banner) -> Result<Vec<PathBuf>> {
        let fs = Arc::clone(self.walker.fs());
        let classifier = self.classifier.clone();
        let minifier = Arc::clone(&self.minifier);
        let root = self.lib_dir.clone();
        let output_dir = self.output_dir.clone();
        let banner = banner.clone();
        let generated: Arc<Mutex<Vec<PathBuf>>> = Arc::default();
        let sink = Arc::clone(&generated);

        let summary = self
            .walker
            .walk(self.lib_dir.clone(), move |visit: Visit| {
                let Visit { path, entry, release } = visit;
                if entry.is_err() || path.starts_with(&output_dir) {
                    return;
                }
                let module = match classifier.classify(&root, &path) {
                    FileClass::Source { module } => module,
                    FileClass::MinifiedArtifact | FileClass::Other => return,
                };

                let job = ArtifactJob {
                    fs: Arc::clone(&fs),
                    minifier: Arc::clone(&minifier),
                    banner: banner.clone(),
                    extension: classifier.extension().to_string(),
                    output_dir: output_dir.clone(),
                    module,
                };
                let sink = Arc::clone(&sink);
                tokio::spawn(async move {
                    match job.run(&path).await {
                        Ok(written) => {
                            info!("Minified {}", path.display());
                            push(&sink, written);
                            release.release();
                        }
                        Err(err) => release.fail(WalkError::msg(&path, err.to_string())),
                    }
                });
            })
            .await;

        summary.into_result()?;
        Ok(drain_sorted(&generated))
    }
}

/// Read, minify and write one module.
struct ArtifactJob {
    fs: Arc<dyn FileSystem>,
    minifier: Arc<dyn Minifier>,
    banner: Banner,
    extension: String,
    output_dir: PathBuf,
    module: String,
}

impl ArtifactJob {
    async fn run(self, source_path: &Path) -> Result<Vec<PathBuf>> {
        let source = {
            let fs = Arc::clone(&self.fs);
            let target = source_path.to_path_buf();
            blocking(move || fs.read_to_string(&target)).await?
        };

        let minified = self.minifier.minify(source).await?;
        let text = format!(
            "{}{}",
            self.banner.render(&self.module, &self.extension),
            minified
        );

        let (versioned, latest) =
            artifact_names(&self.module, &self.banner.version, &self.extension);
        let mut written = Vec::with_capacity(2);

        // Versioned first, then latest; either failing fails the module.
        for name in [versioned, latest] {
            let dest = self.output_dir.join(name);
            let fs = Arc::clone(&self.fs);
            let bytes = text.clone().into_bytes();
            let target = dest.clone();
            blocking(move || fs.write(&target, &bytes)).await?;
            written.push(dest);
        }

        Ok(written)
    }
}

fn push(sink: &Mutex<Vec<PathBuf>>, items: impl IntoIterator<Item = PathBuf>) {
    sink.lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .extend(items);
}

fn drain_sorted(sink: &Mutex<Vec<PathBuf>>) -> Vec<PathBuf> {
    let mut items = std::mem::take(&mut *sink.lock().unwrap_or_else(|p| p.into_inner()));
    items.sort();
    items
}
