// src/engine/session.rs

//! Session context shared by every built-in task.
//!
//! Holds the facts tasks would otherwise pass around through globals: the
//! loaded config, the extracted version (read at most once), the build
//! timestamp stamped into banners and the cancellation token that stops
//! the watch loop.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::ConfigFile;
use crate::errors::Result;
use crate::exec::{CommandRunner, ProcessRunner};
use crate::fs::{FileSystem, RealFileSystem};
use crate::lintrc::LintOverrides;
use crate::pipeline::classify::Classifier;
use crate::pipeline::minify::Banner;
use crate::pipeline::version::{read_version, VersionToken};
use crate::walk::Walker;

/// Fixes the build timestamp (seconds since the epoch) for reproducible
/// banners.
pub const SOURCE_DATE_EPOCH_ENV: &str = "SOURCE_DATE_EPOCH";

/// Environment lookup used by tasks, injectable for tests.
pub type EnvLookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

pub struct BuildSession {
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    walker: Walker,
    version: OnceCell<VersionToken>,
    built_at: DateTime<Utc>,
    cancel: CancellationToken,
    env: EnvLookup,
    home_dir: Option<PathBuf>,
    lint: LintOverrides,
}

impl fmt::Debug for BuildSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BuildSession")
            .field("root", &self.config.root)
            .field("version", &self.version.get())
            .field("built_at", &self.built_at)
            .finish_non_exhaustive()
    }
}

impl BuildSession {
    pub fn builder(config: ConfigFile) -> BuildSessionBuilder {
        BuildSessionBuilder::new(config)
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn fs(&self) -> &Arc<dyn FileSystem> {
        &self.fs
    }

    pub fn runner(&self) -> &Arc<dyn CommandRunner> {
        &self.runner
    }

    pub fn walker(&self) -> &Walker {
        &self.walker
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn built_at(&self) -> DateTime<Utc> {
        self.built_at
    }

    pub fn env_var(&self, key: &str) -> Option<String> {
        (self.env)(key)
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    pub fn lint_overrides(&self) -> &LintOverrides {
        &self.lint
    }

    /// The project version, read from the version file on first use and
    /// cached for the rest of the session.
    pub async fn version(&self) -> Result<VersionToken> {
        let token = self
            .version
            .get_or_try_init(|| async {
                let path = self.config.version_file();
                read_version(Arc::clone(&self.fs), &path).await
            })
            .await?;
        Ok(token.clone())
    }

    /// The version if some task already extracted it.
    pub fn cached_version(&self) -> Option<&VersionToken> {
        self.version.get()
    }

    pub fn classifier(&self) -> Result<Classifier> {
        Classifier::new(&self.config.project.source_extension)
    }

    pub fn banner(&self, version: VersionToken) -> Banner {
        Banner {
            project: self.config.project.name.clone(),
            url: self.config.project.url.clone(),
            version,
            built: self.built_at,
        }
    }
}

/// Builder for [`BuildSession`]; production defaults for anything not set.
pub struct BuildSessionBuilder {
    config: ConfigFile,
    fs: Option<Arc<dyn FileSystem>>,
    runner: Option<Arc<dyn CommandRunner>>,
    built_at: Option<DateTime<Utc>>,
    cancel: Option<CancellationToken>,
    env: Option<EnvLookup>,
    home_dir: Option<Option<PathBuf>>,
    lint: LintOverrides,
}

impl BuildSessionBuilder {
    pub fn new(config: ConfigFile) -> Self {
        Self {
            config,
            fs: None,
            runner: None,
            built_at: None,
            cancel: None,
            env: None,
            home_dir: None,
            lint: LintOverrides::default(),
        }
    }

    pub fn fs(mut self, fs: Arc<dyn FileSystem>) -> Self {
        self.fs = Some(fs);
        self
    }

    pub fn runner(mut self, runner: Arc<dyn CommandRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    pub fn built_at(mut self, at: DateTime<Utc>) -> Self {
        self.built_at = Some(at);
        self
    }

    pub fn cancel_token(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn env(mut self, env: EnvLookup) -> Self {
        self.env = Some(env);
        self
    }

    /// Use a fixed set of variables instead of the process environment.
    pub fn env_map(self, vars: HashMap<String, String>) -> Self {
        self.env(Arc::new(move |key: &str| vars.get(key).cloned()))
    }

    pub fn home_dir(mut self, home: Option<PathBuf>) -> Self {
        self.home_dir = Some(home);
        self
    }

    pub fn lint_overrides(mut self, lint: LintOverrides) -> Self {
        self.lint = lint;
        self
    }

    pub fn build(self) -> BuildSession {
        let env = self
            .env
            .unwrap_or_else(|| Arc::new(|key: &str| std::env::var(key).ok()));
        let fs = self.fs.unwrap_or_else(|| Arc::new(RealFileSystem));
        let runner = self.runner.unwrap_or_else(|| Arc::new(ProcessRunner));
        let built_at = self
            .built_at
            .unwrap_or_else(|| build_timestamp(env.as_ref()));

        debug!(root = ?self.config.root, built_at = %built_at, "build session ready");

        BuildSession {
            walker: Walker::new(Arc::clone(&fs)),
            config: self.config,
            fs,
            runner,
            version: OnceCell::new(),
            built_at,
            cancel: self.cancel.unwrap_or_default(),
            env,
            home_dir: self.home_dir.unwrap_or_else(dirs::home_dir),
            lint: self.lint,
        }
    }
}

/// `SOURCE_DATE_EPOCH` if set and valid, otherwise the current time.
pub fn build_timestamp(env: &(dyn Fn(&str) -> Option<String> + Send + Sync)) -> DateTime<Utc> {
    let Some(raw) = env(SOURCE_DATE_EPOCH_ENV) else {
        return Utc::now();
    };

    match raw.trim().parse::<i64>().ok().and_then(|secs| DateTime::from_timestamp(secs, 0)) {
        Some(at) => at,
        None => {
            warn!(value = %raw, "ignoring invalid {SOURCE_DATE_EPOCH_ENV}");
            Utc::now()
        }
    }
}
