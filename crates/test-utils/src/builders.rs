#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use treetask::config::{ConfigFile, RawConfigFile};
use treetask::engine::BuildSession;
use treetask::exec::CommandRunner;
use treetask::fs::FileSystem;
use treetask::lintrc::LintOverrides;

/// Timestamp stamped into banners by [`SessionBuilder`]
/// (2024-01-01T00:00:00Z).
pub const FIXED_BUILD_EPOCH: i64 = 1_704_067_200;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Starts from the built-in defaults with the project root at `.`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
    root: PathBuf,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
            root: PathBuf::from("."),
        }
    }

    pub fn root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    pub fn project(mut self, name: &str, url: &str) -> Self {
        self.config.project.name = name.to_string();
        self.config.project.url = url.to_string();
        self
    }

    pub fn lib_dir(mut self, dir: &str) -> Self {
        self.config.project.lib_dir = dir.to_string();
        self
    }

    pub fn version_file(mut self, path: &str) -> Self {
        self.config.project.version_file = path.to_string();
        self
    }

    pub fn minify_cmd(mut self, cmd: &str) -> Self {
        self.config.minify.cmd = cmd.to_string();
        self.config.minify.args.clear();
        self
    }

    pub fn output_dir(mut self, dir: &str) -> Self {
        self.config.minify.output_dir = dir.to_string();
        self
    }

    pub fn lint_cmd(mut self, cmd: &str) -> Self {
        self.config.lint.cmd = cmd.to_string();
        self
    }

    pub fn lint_extra_file(mut self, file: &str) -> Self {
        self.config.lint.extra_files.push(file.to_string());
        self
    }

    pub fn test_cmd(mut self, cmd: &str) -> Self {
        self.config.test.cmd = Some(cmd.to_string());
        self
    }

    pub fn test_target(mut self, target: &str) -> Self {
        self.config.test.target = target.to_string();
        self
    }

    pub fn watch_interval_ms(mut self, ms: u64) -> Self {
        self.config.watch.interval_ms = ms;
        self
    }

    pub fn watch_include(mut self, patterns: &[&str]) -> Self {
        self.config.watch.include = Some(patterns.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn docs_dir(mut self, dir: &str) -> Self {
        self.config.docs.dir = Some(dir.to_string());
        self
    }

    pub fn vcs_program(mut self, program: &str) -> Self {
        self.config.vcs.program = program.to_string();
        self
    }

    pub fn raw(&self) -> &RawConfigFile {
        &self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config)
            .expect("Failed to build valid config from builder")
            .with_root(self.root)
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a `BuildSession` isolated from the host: fixed build
/// timestamp, empty environment, no home directory.
pub struct SessionBuilder {
    config: ConfigFile,
    fs: Arc<dyn FileSystem>,
    runner: Arc<dyn CommandRunner>,
    env: HashMap<String, String>,
    home: Option<PathBuf>,
    lint: LintOverrides,
}

impl SessionBuilder {
    pub fn new(config: ConfigFile, fs: Arc<dyn FileSystem>, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            config,
            fs,
            runner,
            env: HashMap::new(),
            home: None,
            lint: LintOverrides::default(),
        }
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.env.insert(key.to_string(), value.to_string());
        self
    }

    pub fn home(mut self, home: impl Into<PathBuf>) -> Self {
        self.home = Some(home.into());
        self
    }

    pub fn lint(mut self, lint: LintOverrides) -> Self {
        self.lint = lint;
        self
    }

    pub fn build(self) -> BuildSession {
        BuildSession::builder(self.config)
            .fs(self.fs)
            .runner(self.runner)
            .built_at(fixed_build_time())
            .env_map(self.env)
            .home_dir(self.home)
            .lint_overrides(self.lint)
            .build()
    }
}

pub fn fixed_build_time() -> DateTime<Utc> {
    DateTime::from_timestamp(FIXED_BUILD_EPOCH, 0).expect("valid fixed timestamp")
}
