// src/lintrc.rs

//! Lint front-end configuration.
//!
//! A user-level rc file (`~/.jshintrc`) and a project-level rc file are
//! both optional JSON documents that may carry `//` and `/* */` comments.
//! The project file overrides the user file key by key, except `predef`,
//! which is concatenated. A custom config passed on the command line
//! replaces the merge entirely.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::{Result, TreetaskError};
use crate::fs::FileSystem;
use crate::watch::path_utils::relative_str;

/// Key whose values are concatenated instead of overridden.
pub const PREDEF_KEY: &str = "predef";

pub type LintRc = Map<String, Value>;

/// Remove `//` line comments and `/* */` block comments, leaving string
/// literals untouched.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(quote) = in_string {
            out.push(c);
            if c == '\\' {
                if let Some(escaped) = chars.next() {
                    out.push(escaped);
                }
            } else if c == quote {
                in_string = None;
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"' | '\'', _) => {
                in_string = Some(c);
                out.push(c);
            }
            ('/', Some('/')) => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' || next == '\r' {
                        break;
                    }
                    chars.next();
                }
            }
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    // Keep line structure so parse errors point at the right line.
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Parse an rc document.
pub fn parse_rc(path: &Path, text: &str) -> Result<LintRc> {
    let value: Value =
        serde_json::from_str(&strip_comments(text)).map_err(|e| TreetaskError::LintConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(TreetaskError::LintConfig {
            path: path.to_path_buf(),
            message: format!("expected a JSON object, found {}", json_kind(&other)),
        }),
    }
}

/// Load an rc file. A missing file is an empty config; an unreadable or
/// malformed one is an error naming the file.
pub fn load_rc(fs: &dyn FileSystem, path: &Path) -> Result<LintRc> {
    if !fs.exists(path) {
        debug!(path = ?path, "no lint rc file");
        return Ok(LintRc::new());
    }

    let text = fs
        .read_to_string(path)
        .map_err(|e| TreetaskError::LintConfig {
            path: path.to_path_buf(),
            message: format!("{e:#}"),
        })?;

    parse_rc(path, &text)
}

/// Merge `project` over `home`.
pub fn merge_rc(home: LintRc, project: LintRc) -> LintRc {
    let mut merged = home;

    for (key, value) in project {
        if key == PREDEF_KEY {
            let mut predef = match merged.remove(PREDEF_KEY) {
                Some(Value::Array(items)) => items,
                Some(Value::Null) | None => Vec::new(),
                Some(other) => vec![other],
            };
            match value {
                Value::Array(items) => predef.extend(items),
                other => predef.push(other),
            }
            merged.insert(key, Value::Array(predef));
        } else {
            merged.insert(key, value);
        }
    }

    merged
}

/// Read the ignore file: one pattern per line, blank lines dropped.
/// A missing file means nothing is ignored.
pub fn load_ignore(fs: &dyn FileSystem, path: &Path) -> Result<Vec<String>> {
    if !fs.exists(path) {
        return Ok(Vec::new());
    }

    let text = fs.read_to_string(path)?;
    Ok(text
        .lines()
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| !line.trim().is_empty())
        .map(str::to_string)
        .collect())
}

/// Compiled ignore patterns, matched against paths relative to the
/// project root. A pattern also ignores everything beneath it.
#[derive(Debug, Clone)]
pub struct IgnoreSet {
    root: PathBuf,
    set: GlobSet,
    len: usize,
}

impl IgnoreSet {
    pub fn new(root: impl Into<PathBuf>, patterns: &[String]) -> Result<Self> {
        let mut builder = GlobSetBuilder::new();
        for raw in patterns {
            let pattern = raw.trim().trim_start_matches("./").trim_end_matches('/');
            if pattern.is_empty() {
                continue;
            }
            for candidate in [pattern.to_string(), format!("{pattern}/**")] {
                let glob = Glob::new(&candidate).map_err(|e| {
                    TreetaskError::ConfigError(format!("invalid ignore pattern '{raw}': {e}"))
                })?;
                builder.add(glob);
            }
        }

        let set = builder
            .build()
            .map_err(|e| TreetaskError::ConfigError(format!("failed to build ignore set: {e}")))?;

        Ok(Self {
            root: root.into(),
            len: patterns.len(),
            set,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_ignored(&self, path: &Path) -> bool {
        match relative_str(&self.root, path) {
            Some(rel) => self.set.is_match(rel),
            None => false,
        }
    }
}

/// Output format handed to the checker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Reporter {
    #[default]
    Default,
    JslintXml,
    NonErrors,
    Custom(PathBuf),
}

impl Reporter {
    /// Pick the reporter from the command-line switches. Later switches
    /// win: a custom reporter is replaced by `--jslint-reporter`, which is
    /// replaced by `--show-non-errors`.
    pub fn select(custom: Option<PathBuf>, jslint_xml: bool, show_non_errors: bool) -> Self {
        if show_non_errors {
            Reporter::NonErrors
        } else if jslint_xml {
            Reporter::JslintXml
        } else if let Some(path) = custom {
            Reporter::Custom(path)
        } else {
            Reporter::Default
        }
    }

    /// A custom reporter must point at a readable file.
    pub fn check(&self, fs: &dyn FileSystem) -> Result<()> {
        if let Reporter::Custom(path) = self {
            if !fs.is_file(path) {
                return Err(TreetaskError::LintConfig {
                    path: path.clone(),
                    message: "error opening reporter file".to_string(),
                });
            }
        }
        Ok(())
    }

    pub fn checker_args(&self) -> Vec<String> {
        match self {
            Reporter::Default => Vec::new(),
            Reporter::JslintXml => vec!["--jslint-reporter".to_string()],
            Reporter::NonErrors => vec!["--show-non-errors".to_string()],
            Reporter::Custom(path) => {
                vec!["--reporter".to_string(), path.display().to_string()]
            }
        }
    }
}

/// Lint settings that come from the command line rather than
/// `Treetask.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LintOverrides {
    pub custom_config: Option<PathBuf>,
    pub reporter: Reporter,
}

/// Effective checker configuration for one lint run.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedLintRc {
    pub config: LintRc,
    /// Files that contributed, in merge order.
    pub sources: Vec<PathBuf>,
}

impl ResolvedLintRc {
    /// Resolve the effective config.
    ///
    /// With `custom` set only that file is read and it must exist.
    /// Otherwise `<home>/<rc_file>` and `<project>/<rc_file>` are merged.
    pub fn resolve(
        fs: Arc<dyn FileSystem>,
        custom: Option<&Path>,
        home: Option<&Path>,
        project_dir: &Path,
        rc_file: &str,
    ) -> Result<Self> {
        if let Some(custom) = custom {
            if !fs.exists(custom) {
                return Err(TreetaskError::LintConfig {
                    path: custom.to_path_buf(),
                    message: "config file not found".to_string(),
                });
            }
            let config = load_rc(fs.as_ref(), custom)?;
            return Ok(Self {
                config,
                sources: vec![custom.to_path_buf()],
            });
        }

        let mut sources = Vec::new();

        let home_rc = match home {
            Some(home) => {
                let path = home.join(rc_file);
                if fs.exists(&path) {
                    sources.push(path.clone());
                }
                load_rc(fs.as_ref(), &path)?
            }
            None => LintRc::new(),
        };

        let project_path = project_dir.join(rc_file);
        if fs.exists(&project_path) {
            sources.push(project_path.clone());
        }
        let project_rc = load_rc(fs.as_ref(), &project_path)?;

        Ok(Self {
            config: merge_rc(home_rc, project_rc),
            sources,
        })
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.config)
            .map_err(|e| TreetaskError::Other(anyhow::anyhow!("failed to encode lint config: {e}")))
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
