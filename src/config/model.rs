// src/config/model.rs

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::config::validate::validate_config;
use crate::errors::TreetaskError;

/// Top-level configuration as read from `Treetask.toml`.
///
/// ```toml
/// [project]
/// name = "Sammy.js"
/// url = "http://sammyjs.org"
/// lib_dir = "lib"
/// version_file = "lib/sammy.js"
///
/// [minify]
/// output_dir = "min"
/// cmd = "uglifyjs"
///
/// [lint]
/// cmd = "./node_modules/.bin/jshint"
/// extra_files = ["Jakefile.js"]
///
/// [watch]
/// interval_ms = 1000
/// include = ["**/*.js"]
/// ```
///
/// All sections are optional and have the defaults shown in each section's
/// `Default` impl.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub project: ProjectSection,
    #[serde(default)]
    pub minify: MinifySection,
    #[serde(default)]
    pub lint: LintSection,
    #[serde(default)]
    pub test: TestSection,
    #[serde(default)]
    pub watch: WatchSection,
    #[serde(default)]
    pub docs: DocsSection,
    #[serde(default)]
    pub vcs: VcsSection,
}

/// Validated configuration plus the project root it applies to.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub project: ProjectSection,
    pub minify: MinifySection,
    pub lint: LintSection,
    pub test: TestSection,
    pub watch: WatchSection,
    pub docs: DocsSection,
    pub vcs: VcsSection,
    /// Directory every relative path in the config is resolved against.
    pub root: PathBuf,
}

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = TreetaskError;

    fn try_from(raw: RawConfigFile) -> Result<Self, Self::Error> {
        validate_config(&raw)?;
        Ok(Self {
            project: raw.project,
            minify: raw.minify,
            lint: raw.lint,
            test: raw.test,
            watch: raw.watch,
            docs: raw.docs,
            vcs: raw.vcs,
            root: PathBuf::from("."),
        })
    }
}

impl ConfigFile {
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = root.into();
        self
    }

    /// Resolve a project-relative path.
    pub fn path(&self, rel: impl AsRef<Path>) -> PathBuf {
        self.root.join(rel)
    }

    /// Absolute-or-root-relative library directory.
    pub fn lib_dir(&self) -> PathBuf {
        self.path(&self.project.lib_dir)
    }

    /// Directory minified artifacts are written to.
    pub fn output_dir(&self) -> PathBuf {
        self.lib_dir().join(&self.minify.output_dir)
    }

    pub fn version_file(&self) -> PathBuf {
        self.path(&self.project.version_file)
    }
}

/// `[project]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProjectSection {
    /// Human-readable project name, used in artifact banners.
    pub name: String,
    /// Project home page, used in artifact banners.
    pub url: String,
    /// Directory holding the source modules.
    pub lib_dir: String,
    /// File carrying the `<identifier>.VERSION = '<version>'` assignment.
    pub version_file: String,
    /// Extension (without the dot) of source modules.
    pub source_extension: String,
}

impl Default for ProjectSection {
    fn default() -> Self {
        Self {
            name: "Sammy.js".to_string(),
            url: "http://sammyjs.org".to_string(),
            lib_dir: "lib".to_string(),
            version_file: "lib/sammy.js".to_string(),
            source_extension: "js".to_string(),
        }
    }
}

/// `[minify]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MinifySection {
    /// Output directory, relative to `project.lib_dir`.
    pub output_dir: String,
    /// External minifier; reads source on stdin, writes the result to stdout.
    pub cmd: String,
    pub args: Vec<String>,
}

impl Default for MinifySection {
    fn default() -> Self {
        Self {
            output_dir: "min".to_string(),
            cmd: "uglifyjs".to_string(),
            args: vec!["--compress".to_string(), "--mangle".to_string()],
        }
    }
}

/// `[lint]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LintSection {
    pub cmd: String,
    pub args: Vec<String>,
    /// Files linted in addition to the library sources (e.g. the build script).
    pub extra_files: Vec<String>,
    /// Name of the checker config looked up in `$HOME` and the project root.
    pub rc_file: String,
    /// Name of the newline-delimited ignore list in the project root.
    pub ignore_file: String,
    /// Flag used to hand the merged checker config to the checker.
    pub config_flag: String,
}

impl Default for LintSection {
    fn default() -> Self {
        Self {
            cmd: "./node_modules/.bin/jshint".to_string(),
            args: Vec::new(),
            extra_files: Vec::new(),
            rc_file: ".jshintrc".to_string(),
            ignore_file: ".jshintignore".to_string(),
            config_flag: "--config".to_string(),
        }
    }
}

/// `[test]` section.
///
/// `TEST_CMD` / `TEST` in the environment override `cmd` / `target`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TestSection {
    /// Shell command the target is appended to. Falls back to the platform
    /// file opener when unset.
    pub cmd: Option<String>,
    pub target: String,
}

impl Default for TestSection {
    fn default() -> Self {
        Self {
            cmd: None,
            target: "test/index.html".to_string(),
        }
    }
}

/// `[watch]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchSection {
    pub interval_ms: u64,
    /// Globs (relative to the project root) of files whose changes rerun
    /// tests. Unset means every source module.
    pub include: Option<Vec<String>>,
    pub exclude: Vec<String>,
}

impl Default for WatchSection {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            include: None,
            exclude: vec!["node_modules/**".to_string(), ".git/**".to_string()],
        }
    }
}

/// `[docs]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DocsSection {
    pub cmd: String,
    /// Arguments; `{dir}` and `{version}` are substituted.
    pub args: Vec<String>,
    /// Output directory; `DIR` in the environment takes precedence.
    pub dir: Option<String>,
}

impl Default for DocsSection {
    fn default() -> Self {
        Self {
            cmd: "ruby".to_string(),
            args: ["vendor/jsdoc/jsdoc.rb", "{dir}", "{version}", "lib/", "lib/plugins/"]
                .into_iter()
                .map(String::from)
                .collect(),
            dir: None,
        }
    }
}

/// `[vcs]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VcsSection {
    pub program: String,
}

impl Default for VcsSection {
    fn default() -> Self {
        Self {
            program: "git".to_string(),
        }
    }
}
