// src/pipeline/version.rs

//! Version extraction from the designated source artifact.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::info;

use crate::errors::{Result, TreetaskError};
use crate::fs::FileSystem;
use crate::walk::blocking;

/// `<identifier>.VERSION = '<major>.<minor>.<patch>[.<extra>...]'`
static VERSION_ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"([A-Za-z_$][\w$]*)\.VERSION\s*=\s*['"](\d+\.\d+\.\d+(?:\.[0-9A-Za-z-]+)*)['"]"#,
    )
    .expect("version pattern is valid")
});

/// Version string scraped from the source, shared read-only by every task
/// that stamps artifacts.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VersionToken {
    namespace: String,
    version: String,
}

impl VersionToken {
    pub fn new(namespace: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            version: version.into(),
        }
    }

    /// Identifier the version was assigned on (`Sammy` in `Sammy.VERSION`).
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn as_str(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.version)
    }
}

/// First `X.VERSION = '...'` assignment in `text`, if any.
pub fn extract_version(text: &str) -> Option<VersionToken> {
    let caps = VERSION_ASSIGNMENT.captures(text)?;
    Some(VersionToken::new(&caps[1], &caps[2]))
}

/// Read `path` and extract its version token.
///
/// A missing assignment is [`TreetaskError::VersionNotFound`] naming the
/// file that was searched.
pub async fn read_version(fs: Arc<dyn FileSystem>, path: &Path) -> Result<VersionToken> {
    let target = path.to_path_buf();
    let text = blocking(move || fs.read_to_string(&target)).await?;

    let token = extract_version(&text).ok_or_else(|| TreetaskError::VersionNotFound {
        path: path.to_path_buf(),
    })?;

    info!(path = ?path, version = %token, "VERSION: {token}");
    Ok(token)
}
