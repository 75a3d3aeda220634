// src/pipeline/classify.rs

use std::path::Path;

use regex::Regex;

use crate::errors::{Result, TreetaskError};
use crate::watch::path_utils::relative_str;

/// What a file under the library directory is, as far as the pipeline
/// stages care.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileClass {
    /// Hand-written module. `module` is the path relative to the library
    /// root without the extension, e.g. `plugins/sammy.haml`.
    Source { module: String },
    /// Output of a previous minify run (`*.min.<ext>`).
    MinifiedArtifact,
    Other,
}

/// The one place file-naming conventions are decided.
#[derive(Debug, Clone)]
pub struct Classifier {
    extension: String,
    minified: Regex,
    source: Regex,
}

impl Classifier {
    /// Build a classifier for modules with the given extension (`"js"`).
    pub fn new(extension: &str) -> Result<Self> {
        let ext = regex::escape(extension);
        let minified = Regex::new(&format!(r"\.min\.{ext}$"))
            .map_err(|e| TreetaskError::ConfigError(format!("minified pattern: {e}")))?;
        let source = Regex::new(&format!(r"^(.+)\.{ext}$"))
            .map_err(|e| TreetaskError::ConfigError(format!("source pattern: {e}")))?;

        Ok(Self {
            extension: extension.to_string(),
            minified,
            source,
        })
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Classify `path`, which must live under `root`.
    pub fn classify(&self, root: &Path, path: &Path) -> FileClass {
        match relative_str(root, path) {
            Some(rel) => self.classify_rel(&rel),
            None => FileClass::Other,
        }
    }

    /// Classify a forward-slash path already relative to the library root.
    pub fn classify_rel(&self, rel: &str) -> FileClass {
        if rel.is_empty() {
            return FileClass::Other;
        }

        if self.minified.is_match(rel) {
            return FileClass::MinifiedArtifact;
        }

        match self.source.captures(rel) {
            Some(caps) => FileClass::Source {
                module: caps[1].to_string(),
            },
            None => FileClass::Other,
        }
    }
}
