// src/watch/patterns.rs

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::WatchSection;
use crate::pipeline::{Classifier, FileClass};

/// Which files the watch loop tracks. Paths are matched relative to the
/// watched root, e.g. `"lib/plugins/sammy.haml.js"`.
///
/// By default a file is tracked when the [`Classifier`] calls it a source
/// module; `[watch].include` globs replace that test. Exclude globs apply in
/// both cases.
#[derive(Debug, Clone)]
pub struct WatchFilter {
    include: Include,
    exclude: Option<GlobSet>,
}

#[derive(Debug, Clone)]
enum Include {
    Sources(Classifier),
    Globs(GlobSet),
}

impl WatchFilter {
    /// Track files matching any of the `include` globs.
    pub fn new(include: &[String], exclude: &[String]) -> Result<Self> {
        let include = build_globset(include).context("building watch include set")?;
        Ok(Self {
            include: Include::Globs(include),
            exclude: build_exclude(exclude)?,
        })
    }

    /// Track every source module as decided by `classifier`.
    pub fn sources(classifier: Classifier, exclude: &[String]) -> Result<Self> {
        Ok(Self {
            include: Include::Sources(classifier),
            exclude: build_exclude(exclude)?,
        })
    }

    pub fn from_section(section: &WatchSection, classifier: Classifier) -> Result<Self> {
        match &section.include {
            Some(globs) => Self::new(globs, &section.exclude),
            None => Self::sources(classifier, &section.exclude),
        }
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        let included = match &self.include {
            Include::Sources(classifier) => {
                matches!(classifier.classify_rel(rel_path), FileClass::Source { .. })
            }
            Include::Globs(globs) => globs.is_match(rel_path),
        };
        if !included {
            return false;
        }
        match &self.exclude {
            Some(exclude) => !exclude.is_match(rel_path),
            None => true,
        }
    }
}

fn build_exclude(exclude: &[String]) -> Result<Option<GlobSet>> {
    if exclude.is_empty() {
        return Ok(None);
    }
    build_globset(exclude)
        .context("building watch exclude set")
        .map(Some)
}

/// Build a GlobSet from simple string patterns.
pub(crate) fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
