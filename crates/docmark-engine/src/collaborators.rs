//! Capabilities the rewriters call out to: cross reference lookup, reading
//! included files, and deciding which conditional tabs are shown.
//!
//! The engine never touches the file system or a cross reference service
//! itself. In-memory implementations are provided for tests and for simple
//! front ends.

use std::collections::{BTreeMap, BTreeSet};

use relative_path::{RelativePath, RelativePathBuf};
use thiserror::Error;

use crate::parsing::source::SourceInfo;

/// What a cross reference uid resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XrefSpec {
    pub href: String,
    pub name: Option<String>,
    pub full_name: Option<String>,
}

pub trait XrefResolver: Send + Sync {
    fn resolve(&self, uid: &str) -> Option<XrefSpec>;
}

#[derive(Debug, Error)]
pub enum IncludeError {
    #[error("included file not found: {path}")]
    NotFound { path: RelativePathBuf },

    #[error("failed to read included file {path}: {source}")]
    Read {
        path: RelativePathBuf,
        source: std::io::Error,
    },

    #[error("circular include of {path}")]
    Cycle { path: RelativePathBuf },
}

/// Reads the text of an included file.
///
/// `from` is the directive's position, for resolving relative paths and for
/// diagnostics.
pub trait IncludeResolver: Send + Sync {
    fn resolve(&self, path: &RelativePath, from: &SourceInfo) -> Result<String, IncludeError>;
}

/// Where an include directive at `from` points: `path` taken relative to the
/// directory of the including file, normalized.
pub fn include_target(from: &SourceInfo, path: &RelativePath) -> RelativePathBuf {
    match from.file().and_then(|file| RelativePath::new(file).parent()) {
        Some(dir) => dir.join_normalized(path),
        None => path.normalize(),
    }
}

/// Decides whether a tab with a condition is shown.
pub trait TabConditions: Send + Sync {
    fn is_visible(&self, condition: &str) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct MapXrefResolver {
    specs: BTreeMap<String, XrefSpec>,
}

impl MapXrefResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, uid: impl Into<String>, spec: XrefSpec) {
        self.specs.insert(uid.into(), spec);
    }

    pub fn with(mut self, uid: impl Into<String>, href: impl Into<String>, name: &str) -> Self {
        self.insert(
            uid,
            XrefSpec {
                href: href.into(),
                name: Some(name.to_string()),
                full_name: None,
            },
        );
        self
    }
}

impl XrefResolver for MapXrefResolver {
    fn resolve(&self, uid: &str) -> Option<XrefSpec> {
        self.specs.get(uid).cloned()
    }
}

/// Included files held in memory, keyed by normalized path. Lookups go
/// through [`include_target`].
#[derive(Debug, Clone, Default)]
pub struct MapIncludeResolver {
    files: BTreeMap<RelativePathBuf, String>,
}

impl MapIncludeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, text: impl Into<String>) -> Self {
        self.files
            .insert(RelativePath::new(path).normalize(), text.into());
        self
    }
}

impl IncludeResolver for MapIncludeResolver {
    fn resolve(&self, path: &RelativePath, from: &SourceInfo) -> Result<String, IncludeError> {
        let target = include_target(from, path);
        match self.files.get(&target) {
            Some(text) => Ok(text.clone()),
            None => Err(IncludeError::NotFound { path: target }),
        }
    }
}

/// The set of active tab conditions; tabs without a condition are always
/// shown.
#[derive(Debug, Clone, Default)]
pub struct ActiveTabs {
    active: BTreeSet<String>,
}

impl ActiveTabs {
    pub fn new<I, S>(conditions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: conditions.into_iter().map(Into::into).collect(),
        }
    }
}

impl TabConditions for ActiveTabs {
    fn is_visible(&self, condition: &str) -> bool {
        self.active.contains(condition)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_include_resolver_normalizes_paths() {
        let resolver = MapIncludeResolver::new().with("a/./b.md", "text");
        let from = SourceInfo::document("", None);
        let text = resolver
            .resolve(RelativePath::new("a/x/../b.md"), &from)
            .unwrap();
        assert_eq!(text, "text");
        let missing = resolver.resolve(RelativePath::new("c.md"), &from);
        assert!(matches!(missing, Err(IncludeError::NotFound { .. })));
    }

    #[test]
    fn include_targets_follow_the_including_file() {
        let top = SourceInfo::document("", None);
        let nested = SourceInfo::document("", Some("guide/setup/index.md".into()));
        assert_eq!(
            include_target(&top, RelativePath::new("./a.md")),
            RelativePathBuf::from("a.md")
        );
        assert_eq!(
            include_target(&nested, RelativePath::new("../shared/b.md")),
            RelativePathBuf::from("guide/shared/b.md")
        );

        let resolver = MapIncludeResolver::new().with("guide/shared/b.md", "b");
        let text = resolver
            .resolve(RelativePath::new("../shared/b.md"), &nested)
            .unwrap();
        assert_eq!(text, "b");
    }

    #[test]
    fn active_tabs() {
        let tabs = ActiveTabs::new(["linux"]);
        assert!(tabs.is_visible("linux"));
        assert!(!tabs.is_visible("windows"));
    }
}
