use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use docmark_engine::{IncludeError, IncludeResolver, SourceInfo, include_target};
use relative_path::RelativePath;

/// Reads included files from disk, below a fixed root.
///
/// Document file names are relative to `root`; include paths are relative
/// to the file containing the directive.
#[derive(Debug, Clone)]
pub struct FsIncludeResolver {
    root: PathBuf,
}

impl FsIncludeResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl IncludeResolver for FsIncludeResolver {
    fn resolve(&self, path: &RelativePath, from: &SourceInfo) -> Result<String, IncludeError> {
        let target = include_target(from, path);
        let absolute = target.to_path(&self.root);
        log::debug!("reading include {}", absolute.display());
        fs::read_to_string(&absolute).map_err(|source| match source.kind() {
            ErrorKind::NotFound => IncludeError::NotFound { path: target },
            _ => IncludeError::Read {
                path: target,
                source,
            },
        })
    }
}

/// Splits a document path into the include root and the document's name
/// below it. Paths under `preferred_root` keep that root.
pub fn document_location(document: &Path, preferred_root: &Path) -> (PathBuf, String) {
    if let Ok(relative) = document.strip_prefix(preferred_root)
        && !relative.as_os_str().is_empty()
    {
        return (preferred_root.to_path_buf(), slashed(relative));
    }
    let root = match document.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    let name = document
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    (root, name)
}

fn slashed(path: &Path) -> String {
    path.components()
        .map(|component| component.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, path: &str, text: &str) {
        let path = root.join(path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, text).unwrap();
    }

    #[test]
    fn reads_relative_to_the_including_file() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "guide/shared/note.md", "shared");
        let resolver = FsIncludeResolver::new(temp.path());
        let from = SourceInfo::document("", Some("guide/intro.md".into()));

        let text = resolver
            .resolve(RelativePath::new("shared/note.md"), &from)
            .unwrap();
        assert_eq!(text, "shared");
    }

    #[test]
    fn missing_files_are_not_found() {
        let temp = TempDir::new().unwrap();
        let resolver = FsIncludeResolver::new(temp.path());
        let from = SourceInfo::document("", Some("a.md".into()));

        let err = resolver
            .resolve(RelativePath::new("nope.md"), &from)
            .unwrap_err();
        assert_eq!(err.to_string(), "included file not found: nope.md");
    }

    #[test]
    fn document_location_prefers_the_configured_root() {
        let (root, name) =
            document_location(Path::new("/docs/guide/a.md"), Path::new("/docs"));
        assert_eq!(root, PathBuf::from("/docs"));
        assert_eq!(name, "guide/a.md");

        let (root, name) = document_location(Path::new("/other/b.md"), Path::new("/docs"));
        assert_eq!(root, PathBuf::from("/other"));
        assert_eq!(name, "b.md");

        let (root, name) = document_location(Path::new("c.md"), Path::new("/docs"));
        assert_eq!(root, PathBuf::from("."));
        assert_eq!(name, "c.md");
    }
}
