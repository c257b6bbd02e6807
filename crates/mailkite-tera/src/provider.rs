//! Where layout sources come from.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

/// Reads template sources by name.
pub trait FileProvider: Send + Sync {
    /// Returns the source stored under `path`.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the source does not exist or cannot be read.
    fn read(&self, path: &str) -> io::Result<String>;
}

/// Reads templates from files below a root directory.
///
/// Names are relative to the root; absolute names and `..` components are
/// refused with [`io::ErrorKind::PermissionDenied`].
#[derive(Debug, Clone)]
pub struct DirectoryFileProvider {
    root: PathBuf,
}

impl DirectoryFileProvider {
    /// Creates a provider rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, name: &str) -> io::Result<PathBuf> {
        let relative = Path::new(name);
        for component in relative.components() {
            match component {
                Component::Normal(_) | Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(io::Error::new(
                        io::ErrorKind::PermissionDenied,
                        format!("template path escapes the root: {name}"),
                    ));
                }
            }
        }
        Ok(self.root.join(relative))
    }
}

impl FileProvider for DirectoryFileProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        let full = self.resolve(path)?;
        tracing::debug!(path = %full.display(), "Reading template");
        std::fs::read_to_string(full)
    }
}

/// Templates held in memory, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileProvider {
    files: HashMap<String, String>,
}

impl MemoryFileProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a template.
    #[must_use]
    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    /// Adds (or replaces) a template.
    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl FileProvider for MemoryFileProvider {
    fn read(&self, path: &str) -> io::Result<String> {
        self.files.get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("template not found: {path}"))
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_directory_reads_nested_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("layouts")).unwrap();
        std::fs::write(dir.path().join("layouts/base.html"), "<html>{{ body }}</html>").unwrap();

        let provider = DirectoryFileProvider::new(dir.path());
        assert_eq!(
            provider.read("layouts/base.html").unwrap(),
            "<html>{{ body }}</html>"
        );
        assert_eq!(
            provider.read("./layouts/base.html").unwrap(),
            "<html>{{ body }}</html>"
        );
    }

    #[test]
    fn test_directory_refuses_escapes() {
        let dir = tempfile::tempdir().unwrap();
        let provider = DirectoryFileProvider::new(dir.path().join("templates"));

        for name in ["../secret.txt", "layouts/../../secret.txt", "/etc/passwd"] {
            let err = provider.read(name).unwrap_err();
            assert_eq!(err.kind(), io::ErrorKind::PermissionDenied, "{name}");
        }
    }

    #[test]
    fn test_directory_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DirectoryFileProvider::new(dir.path())
            .read("nope.html")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_memory_provider() {
        let mut provider = MemoryFileProvider::new().with_file("a", "first");
        provider.insert("a", "second");

        assert_eq!(provider.read("a").unwrap(), "second");
        assert_eq!(
            provider.read("b").unwrap_err().kind(),
            io::ErrorKind::NotFound
        );
    }
}
