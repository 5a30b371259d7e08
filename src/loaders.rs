//! Resource loading utilities
//!
//! Schema files (and the files they include or import) are read from the
//! local filesystem. Relative `schemaLocation` values resolve against the
//! directory of the referencing document.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::ResourceError;
use crate::limits::Limits;

/// Filesystem loader for schema documents
#[derive(Debug, Clone, Default)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Configured limits
    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Load a file as bytes, enforcing the size limit
    pub fn load_bytes(&self, path: &Path) -> Result<Vec<u8>, ResourceError> {
        let content = fs::read(path).map_err(|e| ResourceError::new(path, e.to_string()))?;

        if content.len() > self.limits.max_xml_size {
            return Err(ResourceError::new(
                path,
                format!(
                    "size {} bytes exceeds maximum {} bytes",
                    content.len(),
                    self.limits.max_xml_size
                ),
            ));
        }

        debug!(path = %path.display(), bytes = content.len(), "loaded resource");
        Ok(content)
    }

    /// Resolve a `schemaLocation` relative to the referencing document
    pub fn resolve(&self, base: &Path, location: &str) -> PathBuf {
        let location = location.strip_prefix("file://").unwrap_or(location);
        let target = Path::new(location);
        if target.is_absolute() {
            return target.to_path_buf();
        }
        match base.parent() {
            Some(dir) => dir.join(target),
            None => target.to_path_buf(),
        }
    }

    /// Canonical key used to detect repeated includes
    pub fn canonical(&self, path: &Path) -> PathBuf {
        fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let loader = Loader::new();
        let content = loader.load_bytes(file.path()).unwrap();

        assert!(String::from_utf8(content).unwrap().contains("<root>test</root>"));
    }

    #[test]
    fn test_missing_file() {
        let loader = Loader::new();
        let err = loader
            .load_bytes(Path::new("/nonexistent/schema.xsd"))
            .unwrap_err();
        assert_eq!(err.path, PathBuf::from("/nonexistent/schema.xsd"));
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", "x".repeat(2048)).unwrap();

        let loader = Loader::new().with_limits(Limits::new().with_max_xml_size(1024));
        let err = loader.load_bytes(file.path()).unwrap_err();

        assert!(err.reason.contains("exceeds maximum"));
    }

    #[test]
    fn test_resolve_relative() {
        let loader = Loader::new();
        let base = Path::new("/schemas/main/order.xsd");

        assert_eq!(
            loader.resolve(base, "common.xsd"),
            PathBuf::from("/schemas/main/common.xsd")
        );
        assert_eq!(
            loader.resolve(base, "../types/t.xsd"),
            PathBuf::from("/schemas/main/../types/t.xsd")
        );
        assert_eq!(
            loader.resolve(base, "/abs/x.xsd"),
            PathBuf::from("/abs/x.xsd")
        );
    }
}
