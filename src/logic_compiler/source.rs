// Source file access for the preprocessor

use crate::logic_compiler::error::CompilerError;
use indexmap::IndexMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Where `#include` and the primary input get their text from.
pub trait SourceLoader {
    fn load(&self, path: &Path) -> Result<String, CompilerError>;

    /// Resolve an include path relative to the including file's directory,
    /// falling back to any configured search directories.
    fn resolve(&self, including_file: &Path, requested: &str) -> PathBuf;
}

/// Reads from the filesystem.
#[derive(Debug, Default, Clone)]
pub struct FileSystemLoader {
    include_paths: Vec<PathBuf>,
}

impl FileSystemLoader {
    pub fn new(include_paths: Vec<PathBuf>) -> Self {
        FileSystemLoader { include_paths }
    }
}

impl SourceLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        fs::read_to_string(path)
            .map_err(|e| CompilerError::IOError(format!("{}: {}", path.display(), e)))
    }

    fn resolve(&self, including_file: &Path, requested: &str) -> PathBuf {
        let base = including_file.parent().unwrap_or_else(|| Path::new(""));
        let local = base.join(requested);
        if local.exists() {
            return local;
        }
        self.include_paths
            .iter()
            .map(|dir| dir.join(requested))
            .find(|candidate| candidate.exists())
            .unwrap_or(local)
    }
}

/// Serves sources from memory. Paths are matched exactly after resolution.
#[derive(Debug, Default, Clone)]
pub struct MemoryLoader {
    files: IndexMap<PathBuf, String>,
}

impl MemoryLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<PathBuf>, text: &str) -> Self {
        self.files.insert(path.into(), text.to_string());
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> Result<String, CompilerError> {
        self.files
            .get(path)
            .cloned()
            .ok_or_else(|| CompilerError::IOError(format!("{}: file not found", path.display())))
    }

    fn resolve(&self, including_file: &Path, requested: &str) -> PathBuf {
        let base = including_file.parent().unwrap_or_else(|| Path::new(""));
        base.join(requested)
    }
}
