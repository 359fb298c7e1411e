use std::collections::HashMap;
use std::io;
use std::path::PathBuf;

use log::*;

/// Source text of a resolved include.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeFile {
    /// the include path as written, used for diagnostics
    pub name: String,
    pub source: String,
}

/// Resolves `#include "..."` paths to their source text.
///
/// `Ok(None)` means no search location contained the file.
pub trait IncludeProvider {
    fn load(&self, path: &str) -> io::Result<Option<IncludeFile>>;
}

/// Looks an include up in each directory in order; the transpiler passes the
/// shader source directories first and the content directories after.
#[derive(Debug, Clone, Default)]
pub struct SearchPathIncludes {
    dirs: Vec<PathBuf>,
}

impl SearchPathIncludes {
    pub fn new(dirs: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            dirs: dirs.into_iter().collect(),
        }
    }
}

impl IncludeProvider for SearchPathIncludes {
    fn load(&self, path: &str) -> io::Result<Option<IncludeFile>> {
        let relative = path.strip_prefix("./").unwrap_or(path);
        for dir in &self.dirs {
            let candidate = dir.join(relative);
            if candidate.is_file() {
                debug!("resolved include '{path}' to {}", candidate.display());
                let source = std::fs::read_to_string(&candidate)?;
                return Ok(Some(IncludeFile {
                    name: path.to_string(),
                    source,
                }));
            }
        }
        Ok(None)
    }
}

/// In-memory includes keyed by their exact path.
#[derive(Debug, Clone, Default)]
pub struct MemoryIncludes {
    files: HashMap<String, String>,
}

impl MemoryIncludes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, path: impl Into<String>, source: impl Into<String>) -> Self {
        self.insert(path, source);
        self
    }

    pub fn insert(&mut self, path: impl Into<String>, source: impl Into<String>) {
        self.files.insert(path.into(), source.into());
    }
}

impl IncludeProvider for MemoryIncludes {
    fn load(&self, path: &str) -> io::Result<Option<IncludeFile>> {
        let relative = path.strip_prefix("./").unwrap_or(path);
        Ok(self.files.get(relative).map(|source| IncludeFile {
            name: path.to_string(),
            source: source.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_path_prefers_earlier_directories() -> io::Result<()> {
        let root = std::env::temp_dir().join(format!("includes-test-{}", uuid::Uuid::new_v4()));
        let source_dir = root.join("source");
        let content_dir = root.join("content");
        std::fs::create_dir_all(&source_dir)?;
        std::fs::create_dir_all(&content_dir)?;
        std::fs::write(source_dir.join("common.hlsli"), "// source")?;
        std::fs::write(content_dir.join("common.hlsli"), "// content")?;
        std::fs::write(content_dir.join("lighting.hlsli"), "// lighting")?;

        let includes = SearchPathIncludes::new([source_dir, content_dir]);
        let common = includes.load("./common.hlsli")?;
        let lighting = includes.load("lighting.hlsli")?;
        let missing = includes.load("missing.hlsli")?;

        std::fs::remove_dir_all(&root)?;

        assert_eq!(common.map(|file| file.source).as_deref(), Some("// source"));
        assert_eq!(lighting.map(|file| file.source).as_deref(), Some("// lighting"));
        assert_eq!(missing, None);
        Ok(())
    }

    #[test]
    fn memory_includes_resolve_by_path() -> io::Result<()> {
        let includes = MemoryIncludes::new().with_file("a.hlsli", "float a;");
        assert_eq!(
            includes.load("a.hlsli")?,
            Some(IncludeFile {
                name: "a.hlsli".to_string(),
                source: "float a;".to_string()
            })
        );
        assert_eq!(includes.load("b.hlsli")?, None);
        Ok(())
    }
}
