//! File filtering and discovery with glob pattern support.
//!
//! Discovery walks a checkout and returns every file whose language is in
//! the [`LanguageTable`], skipping vendored and generated directories, and
//! honouring optional include/exclude glob patterns.

use std::path::{Path, PathBuf};

use glob::Pattern;
use walkdir::WalkDir;

use crate::error::RepopulseError;
use crate::Result;

use super::language::LanguageTable;

/// Directories never descended into, besides hidden ones.
const SKIP_DIRS: &[&str] = &[
    "node_modules",
    "__pycache__",
    "venv",
    ".venv",
    "build",
    "dist",
    "target",
];

/// Configuration for file filtering.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    /// Glob patterns to include (if empty, include every supported file)
    pub include: Vec<Pattern>,
    /// Glob patterns to exclude
    pub exclude: Vec<Pattern>,
}

impl FilterConfig {
    /// Create a new empty filter config (includes all supported files).
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an include pattern.
    pub fn include(mut self, pattern: &str) -> Result<Self> {
        self.include.push(compile(pattern)?);
        Ok(self)
    }

    /// Add an exclude pattern.
    pub fn exclude(mut self, pattern: &str) -> Result<Self> {
        self.exclude.push(compile(pattern)?);
        Ok(self)
    }

    /// Add multiple include patterns.
    pub fn include_many(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            self = self.include(pattern)?;
        }
        Ok(self)
    }

    /// Add multiple exclude patterns.
    pub fn exclude_many(mut self, patterns: &[&str]) -> Result<Self> {
        for pattern in patterns {
            self = self.exclude(pattern)?;
        }
        Ok(self)
    }

    /// Check if a path passes the glob patterns.
    ///
    /// A path matches if it matches at least one include pattern (or include
    /// is empty) and no exclude pattern. Language support is checked
    /// separately by [`discover_files`].
    pub fn matches(&self, path: &Path) -> bool {
        let path_str = path.to_string_lossy();

        if self.exclude.iter().any(|p| p.matches(&path_str)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|p| p.matches(&path_str))
    }
}

fn compile(pattern: &str) -> Result<Pattern> {
    Pattern::new(pattern).map_err(|e| RepopulseError::InvalidGlob {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

/// Check if a directory should be skipped during traversal.
fn should_skip_dir(name: &str) -> bool {
    name.starts_with('.') || SKIP_DIRS.contains(&name)
}

/// Discover analyzable source files under `root`.
///
/// Returns paths sorted for deterministic output.
pub fn discover_files(
    root: impl AsRef<Path>,
    filter: &FilterConfig,
    languages: &LanguageTable,
) -> Result<Vec<PathBuf>> {
    let root = root.as_ref();

    if !root.exists() {
        return Err(RepopulseError::PathNotFound(root.to_path_buf()));
    }

    let mut files = Vec::new();

    if root.is_file() {
        if languages.supports(root) && filter.matches(root) {
            files.push(root.to_path_buf());
        }
        return Ok(files);
    }

    let walker = WalkDir::new(root).into_iter().filter_entry(|e| {
        if e.depth() == 0 {
            return true;
        }
        if e.file_type().is_dir() {
            let name = e.file_name().to_str().unwrap_or("");
            return !should_skip_dir(name);
        }
        true
    });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(err) => {
                tracing::debug!(error = %err, "skipping unreadable directory entry");
                continue;
            }
        };

        let path = entry.path();
        if entry.file_type().is_file() && languages.supports(path) && filter.matches(path) {
            files.push(path.to_path_buf());
        }
    }

    files.sort();

    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn create_test_files(dir: &Path) {
        fs::create_dir_all(dir.join("src/com/example/util")).unwrap();
        fs::create_dir_all(dir.join("node_modules/left-pad")).unwrap();
        fs::create_dir_all(dir.join("__pycache__")).unwrap();
        fs::create_dir_all(dir.join(".git")).unwrap();
        fs::create_dir_all(dir.join("dist")).unwrap();

        fs::write(dir.join("src/com/example/Main.java"), "class Main {}").unwrap();
        fs::write(dir.join("src/com/example/util/Str.java"), "class Str {}").unwrap();
        fs::write(dir.join("app.py"), "print('hi')").unwrap();
        fs::write(dir.join("index.ts"), "export {}").unwrap();
        fs::write(dir.join("node_modules/left-pad/index.js"), "module.exports = 1").unwrap();
        fs::write(dir.join("__pycache__/app.py"), "cached").unwrap();
        fs::write(dir.join(".git/hook.py"), "hidden").unwrap();
        fs::write(dir.join("dist/bundle.js"), "bundled").unwrap();
        fs::write(dir.join("README.md"), "# Readme").unwrap();
    }

    #[test]
    fn test_filter_with_include_pattern() {
        let filter = FilterConfig::new().include("**/util/*.java").unwrap();

        assert!(filter.matches(Path::new("src/com/example/util/Str.java")));
        assert!(!filter.matches(Path::new("src/com/example/Main.java")));
    }

    #[test]
    fn test_filter_with_exclude_pattern() {
        let filter = FilterConfig::new().exclude("**/tests/**").unwrap();

        assert!(filter.matches(Path::new("src/main.py")));
        assert!(!filter.matches(Path::new("pkg/tests/test_main.py")));
    }

    #[test]
    fn test_filter_with_multiple_patterns() {
        let filter = FilterConfig::new()
            .include_many(&["**/src/**", "**/lib/**"])
            .unwrap()
            .exclude("**/util/**")
            .unwrap();

        assert!(filter.matches(Path::new("project/src/Main.java")));
        assert!(filter.matches(Path::new("project/lib/a.ts")));
        assert!(!filter.matches(Path::new("project/src/util/Str.java")));
        assert!(!filter.matches(Path::new("project/scripts/run.sh")));
    }

    #[test]
    fn test_discover_files() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let files =
            discover_files(temp.path(), &FilterConfig::new(), &LanguageTable::default()).unwrap();

        assert_eq!(files.len(), 4);
        assert!(files.iter().any(|p| p.ends_with("src/com/example/Main.java")));
        assert!(files.iter().any(|p| p.ends_with("app.py")));
        assert!(files.iter().any(|p| p.ends_with("index.ts")));
        assert!(!files
            .iter()
            .any(|p| p.to_string_lossy().contains("node_modules")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains(".git")));
        assert!(!files.iter().any(|p| p.to_string_lossy().contains("dist")));
    }

    #[test]
    fn test_discover_files_is_sorted() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let files =
            discover_files(temp.path(), &FilterConfig::new(), &LanguageTable::default()).unwrap();
        let mut sorted = files.clone();
        sorted.sort();
        assert_eq!(files, sorted);
    }

    #[test]
    fn test_discover_files_with_filter() {
        let temp = tempdir().unwrap();
        create_test_files(temp.path());

        let filter = FilterConfig::new().exclude("**/*.java").unwrap();
        let files = discover_files(temp.path(), &filter, &LanguageTable::default()).unwrap();

        assert_eq!(files.len(), 2);
        assert!(!files.iter().any(|p| p.extension().unwrap() == "java"));
    }

    #[test]
    fn test_discover_single_file() {
        let temp = tempdir().unwrap();
        let file_path = temp.path().join("Main.java");
        fs::write(&file_path, "class Main {}").unwrap();

        let files =
            discover_files(&file_path, &FilterConfig::new(), &LanguageTable::default()).unwrap();

        assert_eq!(files, vec![file_path]);
    }

    #[test]
    fn test_discover_files_nonexistent() {
        let result = discover_files(
            "/nonexistent/path",
            &FilterConfig::new(),
            &LanguageTable::default(),
        );

        assert!(matches!(result, Err(RepopulseError::PathNotFound(_))));
    }

    #[test]
    fn test_invalid_glob_pattern() {
        let result = FilterConfig::new().include("[invalid");

        if let Err(RepopulseError::InvalidGlob { pattern, .. }) = result {
            assert_eq!(pattern, "[invalid");
        } else {
            panic!("Expected InvalidGlob error");
        }
    }
}
