//! High-level LOC counting API.
//!
//! Counting classifies every discovered file and folds the results into
//! per-package (directory) and whole-project totals. Aggregation is purely
//! additive: a file counted twice is counted twice.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use crate::error::RepopulseError;
use crate::source::{discover_files, FilterConfig, Language, LanguageTable};
use crate::Result;

use super::classifier::gather_stats_for_path;
use super::stats::{FileStats, Locs, PackageStats};

/// Package name used for files directly under the analyzed root.
pub const ROOT_PACKAGE: &str = "(root)";

/// Options for counting LOC.
#[derive(Debug, Clone, Default)]
pub struct CountOptions {
    /// File filter configuration
    pub file_filter: FilterConfig,
    /// Comment syntax per analyzed language
    pub languages: LanguageTable,
}

impl CountOptions {
    /// Create new default options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set file filter.
    pub fn filter(mut self, filter: FilterConfig) -> Self {
        self.file_filter = filter;
        self
    }

    /// Set the language table.
    pub fn languages(mut self, languages: LanguageTable) -> Self {
        self.languages = languages;
        self
    }
}

/// Result of counting LOC in a directory.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CountResult {
    /// Root the paths below are relative to
    pub root: PathBuf,
    /// Total number of files analyzed
    pub file_count: usize,
    /// Aggregated statistics across all files
    pub total: Locs,
    /// Per-file statistics, sorted by path
    pub files: Vec<FileStats>,
    /// Per-package statistics, sorted by name
    pub packages: Vec<PackageStats>,
    /// Every language seen
    pub languages: BTreeSet<Language>,
}

impl CountResult {
    /// Create a new empty result.
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            ..Self::default()
        }
    }

    /// Fold one file into the totals.
    pub fn add_file(&mut self, file: FileStats) {
        self.total += file.stats;
        self.file_count += 1;
        self.languages.insert(file.language);
        self.files.push(file);
    }

    /// Build the package rollup from the collected files.
    fn rollup_packages(&mut self) {
        let mut packages: BTreeMap<String, PackageStats> = BTreeMap::new();
        for file in &self.files {
            let name = package_name(&file.path);
            packages
                .entry(name.clone())
                .or_insert_with(|| PackageStats::new(name))
                .add_file(file);
        }
        self.packages = packages.into_values().collect();
    }
}

/// Compute the package of a root-relative file path: its parent directory.
///
/// - `Main.java` → `(root)`
/// - `src/com/example/Main.java` → `src/com/example`
pub fn package_name(relative: &Path) -> String {
    let parent = match relative.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => return ROOT_PACKAGE.to_string(),
    };

    parent
        .components()
        .filter_map(|c| c.as_os_str().to_str())
        .collect::<Vec<_>>()
        .join("/")
}

/// Count LOC in a directory tree.
///
/// # Example
///
/// ```rust
/// use repopulselib::{count_directory, CountOptions};
/// use std::fs;
/// use tempfile::tempdir;
///
/// let dir = tempdir().unwrap();
/// let src = dir.path().join("src");
/// fs::create_dir(&src).unwrap();
/// fs::write(src.join("app.py"), "# entry point\nprint('hi')\n").unwrap();
/// fs::write(dir.path().join("Main.java"), "class Main {\n}\n").unwrap();
///
/// let result = count_directory(dir.path(), &CountOptions::new()).unwrap();
/// assert_eq!(result.file_count, 2);
/// assert_eq!(result.packages.len(), 2);
/// assert_eq!(result.total.code, 2);
/// assert_eq!(result.total.comments, 1);
/// ```
pub fn count_directory(path: impl AsRef<Path>, options: &CountOptions) -> Result<CountResult> {
    let root = path.as_ref();

    if !root.exists() {
        return Err(RepopulseError::PathNotFound(root.to_path_buf()));
    }

    let files = discover_files(root, &options.file_filter, &options.languages)?;
    let mut result = CountResult::new(root.to_path_buf());

    for file_path in files {
        let Some((language, syntax)) = options.languages.lookup(&file_path) else {
            continue;
        };
        let stats = gather_stats_for_path(&file_path, syntax)?;
        let relative = file_path
            .strip_prefix(root)
            .unwrap_or(&file_path)
            .to_path_buf();
        tracing::debug!(path = %relative.display(), code = stats.code, "counted file");
        result.add_file(FileStats::new(relative, language, stats));
    }

    result.rollup_packages();

    tracing::info!(
        files = result.file_count,
        loc = result.total.code,
        packages = result.packages.len(),
        "LOC analysis finished"
    );

    Ok(result)
}

/// Count LOC in a single file.
///
/// Returns `None` when the file's language is not in the table.
pub fn count_file(path: impl AsRef<Path>, languages: &LanguageTable) -> Result<Option<Locs>> {
    let path = path.as_ref();
    match languages.lookup(path) {
        Some((_, syntax)) => gather_stats_for_path(path, syntax).map(Some),
        None => Ok(None),
    }
}
