//! Core data structures for LOC statistics.
//!
//! Every line lands in exactly one of three buckets:
//!
//! - **code**: lines with code, including lines that also carry a comment
//! - **comments**: lines holding only comment text
//! - **blanks**: whitespace-only and brace-only lines
//!
//! Weighted LOC scores comments at half a line: `code + 0.5 × comments`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::ops::{Add, AddAssign};
use std::path::PathBuf;

use crate::source::Language;

use super::classifier::LineKind;

/// Weight applied to code lines in weighted LOC.
pub const CODE_WEIGHT: f64 = 1.0;
/// Weight applied to comment lines in weighted LOC.
pub const COMMENT_WEIGHT: f64 = 0.5;

/// Weighted LOC for the given code and comment counts.
pub fn weighted_loc(code: u64, comments: u64) -> f64 {
    code as f64 * CODE_WEIGHT + comments as f64 * COMMENT_WEIGHT
}

/// Line counts for a file or any rollup of files.
///
/// `total` is always `code + comments + blanks`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Locs {
    /// Code lines (mixed code+comment lines included)
    pub code: u64,
    /// Comment-only lines
    pub comments: u64,
    /// Blank and brace-only lines
    pub blanks: u64,
    /// Total line count
    pub total: u64,
}

impl Locs {
    /// Create a new Locs with all zeros.
    pub fn new() -> Self {
        Self::default()
    }

    /// Count one classified line.
    pub fn record(&mut self, kind: LineKind) {
        match kind {
            LineKind::Code | LineKind::Mixed => self.code += 1,
            LineKind::Comment => self.comments += 1,
            LineKind::Blank => self.blanks += 1,
        }
        self.total += 1;
    }

    /// `code × 1.0 + comments × 0.5`
    pub fn weighted(&self) -> f64 {
        weighted_loc(self.code, self.comments)
    }
}

impl Add for Locs {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            code: self.code + other.code,
            comments: self.comments + other.comments,
            blanks: self.blanks + other.blanks,
            total: self.total + other.total,
        }
    }
}

impl AddAssign for Locs {
    fn add_assign(&mut self, other: Self) {
        self.code += other.code;
        self.comments += other.comments;
        self.blanks += other.blanks;
        self.total += other.total;
    }
}

/// Statistics for a single file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileStats {
    /// Path relative to the analyzed root.
    pub path: PathBuf,
    pub language: Language,
    pub stats: Locs,
}

impl FileStats {
    pub fn new(path: PathBuf, language: Language, stats: Locs) -> Self {
        Self {
            path,
            language,
            stats,
        }
    }
}

/// Statistics for a package: every file directly inside one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageStats {
    /// Directory relative to the root, `/`-separated, or `(root)`.
    pub name: String,
    /// Aggregated LOC statistics.
    pub stats: Locs,
    /// Files belonging to this package.
    pub files: Vec<PathBuf>,
    /// Languages seen in this package.
    pub languages: BTreeSet<Language>,
}

impl PackageStats {
    pub fn new(name: String) -> Self {
        Self {
            name,
            stats: Locs::new(),
            files: Vec::new(),
            languages: BTreeSet::new(),
        }
    }

    /// Add a file's stats to this package.
    pub fn add_file(&mut self, file: &FileStats) {
        self.stats += file.stats;
        self.files.push(file.path.clone());
        self.languages.insert(file.language);
    }
}

/// Tag value for a set of languages: the language name, or `mixed`.
pub fn language_label(languages: &BTreeSet<Language>) -> String {
    let mut iter = languages.iter();
    match (iter.next(), iter.next()) {
        (Some(only), None) => only.name().to_string(),
        (None, _) => "unknown".to_string(),
        _ => "mixed".to_string(),
    }
}
