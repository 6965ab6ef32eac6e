//! Line-based source classification.
//!
//! Every line of a file is classified as exactly one of blank, comment,
//! mixed or code. Classification is heuristic and line-oriented, not a
//! tokenizer: the only state carried between lines of a file is whether a
//! block comment is currently open.
//!
//! Rules, in priority order:
//!
//! 1. **blank**: empty after trimming, or made only of `{` / `}` characters
//! 2. **comment**: only comment text (inside an open block, or starting with a marker)
//! 3. **mixed**: code followed by a comment, or a comment closed before trailing code
//! 4. **code**: everything else
//!
//! Mixed lines are counted as code. String literals are not recognized, so a
//! marker inside quotes (`"src/*.java"`) still opens or starts a comment.

use std::fs;
use std::path::Path;

use crate::error::RepopulseError;
use crate::source::CommentSyntax;
use crate::Result;

use super::stats::Locs;

/// Classification of a single source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    /// Whitespace only, or brace-only lines
    Blank,
    /// Comment text and nothing else
    Comment,
    /// Code and a comment on the same line
    Mixed,
    /// Code without any comment
    Code,
}

impl LineKind {
    /// Whether the line is counted towards `code_loc`.
    pub fn is_code(&self) -> bool {
        matches!(self, LineKind::Code | LineKind::Mixed)
    }
}

/// Classifies the lines of one file, in order.
///
/// A fresh classifier must be used per file so block-comment state does not
/// leak across files.
#[derive(Debug)]
pub struct LineClassifier<'a> {
    syntax: &'a CommentSyntax,
    /// Index into `syntax.block` of the block comment currently open.
    open_block: Option<usize>,
}

/// The earliest comment token found in a slice of a line.
enum Marker {
    Line,
    Block(usize),
}

impl<'a> LineClassifier<'a> {
    pub fn new(syntax: &'a CommentSyntax) -> Self {
        Self {
            syntax,
            open_block: None,
        }
    }

    /// Whether a block comment is open at the end of the last classified line.
    pub fn in_block_comment(&self) -> bool {
        self.open_block.is_some()
    }

    /// Classify the next line of the file.
    pub fn classify(&mut self, line: &str) -> LineKind {
        let trimmed = line.trim();

        if is_blank(trimmed) {
            return LineKind::Blank;
        }

        let mut has_code = false;
        let mut has_comment = false;
        let mut rest = trimmed;

        loop {
            if let Some(idx) = self.open_block {
                has_comment = true;
                let close = self.syntax.block[idx].close.as_str();
                match rest.find(close) {
                    Some(pos) => {
                        rest = &rest[pos + close.len()..];
                        self.open_block = None;
                    }
                    None => break,
                }
                continue;
            }

            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            match self.earliest_marker(rest) {
                None => {
                    has_code = true;
                    break;
                }
                Some((pos, marker)) => {
                    if !rest[..pos].trim().is_empty() {
                        has_code = true;
                    }
                    has_comment = true;
                    match marker {
                        Marker::Line => break,
                        Marker::Block(idx) => {
                            let open = self.syntax.block[idx].open.as_str();
                            rest = &rest[pos + open.len()..];
                            self.open_block = Some(idx);
                        }
                    }
                }
            }
        }

        match (has_code, has_comment) {
            (true, true) => LineKind::Mixed,
            (false, true) => LineKind::Comment,
            _ => LineKind::Code,
        }
    }

    /// First line or block marker in `text`, by byte offset.
    ///
    /// Markers are matched as plain substrings, quoted or not.
    fn earliest_marker(&self, text: &str) -> Option<(usize, Marker)> {
        let mut best: Option<(usize, Marker)> = None;

        for marker in &self.syntax.line {
            if let Some(pos) = text.find(marker.as_str()) {
                if best.as_ref().is_none_or(|(p, _)| pos < *p) {
                    best = Some((pos, Marker::Line));
                }
            }
        }

        for (idx, block) in self.syntax.block.iter().enumerate() {
            if let Some(pos) = text.find(block.open.as_str()) {
                if best.as_ref().is_none_or(|(p, _)| pos < *p) {
                    best = Some((pos, Marker::Block(idx)));
                }
            }
        }

        best
    }
}

fn is_blank(trimmed: &str) -> bool {
    trimmed.chars().all(|c| c == '{' || c == '}')
}

/// Classify a whole file's content and count its lines.
pub fn gather_stats(content: &str, syntax: &CommentSyntax) -> Locs {
    let mut classifier = LineClassifier::new(syntax);
    let mut stats = Locs::new();

    for line in content.lines() {
        stats.record(classifier.classify(line));
    }

    stats
}

/// Read a file and count its lines.
///
/// Invalid UTF-8 is replaced rather than rejected; unreadable files are errors.
pub fn gather_stats_for_path(path: impl AsRef<Path>, syntax: &CommentSyntax) -> Result<Locs> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| RepopulseError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let content = String::from_utf8_lossy(&bytes);
    Ok(gather_stats(&content, syntax))
}
