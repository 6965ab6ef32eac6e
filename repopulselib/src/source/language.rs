//! Language detection and comment syntax.
//!
//! Line classification is heuristic and depends on each language's comment
//! tokens. Those tokens live in a [`LanguageTable`] so callers can add
//! languages or override the defaults without touching the classifier.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

/// Source languages recognized by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Java,
    Python,
    TypeScript,
    JavaScript,
    Rust,
    Go,
    C,
    Cpp,
    CSharp,
    Kotlin,
    Shell,
}

impl Language {
    /// Map a file extension (without the dot, any case) to a language.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "java" => Some(Language::Java),
            "py" => Some(Language::Python),
            "ts" | "tsx" => Some(Language::TypeScript),
            "js" | "jsx" | "mjs" | "cjs" => Some(Language::JavaScript),
            "rs" => Some(Language::Rust),
            "go" => Some(Language::Go),
            "c" | "h" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "hpp" | "hh" => Some(Language::Cpp),
            "cs" => Some(Language::CSharp),
            "kt" | "kts" => Some(Language::Kotlin),
            "sh" | "bash" => Some(Language::Shell),
            _ => None,
        }
    }

    /// Detect the language of a path from its extension.
    pub fn from_path(path: impl AsRef<Path>) -> Option<Self> {
        path.as_ref()
            .extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }

    /// Lowercase name used in metric tags.
    pub fn name(&self) -> &'static str {
        match self {
            Language::Java => "java",
            Language::Python => "python",
            Language::TypeScript => "typescript",
            Language::JavaScript => "javascript",
            Language::Rust => "rust",
            Language::Go => "go",
            Language::C => "c",
            Language::Cpp => "cpp",
            Language::CSharp => "csharp",
            Language::Kotlin => "kotlin",
            Language::Shell => "shell",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A block comment delimiter pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDelimiters {
    pub open: String,
    pub close: String,
}

impl BlockDelimiters {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Self {
        Self {
            open: open.into(),
            close: close.into(),
        }
    }
}

/// Comment tokens for one language.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CommentSyntax {
    /// Markers that comment out the rest of the line (`//`, `#`)
    pub line: Vec<String>,
    /// Block comment delimiters (`/* */`, Python docstrings)
    pub block: Vec<BlockDelimiters>,
}

impl CommentSyntax {
    /// `//` line comments and `/* */` blocks (Javadoc included).
    pub fn c_style() -> Self {
        Self {
            line: vec!["//".to_string()],
            block: vec![BlockDelimiters::new("/*", "*/")],
        }
    }

    /// `#` line comments only.
    pub fn hash() -> Self {
        Self {
            line: vec!["#".to_string()],
            block: Vec::new(),
        }
    }

    /// `#` line comments, with triple-quoted docstrings treated as block comments.
    pub fn python() -> Self {
        Self {
            line: vec!["#".to_string()],
            block: vec![
                BlockDelimiters::new("\"\"\"", "\"\"\""),
                BlockDelimiters::new("'''", "'''"),
            ],
        }
    }
}

/// Comment syntax keyed by language.
///
/// Only files whose language has an entry are analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageTable {
    syntaxes: HashMap<Language, CommentSyntax>,
}

impl Default for LanguageTable {
    fn default() -> Self {
        let mut table = Self::empty();
        for lang in [
            Language::Java,
            Language::TypeScript,
            Language::JavaScript,
            Language::Rust,
            Language::Go,
            Language::C,
            Language::Cpp,
            Language::CSharp,
            Language::Kotlin,
        ] {
            table.syntaxes.insert(lang, CommentSyntax::c_style());
        }
        table.syntaxes.insert(Language::Python, CommentSyntax::python());
        table.syntaxes.insert(Language::Shell, CommentSyntax::hash());
        table
    }
}

impl LanguageTable {
    /// A table with no languages; nothing is analyzed until entries are added.
    pub fn empty() -> Self {
        Self {
            syntaxes: HashMap::new(),
        }
    }

    /// Add or replace the comment syntax for a language.
    pub fn with(mut self, language: Language, syntax: CommentSyntax) -> Self {
        self.syntaxes.insert(language, syntax);
        self
    }

    /// Stop analyzing a language.
    pub fn without(mut self, language: Language) -> Self {
        self.syntaxes.remove(&language);
        self
    }

    pub fn syntax(&self, language: Language) -> Option<&CommentSyntax> {
        self.syntaxes.get(&language)
    }

    /// Resolve a path to its language and syntax, if the language is analyzed.
    pub fn lookup(&self, path: &Path) -> Option<(Language, &CommentSyntax)> {
        let language = Language::from_path(path)?;
        self.syntax(language).map(|syntax| (language, syntax))
    }

    pub fn supports(&self, path: &Path) -> bool {
        self.lookup(path).is_some()
    }

    pub fn languages(&self) -> Vec<Language> {
        let mut langs: Vec<Language> = self.syntaxes.keys().copied().collect();
        langs.sort();
        langs
    }
}
