//! Source discovery: find files to analyze.
//!
//! This module handles the first stage of the pipeline - discovering which
//! files in a checkout are counted and how their comments look. It provides:
//!
//! - **Languages**: extension → language, and the per-language comment table
//! - **File filtering**: include/exclude files with glob patterns
//!
//! ## Example
//!
//! ```rust,ignore
//! use repopulselib::source::{discover_files, FilterConfig, LanguageTable};
//!
//! let filter = FilterConfig::new().exclude("**/generated/**")?;
//! let files = discover_files(".", &filter, &LanguageTable::default())?;
//! ```

pub mod filter;
pub mod language;

pub use filter::{discover_files, FilterConfig};
pub use language::{BlockDelimiters, CommentSyntax, Language, LanguageTable};
