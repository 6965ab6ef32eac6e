//! Output formatting: present results as tables.
//!
//! - **LocTable**: headers, rows and footer as display-ready strings
//! - **TableRow**: a label with its formatted values
//!
//! Tables only format; every count is computed before they are built.
//!
//! ## Example
//!
//! ```rust,ignore
//! use repopulselib::output::{Aggregation, LocTable};
//!
//! let table = LocTable::from_count(&result, Aggregation::ByPackage);
//! // table.headers: ["Package", "Code", "Comments", "Blanks", "Total", "Weighted"]
//! // table.footer: TableRow { label: "Total (3 packages)", .. }
//! ```

pub mod table;

pub use table::{Aggregation, LocTable, TableRow};
