//! Table-ready data structures for LOC and churn output.
//!
//! Tables are a pure presentation layer: they format already-aggregated
//! results into strings and can be rendered as text or serialized to JSON.

use serde::{Deserialize, Serialize};

use crate::data::{Churn, ChurnReport, CountResult, Locs};

/// Level LOC rows are reported at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    /// Only the project footer
    #[default]
    Total,
    ByPackage,
    ByFile,
}

/// A single row in the table (data row or footer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableRow {
    /// Row label (file path, package name, "Total (N files)", etc.)
    pub label: String,
    /// Values for each column after the label, ready for display
    pub values: Vec<String>,
}

/// Table-ready data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocTable {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Column headers: [label_header, columns..]
    pub headers: Vec<String>,
    pub rows: Vec<TableRow>,
    pub footer: TableRow,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub legend: Option<String>,
}

const LOC_COLUMNS: [&str; 5] = ["Code", "Comments", "Blanks", "Total", "Weighted"];
const CHURN_COLUMNS: [&str; 4] = ["Added", "Deleted", "Modified", "Total"];

impl LocTable {
    /// LOC rows at the given aggregation, sorted by label.
    pub fn from_count(result: &CountResult, aggregation: Aggregation) -> Self {
        let rows: Vec<TableRow> = match aggregation {
            Aggregation::Total => Vec::new(),
            Aggregation::ByPackage => result
                .packages
                .iter()
                .map(|p| TableRow {
                    label: p.name.clone(),
                    values: format_locs(&p.stats),
                })
                .collect(),
            Aggregation::ByFile => result
                .files
                .iter()
                .map(|f| TableRow {
                    label: f.path.to_string_lossy().replace('\\', "/"),
                    values: format_locs(&f.stats),
                })
                .collect(),
        };

        let footer = TableRow {
            label: build_footer_label(aggregation, rows.len(), result.file_count),
            values: format_locs(&result.total),
        };

        LocTable {
            title: None,
            headers: build_headers(label_header(aggregation), &LOC_COLUMNS),
            rows,
            footer,
            legend: Some("(weighted = code + 0.5 × comments)".to_string()),
        }
    }

    /// Churn rows per day, or per commit when `by_commit` is set.
    pub fn from_churn(report: &ChurnReport, by_commit: bool) -> Self {
        let rows: Vec<TableRow> = if by_commit {
            report
                .commits
                .iter()
                .map(|c| TableRow {
                    label: format!("{} {}", short_id(&c.id), c.committed_at.format("%Y-%m-%d")),
                    values: format_churn(&c.churn),
                })
                .collect()
        } else {
            report
                .daily
                .iter()
                .map(|(day, churn)| TableRow {
                    label: day.to_string(),
                    values: format_churn(churn),
                })
                .collect()
        };

        let footer = TableRow {
            label: format!("Total ({} commits)", report.commits.len()),
            values: format_churn(&report.total),
        };

        LocTable {
            title: Some(format!("Churn: {}", report.range)),
            headers: build_headers(if by_commit { "Commit" } else { "Day" }, &CHURN_COLUMNS),
            rows,
            footer,
            legend: Some("(modified = min(added, deleted))".to_string()),
        }
    }
}

fn label_header(aggregation: Aggregation) -> &'static str {
    match aggregation {
        Aggregation::Total => "Name",
        Aggregation::ByPackage => "Package",
        Aggregation::ByFile => "File",
    }
}

/// Build footer label based on aggregation level.
///
/// For Total aggregation (no item rows), reports the total file count.
fn build_footer_label(aggregation: Aggregation, items_count: usize, file_count: usize) -> String {
    match aggregation {
        Aggregation::Total => format!("Total ({} files)", file_count),
        Aggregation::ByPackage => format!("Total ({} packages)", items_count),
        Aggregation::ByFile => format!("Total ({} files)", items_count),
    }
}

fn build_headers(label: &str, columns: &[&str]) -> Vec<String> {
    std::iter::once(label)
        .chain(columns.iter().copied())
        .map(str::to_string)
        .collect()
}

fn format_locs(locs: &Locs) -> Vec<String> {
    vec![
        locs.code.to_string(),
        locs.comments.to_string(),
        locs.blanks.to_string(),
        locs.total.to_string(),
        format!("{:.1}", locs.weighted()),
    ]
}

fn format_churn(churn: &Churn) -> Vec<String> {
    vec![
        format!("+{}", churn.added),
        format!("-{}", churn.deleted),
        churn.modified.to_string(),
        churn.total.to_string(),
    ]
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{
        analyze_churn, CommitNumstat, DateRange, FileNumstat, FileStats, PackageStats,
    };
    use crate::source::Language;
    use chrono::{TimeZone, Utc};
    use std::path::PathBuf;

    fn locs(code: u64, comments: u64) -> Locs {
        Locs {
            code,
            comments,
            blanks: 1,
            total: code + comments + 1,
        }
    }

    fn sample_count_result() -> CountResult {
        let mut result = CountResult::new(PathBuf::from("/repo"));
        let file = FileStats::new(PathBuf::from("alpha/a.py"), Language::Python, locs(50, 10));
        result.add_file(file);
        let file = FileStats::new(PathBuf::from("beta/b.py"), Language::Python, locs(150, 5));
        result.add_file(file);
        let mut alpha = PackageStats::new("alpha".to_string());
        alpha.add_file(&result.files[0]);
        let mut beta = PackageStats::new("beta".to_string());
        beta.add_file(&result.files[1]);
        result.packages = vec![alpha, beta];
        result
    }

    #[test]
    fn test_headers_by_package() {
        let table = LocTable::from_count(&sample_count_result(), Aggregation::ByPackage);
        assert_eq!(
            table.headers,
            vec!["Package", "Code", "Comments", "Blanks", "Total", "Weighted"]
        );
    }

    #[test]
    fn test_total_only_has_footer() {
        let table = LocTable::from_count(&sample_count_result(), Aggregation::Total);
        assert!(table.rows.is_empty());
        assert_eq!(table.headers[0], "Name");
        assert_eq!(table.footer.label, "Total (2 files)");
        assert_eq!(table.footer.values, vec!["200", "15", "2", "217", "207.5"]);
    }

    #[test]
    fn test_rows_by_file() {
        let table = LocTable::from_count(&sample_count_result(), Aggregation::ByFile);
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].label, "alpha/a.py");
        assert_eq!(table.rows[0].values[0], "50");
        assert_eq!(table.rows[0].values[4], "55.0");
        assert_eq!(table.footer.label, "Total (2 files)");
    }

    #[test]
    fn test_footer_by_package() {
        let table = LocTable::from_count(&sample_count_result(), Aggregation::ByPackage);
        assert_eq!(table.footer.label, "Total (2 packages)");
        assert_eq!(table.rows[1].label, "beta");
    }

    #[test]
    fn test_churn_table() {
        let commits = vec![
            CommitNumstat {
                id: "0123456789abcdef".into(),
                committed_at: Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap(),
                files: vec![FileNumstat::text("a.py", 5, 3)],
            },
            CommitNumstat {
                id: "fedcba9876543210".into(),
                committed_at: Utc.with_ymd_and_hms(2025, 6, 2, 9, 0, 0).unwrap(),
                files: vec![FileNumstat::text("b.py", 2, 0)],
            },
        ];
        let report = analyze_churn(&commits, DateRange::parse("2025-06-01", "2025-06-07").unwrap());

        let daily = LocTable::from_churn(&report, false);
        assert_eq!(daily.title.as_deref(), Some("Churn: 2025-06-01..2025-06-07"));
        assert_eq!(daily.rows.len(), 2);
        assert_eq!(daily.rows[0].label, "2025-06-02");
        assert_eq!(daily.footer.values, vec!["+7", "-3", "3", "10"]);

        let by_commit = LocTable::from_churn(&report, true);
        assert_eq!(by_commit.headers[0], "Commit");
        assert_eq!(by_commit.rows[0].label, "01234567 2025-06-05");
        assert_eq!(by_commit.footer.label, "Total (2 commits)");
    }
}
