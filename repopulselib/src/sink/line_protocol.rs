//! InfluxDB line protocol encoding.
//!
//! ```text
//! loc_metrics,repo_id=octo/widgets,granularity=project total_loc=10i,weighted_loc=7.5 1700000000000000000
//! ```
//!
//! Tags with empty values are omitted. Integer fields carry the `i` suffix,
//! timestamps are in nanoseconds.

use std::fmt::Write as _;

use chrono::{DateTime, Utc};

use crate::records::{ChurnRecord, ChurnScope, LocRecord};

pub const LOC_MEASUREMENT: &str = "loc_metrics";
pub const CHURN_MEASUREMENT: &str = "churn_metrics";

enum FieldValue<'a> {
    Int(u64),
    Float(f64),
    Str(&'a str),
}

struct Line<'a> {
    measurement: &'a str,
    tags: Vec<(&'a str, &'a str)>,
    fields: Vec<(&'a str, FieldValue<'a>)>,
    timestamp: DateTime<Utc>,
}

impl Line<'_> {
    fn render(&self) -> String {
        let mut out = escape_measurement(self.measurement);

        for (key, value) in &self.tags {
            if value.is_empty() {
                continue;
            }
            let _ = write!(out, ",{}={}", escape_key(key), escape_key(value));
        }

        for (i, (key, value)) in self.fields.iter().enumerate() {
            out.push(if i == 0 { ' ' } else { ',' });
            out.push_str(&escape_key(key));
            out.push('=');
            match value {
                FieldValue::Int(v) => {
                    let _ = write!(out, "{v}i");
                }
                FieldValue::Float(v) => {
                    let _ = write!(out, "{v}");
                }
                FieldValue::Str(v) => {
                    let _ = write!(out, "\"{}\"", escape_string(v));
                }
            }
        }

        if let Some(ns) = self.timestamp.timestamp_nanos_opt() {
            let _ = write!(out, " {ns}");
        }

        out
    }
}

/// Encode a LOC record as one line.
pub fn encode_loc(record: &LocRecord) -> String {
    let mut tags = vec![
        ("repo_id", record.repo_id.as_str()),
        ("repo_name", record.repo_name.as_str()),
        ("branch", record.branch.as_str()),
        ("language", record.language.as_str()),
        ("granularity", record.granularity.as_str()),
        ("project_name", record.project_name.as_str()),
    ];
    if let Some(package) = &record.package_name {
        tags.push(("package_name", package.as_str()));
    }
    if let Some(path) = &record.file_path {
        tags.push(("file_path", path.as_str()));
    }

    Line {
        measurement: LOC_MEASUREMENT,
        tags,
        fields: vec![
            ("total_loc", FieldValue::Int(record.total_loc)),
            ("code_loc", FieldValue::Int(record.code_loc)),
            ("comment_loc", FieldValue::Int(record.comment_loc)),
            ("blank_loc", FieldValue::Int(record.blank_loc)),
            ("weighted_loc", FieldValue::Float(record.weighted_loc)),
            ("commit_hash", FieldValue::Str(&record.commit_hash)),
        ],
        timestamp: record.collected_at,
    }
    .render()
}

/// Encode a churn record as one line.
pub fn encode_churn(record: &ChurnRecord) -> String {
    let mut fields = vec![
        ("added", FieldValue::Int(record.added)),
        ("deleted", FieldValue::Int(record.deleted)),
        ("modified", FieldValue::Int(record.modified)),
        ("total", FieldValue::Int(record.total)),
    ];
    if let ChurnScope::Commit { hash, .. } = &record.scope {
        fields.push(("commit_hash", FieldValue::Str(hash)));
    }

    Line {
        measurement: CHURN_MEASUREMENT,
        tags: vec![
            ("repo_id", record.repo_id.as_str()),
            ("repo_name", record.repo_name.as_str()),
            ("branch", record.branch.as_str()),
            ("scope", record.scope.name()),
        ],
        fields,
        timestamp: record.scope.timestamp(),
    }
    .render()
}

fn escape_measurement(value: &str) -> String {
    value.replace(',', "\\,").replace(' ', "\\ ")
}

/// Tag keys, tag values and field keys.
fn escape_key(value: &str) -> String {
    value
        .replace(',', "\\,")
        .replace('=', "\\=")
        .replace(' ', "\\ ")
}

fn escape_string(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
