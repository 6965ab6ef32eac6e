//! The analysis a worker runs for one job.

use chrono::Utc;

use crate::config::AnalysisOptions;
use crate::data::{analyze_churn, count_directory, language_label, DateRange};
use crate::error::RepopulseError;
use crate::materialize::Materializer;
use crate::records::{churn_records, loc_records};
use crate::sink::MetricsSink;
use crate::Result;

use super::model::{
    ChurnSummary, JobId, JobRequest, JobResult, JobSource, PackageSummary, PROGRESS_CLONING,
    PROGRESS_COUNTED, PROGRESS_RETRIEVED,
};

/// Materialize, count, measure churn and persist.
///
/// `progress` is called with a percentage at each milestone. Errors keep
/// their kind: retrieval for the materializer, computation for counting,
/// persistence for the sink. Records reach the sink in a single batch.
pub fn run_pipeline(
    id: JobId,
    request: &JobRequest,
    materializer: &dyn Materializer,
    sink: &dyn MetricsSink,
    options: &AnalysisOptions,
    progress: &dyn Fn(u8),
) -> Result<JobResult> {
    if matches!(request.source, JobSource::RepoUrl(_)) {
        progress(PROGRESS_CLONING);
    }
    let checkout = materializer
        .materialize(&request.source)
        .map_err(as_retrieval)?;
    tracing::debug!(job_id = %id, root = %checkout.root.display(), "checkout ready");
    progress(PROGRESS_RETRIEVED);

    let count = count_directory(&checkout.root, &options.count_options())
        .map_err(as_computation)?;
    progress(PROGRESS_COUNTED);

    let range = request
        .range
        .unwrap_or_else(|| DateRange::trailing_from_now(options.churn_window_days));
    let history = materializer
        .commit_history(&checkout, &range)
        .map_err(as_retrieval)?;
    let churn = analyze_churn(&history, range);

    let context = checkout.context();
    let loc = loc_records(&context, &count, Utc::now());
    let churn_points = churn_records(&context, &churn);

    sink.write(&loc, &churn_points).map_err(as_persistence)?;

    tracing::debug!(
        job_id = %id,
        loc_points = loc.len(),
        churn_points = churn_points.len(),
        "metrics written"
    );

    let packages = count
        .packages
        .iter()
        .map(|p| PackageSummary {
            name: p.name.clone(),
            language: language_label(&p.languages),
            file_count: p.files.len(),
            loc: p.stats,
            weighted_loc: p.stats.weighted(),
        })
        .collect();

    Ok(JobResult {
        repo_id: context.repo_id,
        repo_name: context.repo_name,
        branch: context.branch,
        commit_hash: context.commit_hash,
        file_count: count.file_count,
        package_count: count.packages.len(),
        loc: count.total,
        weighted_loc: count.total.weighted(),
        packages,
        churn: ChurnSummary {
            range: churn.range,
            commit_count: churn.commits.len(),
            total: churn.total,
            daily: churn.daily,
        },
        records_written: loc.len() + churn_points.len(),
    })
}

fn as_retrieval(err: RepopulseError) -> RepopulseError {
    match err.kind() {
        crate::error::ErrorKind::Retrieval => err,
        _ => RepopulseError::Retrieval(err.to_string()),
    }
}

fn as_computation(err: RepopulseError) -> RepopulseError {
    match err.kind() {
        crate::error::ErrorKind::Computation => err,
        _ => RepopulseError::Computation(err.to_string()),
    }
}

fn as_persistence(err: RepopulseError) -> RepopulseError {
    match err.kind() {
        crate::error::ErrorKind::Persistence => err,
        _ => RepopulseError::Persistence(err.to_string()),
    }
}
