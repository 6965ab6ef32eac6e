//! Text rendering for CLI output

use console::Style;
use repopulselib::{Job, JobStatus, LocTable, PoolState, TableRow};

const CELL_WIDTH: usize = 10;
const MIN_NAME_WIDTH: usize = 12;
const MAX_NAME_WIDTH: usize = 60;

/// Truncate a name to fit within max_len, adding ".." prefix if needed
fn truncate_name(name: &str, max_len: usize) -> String {
    let chars: Vec<char> = name.chars().collect();
    if chars.len() > max_len {
        let tail: String = chars[chars.len() - (max_len - 2)..].iter().collect();
        format!("..{}", tail)
    } else {
        name.to_string()
    }
}

fn name_width(table: &LocTable) -> usize {
    table
        .rows
        .iter()
        .chain(std::iter::once(&table.footer))
        .map(|r| r.label.chars().count())
        .chain(table.headers.first().map(|h| h.len()))
        .max()
        .unwrap_or(0)
        .clamp(MIN_NAME_WIDTH, MAX_NAME_WIDTH)
        + 2
}

fn render_row(row: &TableRow, name_width: usize, style: &Style) -> String {
    let name = truncate_name(&row.label, name_width - 2);
    let mut line = format!("{:<width$}", name, width = name_width);
    for value in &row.values {
        line.push_str(&format!(" {:>width$}", value, width = CELL_WIDTH));
    }
    format!("{}\n", style.apply_to(line.trim_end()))
}

/// Render a table as aligned text.
pub fn render_table(table: &LocTable) -> String {
    let bold = Style::new().bold();
    let plain = Style::new();
    let width = name_width(table);

    let mut out = String::new();
    if let Some(title) = &table.title {
        out.push_str(&format!("{}\n\n", bold.apply_to(title)));
    }

    let header = TableRow {
        label: table.headers.first().cloned().unwrap_or_default(),
        values: table.headers.iter().skip(1).cloned().collect(),
    };
    out.push_str(&render_row(&header, width, &bold));

    let separator = "-".repeat(width + (CELL_WIDTH + 1) * header.values.len());
    out.push_str(&format!("{}\n", separator));

    for row in &table.rows {
        out.push_str(&render_row(row, width, &plain));
    }
    if !table.rows.is_empty() {
        out.push_str(&format!("{}\n", separator));
    }
    out.push_str(&render_row(&table.footer, width, &bold));

    if let Some(legend) = &table.legend {
        out.push_str(&format!("\n{}\n", Style::new().dim().apply_to(legend)));
    }
    out
}

fn status_style(status: JobStatus) -> Style {
    match status {
        JobStatus::Completed => Style::new().green(),
        JobStatus::Failed => Style::new().red().bold(),
        JobStatus::Processing => Style::new().yellow(),
        JobStatus::Queued => Style::new().dim(),
    }
}

fn status_cell(job: &Job) -> String {
    if job.status.is_terminal() {
        format!("{:<16}", job.status.as_str())
    } else {
        format!("{:<16}", format!("{} {:>3}%", job.status.as_str(), job.progress))
    }
}

/// One block per job: id, status, source and outcome.
pub fn render_jobs(jobs: &[Job]) -> String {
    let mut out = String::new();

    for job in jobs {
        let status = status_cell(job);
        out.push_str(&format!(
            "{}  {}  {}\n",
            job.id,
            status_style(job.status).apply_to(status),
            job.source
        ));

        if let Some(result) = &job.result {
            out.push_str(&format!(
                "    {} files, {} packages, {} code / {} comments / {} blanks, weighted {:.1}\n",
                result.file_count,
                result.package_count,
                result.loc.code,
                result.loc.comments,
                result.loc.blanks,
                result.weighted_loc
            ));
            out.push_str(&format!(
                "    churn {}: {} commits, +{} -{} ({} modified), {} points written\n",
                result.churn.range,
                result.churn.commit_count,
                result.churn.total.added,
                result.churn.total.deleted,
                result.churn.total.modified,
                result.records_written
            ));
        }
        if let Some(error) = &job.error {
            out.push_str(&format!(
                "    {} {}\n",
                Style::new().red().apply_to(format!("[{}]", error.kind)),
                error.message
            ));
        }
    }

    out
}

/// Single-line pool summary.
pub fn render_pool(state: &PoolState) -> String {
    let queue = format!("{}/{}", state.queue_depth, state.queue_capacity);
    let queue = if state.queue_full() {
        Style::new().red().apply_to(queue).to_string()
    } else {
        queue
    };
    format!(
        "{} {} workers ({} busy, {} idle), queue {}, {} in flight, {} completed, {} failed\n",
        Style::new().bold().apply_to("Pool:"),
        state.pool_size,
        state.busy_workers,
        state.idle_workers(),
        queue,
        state.in_flight(),
        state.completed,
        state.failed
    )
}
