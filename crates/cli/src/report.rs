use bugtrace_indexer::{IndexOutcome, IndexReport, IndexStatus, ScanReport};
use bugtrace_vector_store::SearchResult;
use std::fmt::Write as _;
use std::path::Path;

const PREVIEW_LINES: usize = 3;
const PREVIEW_WIDTH: usize = 100;

pub fn render_scan(report: &ScanReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scanned {} files in {}ms", report.files_found, report.time_ms);
    let _ = writeln!(out, "  new:       {}", report.new);
    let _ = writeln!(out, "  changed:   {}", report.changed);
    let _ = writeln!(out, "  unchanged: {}", report.unchanged);
    let _ = writeln!(out, "  removed:   {}", report.removed);
    let _ = writeln!(out, "  failed:    {}", report.failed.len());
    for failure in &report.failed {
        let _ = writeln!(out, "    {failure}");
    }
    out
}

pub fn render_index(outcome: &IndexOutcome) -> String {
    match outcome {
        IndexOutcome::NothingToIndex => "No files to index\n".to_string(),
        IndexOutcome::AlreadyCurrent { total_files } => {
            format!("Index is up to date ({total_files} files)\n")
        }
        IndexOutcome::Indexed(report) => render_index_report(report),
    }
}

fn render_index_report(report: &IndexReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} index: {} files, {} chunks in {}ms",
        report.mode.as_str(),
        report.files_indexed,
        report.chunks_indexed,
        report.time_ms
    );
    if report.files_purged > 0 {
        let _ = writeln!(
            out,
            "  purged {} removed files ({} chunks)",
            report.files_purged, report.chunks_purged
        );
    }
    for (language, files) in &report.languages {
        let _ = writeln!(out, "  {language}: {files} files");
    }
    let _ = writeln!(
        out,
        "Collection {}: {} chunks from {} files",
        report.collection_name, report.total_chunks, report.total_files
    );
    if !report.failures.is_empty() {
        let _ = writeln!(out, "Skipped {} files:", report.failures.len());
        for failure in &report.failures {
            let _ = writeln!(out, "  {failure}");
        }
    }
    out
}

pub fn render_search(query: &str, results: &[SearchResult], root: &Path) -> String {
    if results.is_empty() {
        return format!("No results for \"{query}\"\n");
    }

    let mut out = String::new();
    for (rank, result) in results.iter().enumerate() {
        let file = result.file().map_or_else(
            || "<unknown>".to_string(),
            |file| {
                Path::new(file)
                    .strip_prefix(root)
                    .map_or_else(|_| file.to_string(), |p| p.display().to_string())
            },
        );
        let start = result.field("line_start").unwrap_or_else(|| "?".to_string());
        let end = result.field("line_end").unwrap_or_else(|| "?".to_string());
        let similarity = result
            .similarity()
            .map_or_else(|| "-".to_string(), |s| format!("{s:.3}"));

        let _ = write!(
            out,
            "{}. {file}:{start}-{end}  score {:.4}  similarity {similarity}",
            rank + 1,
            result.score
        );
        if let Some(name) = result.field("definition_name") {
            let _ = write!(out, "  [{name}]");
        }
        out.push('\n');
        for line in preview(&result.text) {
            let _ = writeln!(out, "     {line}");
        }
    }
    out
}

pub fn render_status(status: &IndexStatus) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Phase: {}", status.phase);
    for reason in &status.reasons {
        let _ = writeln!(out, "  - {reason}");
    }
    let _ = writeln!(out, "Tracked files: {}", status.tracked_files);
    let _ = writeln!(out, "Indexed files: {}", status.indexed_files);
    let _ = writeln!(out, "Last scan:  {}", timestamp(status.last_scan.as_ref()));
    let _ = writeln!(out, "Last index: {}", timestamp(status.last_index.as_ref()));
    let _ = writeln!(
        out,
        "Collection {}: {} chunks from {} files",
        status.collection.collection_name,
        status.collection.total_chunks,
        status.collection.total_files
    );
    out
}

fn timestamp<T: std::fmt::Display>(value: Option<&T>) -> String {
    value.map_or_else(|| "never".to_string(), ToString::to_string)
}

fn preview(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim_end)
        .filter(|line| !line.trim().is_empty())
        .take(PREVIEW_LINES)
        .map(|line| {
            if line.chars().count() > PREVIEW_WIDTH {
                let cut: String = line.chars().take(PREVIEW_WIDTH).collect();
                format!("{cut}…")
            } else {
                line.to_string()
            }
        })
        .collect()
}
