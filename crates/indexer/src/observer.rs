//! Progress hooks for scan and index runs.
//!
//! The coordinator reports through an injected [`IndexObserver`]; use
//! [`NoopObserver`] for headless runs and [`LogObserver`] to mirror progress
//! into the `log` facade.

use crate::error::FileFailure;
use crate::stats::{IndexPlan, IndexReport, ScanReport};
use std::path::Path;

/// Every hook has an empty default
pub trait IndexObserver: Send + Sync {
    fn scan_finished(&self, _report: &ScanReport) {}

    fn index_planned(&self, _plan: &IndexPlan) {}

    /// `position` is 1-based within the planned files
    fn file_started(&self, _path: &Path, _position: usize, _total: usize) {}

    fn file_indexed(&self, _path: &Path, _chunks: usize) {}

    fn file_failed(&self, _failure: &FileFailure) {}

    fn index_finished(&self, _report: &IndexReport) {}
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl IndexObserver for NoopObserver {}

#[derive(Debug, Default, Clone, Copy)]
pub struct LogObserver;

impl IndexObserver for LogObserver {
    fn scan_finished(&self, report: &ScanReport) {
        log::info!(
            "Scan: {} files ({} new, {} changed, {} unchanged, {} removed, {} failed)",
            report.files_found,
            report.new,
            report.changed,
            report.unchanged,
            report.removed,
            report.failed.len()
        );
    }

    fn index_planned(&self, plan: &IndexPlan) {
        log::info!(
            "{} index: {} of {} files, {} to purge",
            plan.mode.as_str(),
            plan.files_to_index,
            plan.tracked_files,
            plan.files_to_purge
        );
    }

    fn file_started(&self, path: &Path, position: usize, total: usize) {
        log::debug!("[{position}/{total}] {}", path.display());
    }

    fn file_failed(&self, failure: &FileFailure) {
        log::warn!("Skipped {failure}");
    }

    fn index_finished(&self, report: &IndexReport) {
        log::info!(
            "Indexed {} files ({} chunks) in {}ms",
            report.files_indexed,
            report.chunks_indexed,
            report.time_ms
        );
    }
}
