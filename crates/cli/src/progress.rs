//! Terminal progress bar for `bugtrace index`.

use bugtrace_indexer::{FileFailure, IndexObserver, IndexPlan, IndexReport};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

const BAR_TEMPLATE: &str = "{bar:40.cyan/blue} {pos:>3}/{len:3} {msg}";

/// Draws on stderr, so stdout stays clean for `--json`. Hidden until a plan
/// with work in it arrives.
pub struct IndicatifObserver {
    pb: ProgressBar,
}

impl IndicatifObserver {
    pub fn new() -> Self {
        Self {
            pb: ProgressBar::hidden(),
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar())
    }
}

impl Default for IndicatifObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl IndexObserver for IndicatifObserver {
    fn index_planned(&self, plan: &IndexPlan) {
        if plan.files_to_index == 0 {
            return;
        }
        self.pb.set_draw_target(indicatif::ProgressDrawTarget::stderr());
        self.pb.set_style(Self::style());
        self.pb.set_length(plan.files_to_index as u64);
        self.pb.set_position(0);
    }

    fn file_started(&self, path: &Path, _position: usize, _total: usize) {
        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().to_string());
        self.pb.set_message(name);
    }

    fn file_indexed(&self, _path: &Path, _chunks: usize) {
        self.pb.inc(1);
    }

    fn file_failed(&self, _failure: &FileFailure) {
        self.pb.inc(1);
    }

    fn index_finished(&self, _report: &IndexReport) {
        self.pb.finish_and_clear();
    }
}
