//! Pipeline metrics.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const RUNS_STARTED_TOTAL: &str = "vrev_runs_started_total";
    pub const RUNS_COMPLETED_TOTAL: &str = "vrev_runs_completed_total";
    pub const RUNS_ABORTED_TOTAL: &str = "vrev_runs_aborted_total";
    pub const RUN_DURATION_SECONDS: &str = "vrev_run_duration_seconds";
    pub const FRAMES_ANALYZED_TOTAL: &str = "vrev_frames_analyzed_total";
    pub const CAPTURES_TOTAL: &str = "vrev_captures_total";
    pub const STORYBOARDS_TOTAL: &str = "vrev_storyboards_total";
    pub const STALE_UPDATES_TOTAL: &str = "vrev_stale_updates_total";
}

pub fn record_run_started() {
    counter!(names::RUNS_STARTED_TOTAL).increment(1);
}

pub fn record_run_completed(duration_secs: f64) {
    counter!(names::RUNS_COMPLETED_TOTAL).increment(1);
    histogram!(names::RUN_DURATION_SECONDS).record(duration_secs);
}

pub fn record_run_aborted() {
    counter!(names::RUNS_ABORTED_TOTAL).increment(1);
}

/// Record one analysis outcome. `origin` is "batch" or "capture".
pub fn record_frame_analyzed(origin: &str, success: bool) {
    let labels = [
        ("origin", origin.to_string()),
        ("outcome", outcome(success).to_string()),
    ];
    counter!(names::FRAMES_ANALYZED_TOTAL, &labels).increment(1);
}

pub fn record_capture(success: bool) {
    let labels = [("outcome", outcome(success).to_string())];
    counter!(names::CAPTURES_TOTAL, &labels).increment(1);
}

pub fn record_storyboard(success: bool) {
    let labels = [("outcome", outcome(success).to_string())];
    counter!(names::STORYBOARDS_TOTAL, &labels).increment(1);
}

pub fn record_stale_update() {
    counter!(names::STALE_UPDATES_TOTAL).increment(1);
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}
