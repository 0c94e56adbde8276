//! Progress reporting: a count-style bar over values completed in a run.

use indicatif::{ProgressBar, ProgressStyle};

const COUNT_TEMPLATE: &str = "{spinner:.green} {msg} {pos}/{len} [{bar:.cyan/blue}] {percent:>3}%  \
     it/s: {per_sec}  elapsed: {elapsed_precise}  eta: {eta_precise}";

/// Count-style progress bar (items processed out of total), with an optional label.
pub fn make_count_progress(total: u64, label: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    // the template is a constant, so only a malformed edit can fail here
    if let Ok(style) = ProgressStyle::with_template(COUNT_TEMPLATE) {
        pb.set_style(style.progress_chars("█▉▊▋▌▍▎▏  "));
    }
    if !label.is_empty() {
        pb.set_message(label.to_string());
    }
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

/// Thin wrapper so the collector only needs `inc_items` and the runner `finish`.
/// Clones share the same bar.
#[derive(Clone)]
pub struct ProgressScope {
    pb: ProgressBar,
}

impl ProgressScope {
    pub fn count<T: Into<String>>(label: T, total: u64) -> Self {
        let label = label.into();
        Self { pb: make_count_progress(total, &label) }
    }
    /// Point the bar at a new run of `total` items, starting from zero.
    pub fn restart(&self, total: u64) {
        self.pb.reset();
        self.pb.set_length(total);
        self.pb.set_position(0);
    }
    #[inline]
    pub fn inc_items(&self, delta: u64) {
        self.pb.inc(delta);
    }
    pub fn finish<T: Into<String>>(&self, msg: T) {
        self.pb.finish_with_message(msg.into());
    }
    pub fn position(&self) -> u64 {
        self.pb.position()
    }
    pub fn length(&self) -> Option<u64> {
        self.pb.length()
    }
    pub fn message(&self) -> String {
        self.pb.message()
    }
    pub fn is_finished(&self) -> bool {
        self.pb.is_finished()
    }
}
