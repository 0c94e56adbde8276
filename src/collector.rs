//! Error collector: the single consumer of worker reports.

use crate::error::{RunFailure, ValueError};
use crate::progress::ProgressScope;
use crossbeam_channel::Receiver;

/// What a worker sends after processing one value: `None` on success.
pub(crate) type Report = Option<ValueError>;

/// Drain `reports` until every sender is gone and return the failures in
/// arrival order. Runs on its own thread so workers never share the vector.
pub(crate) fn collect(reports: Receiver<Report>, progress: Option<&ProgressScope>) -> Vec<RunFailure> {
    let mut failures = Vec::new();
    for report in reports.iter() {
        if let Some(pb) = progress {
            pb.inc_items(1);
        }
        if let Some(err) = report {
            failures.push(RunFailure::Value(err));
        }
    }
    failures
}
