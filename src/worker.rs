//! Worker loop: pull values off the shared queue, apply the action, report.

use crate::collector::Report;
use crate::error::ValueError;
use crate::interrupt::InterruptFlag;
use crossbeam_channel::{Receiver, Sender};

/// Caller-supplied per-value operation.
///
/// Implemented for any `Fn(&str) -> anyhow::Result<()> + Sync`, so plain
/// closures work; [`crate::CommandAction`] is the process-spawning one.
pub trait Action: Sync {
    fn call(&self, value: &str) -> anyhow::Result<()>;
}

impl<F> Action for F
where
    F: Fn(&str) -> anyhow::Result<()> + Sync,
{
    fn call(&self, value: &str) -> anyhow::Result<()> {
        self(value)
    }
}

/// Process values until the queue is closed and drained, or until the
/// interrupt flag is seen set. A value dequeued after interruption is dropped
/// without a report.
pub(crate) fn work<A: Action + ?Sized>(
    id: usize,
    action: &A,
    values: Receiver<String>,
    reports: Sender<Report>,
    interrupted: &InterruptFlag,
) {
    for value in values.iter() {
        if interrupted.get() {
            tracing::debug!(worker = id, value = %value, "interrupted; not starting value");
            return;
        }
        tracing::debug!(worker = id, value = %value, "processing");
        let report = match action.call(&value) {
            Ok(()) => None,
            Err(cause) => {
                tracing::warn!(worker = id, value = %value, "action failed: {cause:#}");
                Some(ValueError::new(value, cause))
            }
        };
        if reports.send(report).is_err() {
            // collector is gone; nothing left to report to
            return;
        }
    }
}
