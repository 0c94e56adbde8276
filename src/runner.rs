//! Dispatcher: feeds values through a rendezvous queue to a fixed pool of
//! worker threads and folds their reports into one aggregate result.
//!
//! Threads per run: `workers` workers, one collector, one stop watcher. All of
//! them live inside a `std::thread::scope`, so `run` cannot return while any
//! of them is still alive.

use crate::collector::{collect, Report};
use crate::config::RunnerOptions;
use crate::error::{AggregateError, ConfigError, RunFailure};
use crate::interrupt::InterruptFlag;
use crate::progress::ProgressScope;
use crate::stop::StopSignal;
use crate::util::init_tracing_once;
use crate::worker::{work, Action};
use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use std::panic;
use std::thread;

pub struct Runner<A> {
    opts: RunnerOptions,
    action: A,
    bar: Option<ProgressScope>,
}

impl<A: Action> Runner<A> {
    /// `workers` must be at least 1.
    pub fn new(workers: usize, action: A) -> Result<Self, ConfigError> {
        Self::with_options(RunnerOptions::default().with_workers(workers), action)
    }

    pub fn with_options(opts: RunnerOptions, action: A) -> Result<Self, ConfigError> {
        opts.validate()?;
        Ok(Self { opts, action, bar: None })
    }

    // -------- Builder methods --------
    pub fn progress(mut self, yes: bool) -> Self { self.opts = self.opts.with_progress(yes); self }
    pub fn progress_label(mut self, label: impl Into<String>) -> Self { self.opts = self.opts.with_progress_label(label); self }
    /// Report into a caller-owned bar (e.g. one added to a `MultiProgress`); implies `progress(true)`.
    pub fn progress_scope(mut self, scope: ProgressScope) -> Self { self.opts = self.opts.with_progress(true); self.bar = Some(scope); self }

    pub fn workers(&self) -> usize { self.opts.workers }
    pub fn action(&self) -> &A { &self.action }

    /// Apply the action to every non-blank value using `workers` threads.
    ///
    /// Values are handed out in input order, one at a time; the feeder blocks
    /// while every worker is busy. Action failures never stop the run. When
    /// `stop` fires, no new value is started, dispatch halts, and the result
    /// carries a trailing [`RunFailure::Interrupted`].
    ///
    /// Returns `Ok(())` only when nothing failed and no stop was observed.
    pub fn run<I, S>(&self, values: I, stop: &StopSignal) -> Result<(), AggregateError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        init_tracing_once();

        let values: Vec<String> = values
            .into_iter()
            .map(Into::into)
            .filter(|v| {
                let blank = v.trim().is_empty();
                if blank {
                    tracing::debug!("skipping blank value");
                }
                !blank
            })
            .collect();
        let workers = self.opts.workers;
        tracing::info!(values = values.len(), workers, "starting run");

        let progress = match (&self.bar, self.opts.progress) {
            (_, false) => None,
            (Some(bar), true) => {
                bar.restart(values.len() as u64);
                Some(bar.clone())
            }
            (None, true) => Some(ProgressScope::count(
                self.opts.progress_label.clone().unwrap_or_default(),
                values.len() as u64,
            )),
        };

        let interrupted = InterruptFlag::new();
        let mut failures = thread::scope(|scope| {
            // Every channel end is owned by this closure so an unwinding worker
            // panic still disconnects them and the remaining threads can exit.
            let (value_tx, value_rx) = bounded::<String>(0);
            let (report_tx, report_rx) = unbounded::<Report>();
            let (done_tx, done_rx) = bounded::<()>(0);
            let (halt_tx, halt_rx) = bounded::<()>(0);

            let progress_ref = progress.as_ref();
            let collector = scope.spawn(move || collect(report_rx, progress_ref));

            let watcher = {
                let interrupted = interrupted.clone();
                scope.spawn(move || {
                    if stop.wait_or_done(&done_rx) {
                        tracing::warn!("stop signal received; no new values will be started");
                        interrupted.set();
                    }
                    drop(halt_tx);
                })
            };

            let handles: Vec<_> = (0..workers)
                .map(|id| {
                    let values = value_rx.clone();
                    let reports = report_tx.clone();
                    let interrupted = interrupted.clone();
                    let action = &self.action;
                    scope.spawn(move || work(id, action, values, reports, &interrupted))
                })
                .collect();
            // workers hold the only receivers, so a send fails once they have all exited
            drop(value_rx);

            let dispatched = feed(values, &value_tx, &halt_rx, &interrupted);
            tracing::debug!(dispatched, "dispatch finished");
            drop(value_tx);

            for handle in handles {
                if let Err(payload) = handle.join() {
                    panic::resume_unwind(payload);
                }
            }
            drop(report_tx);
            let failures = match collector.join() {
                Ok(failures) => failures,
                Err(payload) => panic::resume_unwind(payload),
            };

            drop(done_tx);
            if let Err(payload) = watcher.join() {
                panic::resume_unwind(payload);
            }
            failures
        });

        let was_interrupted = interrupted.get();
        if was_interrupted {
            failures.push(RunFailure::Interrupted);
        }
        if let Some(pb) = &progress {
            pb.finish(if was_interrupted { "interrupted" } else { "done" });
        }
        tracing::info!(errors = failures.len(), interrupted = was_interrupted, "run finished");
        AggregateError::from_failures(failures)
    }
}

/// Hand values to workers in order. Returns how many were handed over.
///
/// Each send is a rendezvous, so this blocks while all workers are busy. The
/// `halt` channel disconnects once a stop is observed, which unblocks a
/// pending send even if no worker will ever receive again.
fn feed(values: Vec<String>, queue: &Sender<String>, halt: &Receiver<()>, interrupted: &InterruptFlag) -> usize {
    let total = values.len();
    for (dispatched, value) in values.into_iter().enumerate() {
        if interrupted.get() {
            tracing::info!(dispatched, remaining = total - dispatched, "interrupted; halting dispatch");
            return dispatched;
        }
        select! {
            send(queue, value) -> res => {
                if res.is_err() {
                    tracing::info!(dispatched, remaining = total - dispatched, "all workers exited; halting dispatch");
                    return dispatched;
                }
            }
            recv(halt) -> _ => {
                tracing::info!(dispatched, remaining = total - dispatched, "interrupted; halting dispatch");
                return dispatched;
            }
        }
    }
    total
}
