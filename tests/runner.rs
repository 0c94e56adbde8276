#[path = "common/mod.rs"]
mod common;

use anyhow::anyhow;
use common::owned;
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::sleep;
use std::time::Duration;
use valrun::{stop_signal, ConfigError, ProgressScope, RunFailure, Runner, StopSignal};

/// Every action call succeeds, so the run reports no error at all and the
/// action sees each non-blank value exactly once.
#[test]
fn all_successes_return_ok_and_call_once_per_value() {
    let calls = AtomicUsize::new(0);
    let runner = Runner::new(3, |_v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    let values: Vec<String> = (0..25).map(|i| format!("value-{i}")).collect();
    runner.run(values, &StopSignal::never()).unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 25);
}

/// Mixed input: blank entries are skipped, "a" succeeds and "b" fails with
/// "boom". Outcome: exactly one entry (value "b", cause "boom") and two calls.
#[test]
fn blank_values_are_skipped_and_failure_is_wrapped_with_its_value() {
    let calls = AtomicUsize::new(0);
    let runner = Runner::new(2, |v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        if v == "b" {
            Err(anyhow!("boom"))
        } else {
            Ok(())
        }
    })
    .unwrap();

    let err = runner.run(["a", "", "  ", "b"], &StopSignal::never()).unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(err.len(), 1);
    assert!(!err.is_interrupted());
    let only = err.value_errors().next().unwrap();
    assert_eq!(only.value(), "b");
    assert_eq!(only.cause().to_string(), "boom");
}

/// Blank and whitespace-only values never reach the action.
#[test]
fn whitespace_only_values_never_reach_the_action() {
    let seen = Mutex::new(Vec::<String>::new());
    let runner = Runner::new(4, |v: &str| -> anyhow::Result<()> {
        seen.lock().push(v.to_string());
        Ok(())
    })
    .unwrap();

    runner
        .run(["", " ", "\t", "x", "\n", " y ", ""], &StopSignal::never())
        .unwrap();

    let mut seen = seen.into_inner();
    seen.sort();
    assert_eq!(seen, vec![" y ".to_string(), "x".to_string()]);
}

/// k failing values produce exactly k entries; each one carries the original
/// value and cause, whatever order the workers reported them in.
#[test]
fn k_failures_yield_k_entries_with_value_and_cause() {
    let runner = Runner::new(4, |v: &str| -> anyhow::Result<()> {
        let n: u32 = v.parse()?;
        if n % 3 == 0 {
            Err(anyhow!("divisible: {n}"))
        } else {
            Ok(())
        }
    })
    .unwrap();

    let values: Vec<String> = (1..=30).map(|i| i.to_string()).collect();
    let err = runner.run(values, &StopSignal::never()).unwrap_err();

    assert_eq!(err.len(), 10);
    let got: BTreeSet<(String, String)> = err
        .value_errors()
        .map(|e| (e.value().to_string(), e.cause().to_string()))
        .collect();
    let want: BTreeSet<(String, String)> = (1..=30u32)
        .filter(|n| n % 3 == 0)
        .map(|n| (n.to_string(), format!("divisible: {n}")))
        .collect();
    assert_eq!(got, want);
}

/// No value is processed twice and none is lost when many workers race.
#[test]
fn each_value_is_processed_exactly_once() {
    let seen = Mutex::new(Vec::<String>::new());
    let runner = Runner::new(8, |v: &str| -> anyhow::Result<()> {
        seen.lock().push(v.to_string());
        Ok(())
    })
    .unwrap();

    let values: Vec<String> = (0..500).map(|i| format!("{i:04}")).collect();
    runner.run(values.clone(), &StopSignal::never()).unwrap();

    let mut seen = seen.into_inner();
    seen.sort();
    assert_eq!(seen, values);
}

/// Backpressure: with slow actions, the number of calls in flight never
/// exceeds the worker count.
#[test]
fn in_flight_calls_never_exceed_worker_count() {
    for workers in [1usize, 2, 5] {
        let in_flight = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let runner = Runner::new(workers, |_v: &str| -> anyhow::Result<()> {
            let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            max_seen.fetch_max(now, Ordering::SeqCst);
            sleep(Duration::from_millis(5));
            in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
        .unwrap();

        let values: Vec<String> = (0..20).map(|i| i.to_string()).collect();
        runner.run(values, &StopSignal::never()).unwrap();

        let max = max_seen.load(Ordering::SeqCst);
        assert!(max >= 1 && max <= workers, "workers={workers} max in flight={max}");
        assert_eq!(in_flight.load(Ordering::SeqCst), 0, "run returned with work still in flight");
    }
}

/// Failures do not stop the pool: every value is still attempted.
#[test]
fn failures_are_not_fatal_to_the_pool() {
    let calls = AtomicUsize::new(0);
    let runner = Runner::new(1, |_v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("always"))
    })
    .unwrap();

    let err = runner.run(owned(&["a", "b", "c", "d"]), &StopSignal::never()).unwrap_err();

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(err.len(), 4);
    assert!(err.failures().iter().all(|f| matches!(f, RunFailure::Value(_))));
}

/// An empty (or all-blank) input is a successful run with no calls.
#[test]
fn empty_input_is_ok() {
    let calls = AtomicUsize::new(0);
    let runner = Runner::new(3, |_v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap();

    runner.run(Vec::<String>::new(), &StopSignal::never()).unwrap();
    runner.run(["", "   "], &StopSignal::never()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

/// Zero workers is rejected before any run can start.
#[test]
fn zero_workers_is_a_configuration_error() {
    let res = Runner::new(0, |_v: &str| -> anyhow::Result<()> { Ok(()) });
    assert_eq!(res.err(), Some(ConfigError::ZeroWorkers));
}

/// The aggregate renders a numbered report, one line per failure.
#[test]
fn aggregate_display_numbers_each_failure() {
    let runner = Runner::new(1, |v: &str| -> anyhow::Result<()> {
        if v == "b" {
            Err(anyhow!("boom"))
        } else {
            Ok(())
        }
    })
    .unwrap();

    let err = runner.run(["a", "b"], &StopSignal::never()).unwrap_err();

    assert_eq!(err.to_string(), "failed to run (1 errors):\n[error   1]: [value \"b\"]: boom");
}

/// A runner can be used for several runs; state from one run (failures,
/// threads) never leaks into the next.
#[test]
fn runs_are_independent() {
    let runner = Runner::new(2, |v: &str| -> anyhow::Result<()> {
        if v == "bad" {
            Err(anyhow!("bad value"))
        } else {
            Ok(())
        }
    })
    .unwrap();

    let first = runner.run(["ok", "bad"], &StopSignal::never()).unwrap_err();
    assert_eq!(first.len(), 1);

    runner.run(["ok", "fine"], &StopSignal::never()).unwrap();
}

/// With progress on, the bar ticks once per processed value (failures
/// included), ignores blank values in its total, and finishes with "done".
#[test]
fn progress_counts_every_report_and_finishes_done() {
    let bar = ProgressScope::count("values", 0);
    let runner = Runner::new(3, |v: &str| -> anyhow::Result<()> {
        if v == "bad" {
            Err(anyhow!("bad value"))
        } else {
            Ok(())
        }
    })
    .unwrap()
    .progress_scope(bar.clone());

    let err = runner.run(["a", "", "bad", "b", "  ", "c"], &StopSignal::never()).unwrap_err();

    assert_eq!(err.len(), 1);
    assert_eq!(bar.length(), Some(4));
    assert_eq!(bar.position(), 4);
    assert!(bar.is_finished());
    assert_eq!(bar.message(), "done");
}

/// An interrupted run finishes its bar with "interrupted", having counted only
/// the values that were actually processed.
#[test]
fn progress_finishes_interrupted_when_stopped() {
    let calls = AtomicUsize::new(0);
    let bar = ProgressScope::count("values", 0);
    let runner = Runner::new(1, |_v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap()
    .progress_scope(bar.clone());

    let (trigger, stop) = stop_signal();
    trigger.fire();
    let err = runner.run(["x", "y", "z"], &stop).unwrap_err();

    assert!(err.is_interrupted());
    assert_eq!(bar.length(), Some(3));
    assert_eq!(bar.position(), calls.load(Ordering::SeqCst) as u64);
    assert!(bar.is_finished());
    assert_eq!(bar.message(), "interrupted");
}

/// The runner's own bar (`progress(true)` without a caller-owned scope) does
/// not change the outcome of a run.
#[test]
fn builtin_progress_bar_run_succeeds() {
    let calls = AtomicUsize::new(0);
    let runner = Runner::new(2, |_v: &str| -> anyhow::Result<()> {
        calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    })
    .unwrap()
    .progress(true)
    .progress_label("builtin");

    runner.run(["a", "b", "c"], &StopSignal::never()).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

/// A caller-owned bar is reset for each run.
#[test]
fn progress_scope_restarts_between_runs() {
    let bar = ProgressScope::count("values", 0);
    let runner = Runner::new(2, |_v: &str| -> anyhow::Result<()> { Ok(()) })
        .unwrap()
        .progress_scope(bar.clone());

    runner.run(["a", "b", "c", "d"], &StopSignal::never()).unwrap();
    assert_eq!(bar.position(), 4);

    runner.run(["e", "f"], &StopSignal::never()).unwrap();
    assert_eq!(bar.length(), Some(2));
    assert_eq!(bar.position(), 2);
    assert_eq!(bar.message(), "done");
}
