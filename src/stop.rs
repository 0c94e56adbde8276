//! Single-shot stop notification, plus the OS signal wiring used by the binary.
//!
//! `StopTrigger::fire()` flips a shared flag and then disconnects the channel,
//! so every `StopSignal` clone wakes up at once. Dropping all triggers without
//! firing also disconnects the channel, but the flag stays unset and watchers
//! treat that as "no stop will ever arrive".

use anyhow::{Context, Result};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub fn stop_signal() -> (StopTrigger, StopSignal) {
    let (tx, rx) = bounded::<()>(0);
    let fired = Arc::new(AtomicBool::new(false));
    let trigger = StopTrigger {
        inner: Arc::new(TriggerInner { fired: Arc::clone(&fired), tx: Mutex::new(Some(tx)) }),
    };
    (trigger, StopSignal { fired, rx })
}

#[derive(Clone)]
pub struct StopTrigger {
    inner: Arc<TriggerInner>,
}

struct TriggerInner {
    fired: Arc<AtomicBool>,
    tx: Mutex<Option<Sender<()>>>,
}

impl StopTrigger {
    /// Idempotent; safe to call from a signal-handler thread.
    pub fn fire(&self) {
        self.inner.fired.store(true, Ordering::Release);
        // flag must be visible before receivers observe the disconnect
        drop(self.inner.tx.lock().take());
    }

    pub fn is_fired(&self) -> bool {
        self.inner.fired.load(Ordering::Acquire)
    }
}

#[derive(Clone)]
pub struct StopSignal {
    fired: Arc<AtomicBool>,
    rx: Receiver<()>,
}

impl StopSignal {
    /// A signal that can never fire.
    pub fn never() -> Self {
        let (_trigger, signal) = stop_signal();
        signal
    }

    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }

    /// Block until either the stop fires (returns true) or `done` becomes
    /// ready (returns false).
    pub(crate) fn wait_or_done(&self, done: &Receiver<()>) -> bool {
        if self.is_fired() {
            return true;
        }
        select! {
            recv(self.rx) -> _ => {
                if self.is_fired() {
                    return true;
                }
                // every trigger was dropped unfired; only `done` is left to wait on
                let _ = done.recv();
                false
            }
            recv(done) -> _ => false,
        }
    }
}

/// Fire `trigger` on SIGINT/SIGTERM (Ctrl-C on Windows).
///
/// The handler is process-wide and can only be installed once.
pub fn install_os_handler(trigger: StopTrigger) -> Result<()> {
    ctrlc::set_handler(move || {
        if !trigger.is_fired() {
            tracing::warn!("shutting down");
        }
        trigger.fire();
    })
    .context("installing SIGINT/SIGTERM handler")
}
