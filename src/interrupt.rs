//! Run-scoped interrupt flag shared by the watcher and every worker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Write-once boolean: `set()` is idempotent, `get()` is cheap enough to call
/// before every item. Clones share the same underlying flag.
#[derive(Clone, Debug, Default)]
pub struct InterruptFlag {
    flag: Arc<AtomicBool>,
}

impl InterruptFlag {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn get(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
