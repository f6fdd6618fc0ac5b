//! Per-call runtime options and cooperative cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Shared flag for cancelling a detection call from outside.
///
/// Cancellation is cooperative: workers check the flag before starting their
/// computation and the collector checks it between arrivals. Clones share the
/// same underlying flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Irreversible for this token and its clones.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Runtime knobs for one detection call.
#[derive(Clone, Debug)]
pub struct DetectOptions {
    /// Shared deadline for the whole collection phase. Modules still missing
    /// when it expires report as invalid instead of blocking the decision.
    pub module_timeout: Duration,
    /// Stop collecting once the early-decision gate opens; outstanding
    /// modules are cancelled and report as invalid.
    pub stop_on_early_decision: bool,
    /// Caller-held cancellation handle checked between module completions.
    pub cancel: CancelToken,
}

impl Default for DetectOptions {
    fn default() -> Self {
        Self {
            module_timeout: Duration::from_secs(30),
            stop_on_early_decision: false,
            cancel: CancelToken::new(),
        }
    }
}

impl DetectOptions {
    /// Options with a tighter collection deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            module_timeout: timeout,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_cancel_flag() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }
}
