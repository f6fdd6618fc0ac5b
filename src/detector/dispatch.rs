//! Worker dispatch and completion collection for feature modules.
//!
//! Each job owns its configured module instance and a shared handle to the
//! patch. Jobs run on the detector's rayon pool and report over an mpsc
//! channel; the sender side closes once every job has finished, so the
//! collector observes disconnection when the batch is complete.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Instant;

use log::warn;

use crate::features::{FeatureKind, FeatureModule, FeatureResult};
use crate::raster::ElevationPatch;

use super::options::CancelToken;

/// One configured module instance ready to run.
pub(super) struct ModuleJob {
    pub kind: FeatureKind,
    pub module: Box<dyn FeatureModule>,
}

/// A finished module computation, successful or not.
pub(super) struct Completion {
    pub kind: FeatureKind,
    pub result: FeatureResult,
    pub elapsed_ms: f64,
}

/// Spawn every job onto the pool and hand back the completion channel.
///
/// Workers check the cancel token before computing; a cancelled job still
/// sends a completion (an invalid result) so the collector's bookkeeping
/// stays exact. A panicking module is caught and reported as invalid rather
/// than taking the process down.
pub(super) fn dispatch_modules(
    pool: &rayon::ThreadPool,
    jobs: Vec<ModuleJob>,
    patch: Arc<ElevationPatch>,
    cancel: CancelToken,
) -> mpsc::Receiver<Completion> {
    let (tx, rx) = mpsc::channel();
    for job in jobs {
        let tx = tx.clone();
        let patch = Arc::clone(&patch);
        let cancel = cancel.clone();
        pool.spawn(move || {
            let start = Instant::now();
            let result = if cancel.is_cancelled() {
                FeatureResult::invalid("cancelled before start")
            } else {
                compute_guarded(job.kind, job.module.as_ref(), &patch)
            };
            // Receiver may already be gone if the caller stopped early.
            let _ = tx.send(Completion {
                kind: job.kind,
                result,
                elapsed_ms: start.elapsed().as_secs_f64() * 1e3,
            });
        });
    }
    rx
}

/// Run one module under a panic guard. Shared by the worker closures and the
/// serial refinement recompute.
pub(super) fn compute_guarded(
    kind: FeatureKind,
    module: &dyn FeatureModule,
    patch: &ElevationPatch,
) -> FeatureResult {
    match catch_unwind(AssertUnwindSafe(|| module.compute(&patch.elevation))) {
        Ok(result) => result,
        Err(_) => {
            warn!("StructureDetector: module {kind} panicked");
            FeatureResult::invalid("module panicked")
        }
    }
}
