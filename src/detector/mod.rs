//! Detection orchestrator running feature modules against an elevation patch.
//!
//! Overview
//! - Validates the patch and builds one configured module instance per
//!   enabled feature from the registry.
//! - Dispatches module jobs onto a detector-owned rayon pool and collects
//!   completions over a channel, feeding a streaming aggregator as results
//!   arrive so an early decision can short-circuit the wait.
//! - Modules that panic, time out, or get cancelled report as invalid
//!   results; they reduce coverage instead of aborting the call.
//! - Optionally refines an ambiguous decision: one recentering round that
//!   re-crops the patch around the dominant peak, then reweighting rounds
//!   that scale feature weights by how decisive each module was.
//!
//! Modules
//! - [`options`] – per-call options and the cooperative [`CancelToken`].
//! - `dispatch` – job spawning and the completion channel.
//! - `pipeline` – the main [`StructureDetector`] implementation.
//! - `refine` – ambiguity-driven refinement rounds.

mod dispatch;
pub mod options;
mod pipeline;
mod refine;

use std::fmt;

pub use options::{CancelToken, DetectOptions};
pub use pipeline::{DetectionMetadata, DetectionResult, StructureDetector};

/// Errors that abort a detection call outright.
///
/// Module-level failures never surface here; they are folded into the
/// decision as invalid results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectError {
    /// The patch failed validation before any module ran.
    InvalidPatch(String),
    /// No feature module is enabled, so there is nothing to aggregate.
    NoEvidence,
    /// The worker pool could not be brought up.
    WorkerPool(String),
}

impl fmt::Display for DetectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetectError::InvalidPatch(reason) => write!(f, "invalid patch: {reason}"),
            DetectError::NoEvidence => write!(f, "no enabled feature modules"),
            DetectError::WorkerPool(reason) => write!(f, "worker pool: {reason}"),
        }
    }
}

impl std::error::Error for DetectError {}
