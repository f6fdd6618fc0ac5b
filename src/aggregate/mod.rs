//! Evidence aggregation: pure, synchronous, order-independent.
//!
//! The split mirrors the call sites: [`batch`] is the single decision pass
//! the orchestrator runs once all modules have reported, [`streaming`] is
//! the incremental view that powers progress callbacks and early decisions,
//! and [`evidence`] holds the one polarity-resolution rule both share.

pub mod batch;
pub mod evidence;
pub mod streaming;

pub use batch::{
    aggregate, expected_evidence_count, is_ambiguous, refinement_candidates, AggregationResult,
};
pub use evidence::{resolve, EvidenceSign, ResolvedEvidence};
pub use streaming::{StreamingAggregationResult, StreamingAggregator};

use std::fmt;

/// Hard aggregation failure.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AggregationError {
    /// Aggregation was asked to decide over an empty result map.
    NoEvidence,
}

impl fmt::Display for AggregationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggregationError::NoEvidence => write!(f, "no feature results to aggregate"),
        }
    }
}

impl std::error::Error for AggregationError {}
