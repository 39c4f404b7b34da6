//! # Scaffold-Graph Edge Model and Gap-Size Estimation
//!
//! This library implements the edge model at the heart of a shotgun
//! assembler's scaffolder: a mutable graph of contigs connected by mate
//! evidence, and the maximum-likelihood machinery that turns that evidence
//! into gap sizes.
//!
//! ## Pipeline
//!
//! 1. **Edge merging**: collapse duplicate mate observations between a
//!    contig pair into one statistically combined edge
//! 2. **Status classification**: compare each internal edge against the
//!    current contig placement and mark it trusted or untrusted
//! 3. **Gap solving**: treat trusted clones as Gaussian constraints over
//!    the gaps and solve the banded normal equations by Cholesky
//! 4. **Mutation**: collapse containments, fix contradicted orderings, and
//!    split scaffolds the evidence no longer holds together
//!
//! ## Usage Example
//!
//! ```ignore
//! use scafgraph::{refine_scaffold, NoOverlaps, ScaffoldConfig, ScaffoldGraph};
//!
//! let config = ScaffoldConfig::default();
//! let outcome = refine_scaffold(&mut graph, scaffold, &config, &NoOverlaps)?;
//! println!("solved in {} attempts", outcome.attempts);
//! ```

#![warn(missing_docs, missing_debug_implementations)]
#![allow(clippy::new_without_default)]

pub mod classify;
pub mod graph;
pub mod merge;
pub mod mutate;
pub mod oracle;
pub mod report;
pub mod solver;

// Re-exports for convenience
pub use graph::{
    Edge, EdgeId, EdgeIterator, EdgeKind, EdgeOrient, EdgeStatus, EndSelector, LengthStat, Node,
    NodeDirection, NodeId, NodeKind, ScaffoldGraph, SequenceEnd, StatusMask,
};
pub use oracle::{NoOverlaps, OverlapOracle};
pub use solver::{recompute_offsets_in_scaffold, RecomputeResult};

use graph::GraphError;
use tracing::warn;

/// Tuning parameters shared across merging, classification, and solving.
#[derive(Debug, Clone)]
pub struct ScaffoldConfig {
    /// Acceptance threshold for the edge-vs-placement chi-squared test.
    /// The default is the 95th percentile of chi-squared with one degree
    /// of freedom.
    pub chi_squared_threshold: f64,

    /// Edges with distance variance above this are marked `LargeVariance`
    /// rather than trusted.
    pub max_variance: f64,

    /// Raw edges with variance above this are treated as sloppy guides and
    /// excluded from merging unless guides are requested.
    pub sloppy_variance_threshold: f64,

    /// Most negative gap the layout accepts without oracle confirmation.
    /// A solved gap with `mean - 3*sigma` below this triggers the
    /// hard-constraint path.
    pub minimum_gap: f64,

    /// Extra bases of tolerance when deciding whether a deep overlap is a
    /// full containment of the shorter contig.
    pub containment_slack: f64,

    /// Expected per-base error rate of oracle-confirmed overlaps; sets the
    /// variance of pinned gaps.
    pub overlap_error_rate: f64,

    /// Variance multiplier applied when a gap is clamped to `minimum_gap`
    /// without oracle support.
    pub clamp_variance_inflation: f64,

    /// Contigs whose trusted internal edge weight falls below this are
    /// evicted into singleton scaffolds by [`mutate::split_low_weight`].
    pub min_split_weight: usize,

    /// Cap on mark/solve/mutate iterations per scaffold in
    /// [`refine_scaffold`].
    pub max_solve_attempts: usize,
}

impl Default for ScaffoldConfig {
    fn default() -> Self {
        Self {
            chi_squared_threshold: 3.84,
            max_variance: 4.0e6,
            sloppy_variance_threshold: 4.0e6,
            minimum_gap: -20.0,
            containment_slack: 10.0,
            overlap_error_rate: 0.06,
            clamp_variance_inflation: 2.0,
            min_split_weight: 2,
            max_solve_attempts: 100,
        }
    }
}

/// What [`refine_scaffold`] did to reach its final state.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    /// Mark/solve iterations performed.
    pub attempts: usize,
    /// Result of the final solve.
    pub result: RecomputeResult,
    /// Scaffolds created by connectivity splits along the way.
    pub split_scaffolds: Vec<NodeId>,
}

/// Drive one scaffold to a settled layout: classify its internal edges,
/// solve its gaps, and apply whichever mutation the solver asks for,
/// repeating until the solve succeeds or `config.max_solve_attempts` is
/// exhausted.
///
/// Containment merges and order fixes restart the loop because they change
/// the chain the solver runs over. An under-determined or singular system
/// is first attacked by splitting disconnected components; if the scaffold
/// is already connected, its offsets are left as they stand and the
/// scaffold node is flagged unresolved.
pub fn refine_scaffold(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    config: &ScaffoldConfig,
    oracle: &dyn OverlapOracle,
) -> Result<RefineOutcome, GraphError> {
    let mut split_scaffolds = Vec::new();
    let mut attempts = 0;
    let mut last = RecomputeResult::NoGaps;

    while attempts < config.max_solve_attempts {
        attempts += 1;
        classify::mark_internal_edge_status(graph, scaffold_id, config, false, StatusMask::ALL)?;
        last = recompute_offsets_in_scaffold(graph, scaffold_id, config, oracle, true)?;
        match last {
            RecomputeResult::Ok { .. } | RecomputeResult::NoGaps => {
                graph.node_mut(scaffold_id)?.flags.unresolved = false;
                return Ok(RefineOutcome {
                    attempts,
                    result: last,
                    split_scaffolds,
                });
            }
            RecomputeResult::ContiggedContainments { .. } => {
                // Chain shrank by one contig; statuses must be re-derived.
                continue;
            }
            RecomputeResult::FailedReorderNeeded { lower, higher } => {
                mutate::fix_order(graph, scaffold_id, lower, higher)?;
                continue;
            }
            RecomputeResult::NotEnoughClones | RecomputeResult::Singular => {
                let (components, fresh) =
                    mutate::check_connectivity_and_split(graph, scaffold_id)?;
                if components > 1 {
                    split_scaffolds.extend(fresh);
                    continue;
                }
                warn!(?scaffold_id, result = ?last, "scaffold left unresolved");
                graph.node_mut(scaffold_id)?.flags.unresolved = true;
                return Ok(RefineOutcome {
                    attempts,
                    result: last,
                    split_scaffolds,
                });
            }
        }
    }

    warn!(
        ?scaffold_id,
        attempts, "solve attempt budget exhausted; scaffold left unresolved"
    );
    graph.node_mut(scaffold_id)?.flags.unresolved = true;
    Ok(RefineOutcome {
        attempts,
        result: last,
        split_scaffolds,
    })
}
