//! Gap recomputation for one scaffold
//!
//! Each trusted raw mate edge between scaffold contigs is one clone
//! observation over the contiguous run of gaps it spans. The observations
//! form a linear Gaussian system over the gap sizes; its normal equations
//! are symmetric positive definite exactly when the clone graph connects
//! every gap. Hard constraints (a gap implying an implausible overlap) are
//! enforced by pinning the offending gap and re-solving the reduced system.
//!
//! All traversal and accumulation runs in chain/contig-index order so the
//! solve is deterministic for identical inputs.

use tracing::debug;

use super::banded::BandedMatrix;
use crate::classify::implied_orientation;
use crate::graph::{
    EdgeIterator, EndSelector, GraphError, LengthStat, NodeDirection, NodeId, ScaffoldGraph,
    StatusMask,
};
use crate::mutate;
use crate::oracle::{OverlapOracle, OverlapSpec};
use crate::ScaffoldConfig;

/// Outcome of a gap recomputation. Not an error type: every variant is a
/// defined result the caller dispatches on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RecomputeResult {
    /// Gaps solved and offsets applied.
    Ok {
        /// Residual chi-squared of the fit.
        least_square_error: f64,
        /// Clone observations used.
        num_clones: usize,
    },
    /// Scaffold has at most one contig; nothing to solve, nothing mutated.
    NoGaps,
    /// Fewer clone observations than gaps; system under-determined.
    NotEnoughClones,
    /// Normal equations not positive definite: the clone graph does not
    /// connect every gap.
    Singular,
    /// Overlap evidence contradicts the stored order of two adjacent
    /// contigs; caller must reorder and retry.
    FailedReorderNeeded {
        /// Chain-earlier contig of the contradicted pair.
        lower: NodeId,
        /// Chain-later contig.
        higher: NodeId,
    },
    /// Two adjacent contigs were found to be a containment and have been
    /// merged; caller must restart the scaffold's computation.
    ContiggedContainments {
        /// The replacement contig.
        merged: NodeId,
    },
}

/// One clone observation: the summed size of gaps `first_gap..=last_gap`
/// was measured as `mean` with variance `variance`.
#[derive(Debug, Clone, Copy)]
struct CloneConstraint {
    first_gap: usize,
    last_gap: usize,
    mean: f64,
    variance: f64,
}

/// Per-iteration decision of the hard-constraint loop.
enum ConstraintStep {
    /// No violation found; the current solution stands.
    Accept,
    /// Pin one gap to a fixed estimate and re-solve.
    Pin { gap: usize, value: LengthStat },
    /// Terminal: restructuring required.
    Terminal(RecomputeResult),
}

/// Compute maximum-likelihood gap sizes for `scaffold_id` and apply them to
/// the contig offsets. See [`RecomputeResult`] for the possible outcomes.
pub fn recompute_offsets_in_scaffold(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    config: &ScaffoldConfig,
    oracle: &dyn OverlapOracle,
    force_non_overlaps: bool,
) -> Result<RecomputeResult, GraphError> {
    let contigs = graph.reindex_scaffold(scaffold_id)?;
    if contigs.len() <= 1 {
        return Ok(RecomputeResult::NoGaps);
    }
    let num_gaps = contigs.len() - 1;

    let clones = gather_clones(graph, &contigs)?;
    if clones.len() < num_gaps {
        debug!(
            ?scaffold_id,
            clones = clones.len(),
            gaps = num_gaps,
            "not enough clones to constrain gaps"
        );
        return Ok(RecomputeResult::NotEnoughClones);
    }

    let mut fixed: Vec<Option<LengthStat>> = vec![None; num_gaps];
    loop {
        let gaps = match solve_free_gaps(&clones, &fixed, num_gaps) {
            Some(gaps) => gaps,
            None => return Ok(RecomputeResult::Singular),
        };

        let step = if force_non_overlaps {
            examine_gaps(graph, config, oracle, &contigs, &gaps, &fixed)?
        } else {
            ConstraintStep::Accept
        };

        match step {
            ConstraintStep::Accept => {
                let error = residual_error(&clones, &gaps);
                apply_offsets(graph, scaffold_id, &contigs, &gaps)?;
                let stats = &mut graph.node_mut(scaffold_id)?.stats;
                stats.least_square_error = error;
                stats.num_least_square_clones = clones.len();
                return Ok(RecomputeResult::Ok {
                    least_square_error: error,
                    num_clones: clones.len(),
                });
            }
            ConstraintStep::Pin { gap, value } => {
                fixed[gap] = Some(value);
            }
            ConstraintStep::Terminal(result) => return Ok(result),
        }
    }
}

/// Walk trusted internal edges, descending to raw evidence, and turn each
/// raw edge into a clone constraint. Visits each pair from its lower-index
/// endpoint only.
fn gather_clones(
    graph: &ScaffoldGraph,
    contigs: &[NodeId],
) -> Result<Vec<CloneConstraint>, GraphError> {
    let mut clones = Vec::new();
    for (i, &contig) in contigs.iter().enumerate() {
        let raw_ids =
            EdgeIterator::new(graph, contig, EndSelector::All, StatusMask::TRUSTED).collect_raw();
        for raw_id in raw_ids {
            let raw = graph.edge(raw_id)?;
            let other = raw.other_end(contig).ok_or(GraphError::NotAnEndpoint {
                node: contig,
                edge: raw_id,
            })?;
            let j = graph.node(other)?.index_in_scaffold;
            if j <= i {
                continue;
            }
            // Subtract the contigs strictly between the pair; their length
            // uncertainty feeds the clone's variance.
            let mut mean = raw.distance.mean;
            let mut variance = raw
                .distance
                .clamped(crate::graph::MIN_COMBINE_VARIANCE, "clone variance")
                .variance;
            for &between in &contigs[i + 1..j] {
                let len = graph.node(between)?.bp_length;
                mean -= len.mean;
                variance += len.variance;
            }
            clones.push(CloneConstraint {
                first_gap: i,
                last_gap: j - 1,
                mean,
                variance,
            });
        }
    }
    Ok(clones)
}

/// Solve the normal equations over the free gaps, substituting the fixed
/// ones into the right-hand side. Returns the full gap vector (fixed gaps
/// included) or `None` when the system is singular.
fn solve_free_gaps(
    clones: &[CloneConstraint],
    fixed: &[Option<LengthStat>],
    num_gaps: usize,
) -> Option<Vec<LengthStat>> {
    // Column numbering over free gaps, ascending.
    let mut col_of: Vec<Option<usize>> = vec![None; num_gaps];
    let mut free_gaps = Vec::new();
    for (gap, slot) in fixed.iter().enumerate() {
        if slot.is_none() {
            col_of[gap] = Some(free_gaps.len());
            free_gaps.push(gap);
        }
    }

    if free_gaps.is_empty() {
        // Every gap pinned: nothing left to solve.
        return Some(fixed.iter().map(|slot| slot.unwrap_or(LengthStat::zero())).collect());
    }

    let mut bandwidth = 0usize;
    for clone in clones {
        let cols: Vec<usize> = (clone.first_gap..=clone.last_gap)
            .filter_map(|g| col_of[g])
            .collect();
        if let (Some(&first), Some(&last)) = (cols.first(), cols.last()) {
            bandwidth = bandwidth.max(last - first);
        }
    }

    let n = free_gaps.len();
    let mut matrix = BandedMatrix::zeros(n, bandwidth);
    let mut rhs = vec![0.0; n];
    for clone in clones {
        let weight = 1.0 / clone.variance;
        let mut adjusted = clone.mean;
        for gap in clone.first_gap..=clone.last_gap {
            if let Some(value) = fixed[gap] {
                adjusted -= value.mean;
            }
        }
        let cols: Vec<usize> = (clone.first_gap..=clone.last_gap)
            .filter_map(|g| col_of[g])
            .collect();
        for &row in &cols {
            rhs[row] += adjusted * weight;
            for &col in &cols {
                if col <= row {
                    matrix.add(row, col, weight);
                }
            }
        }
    }

    matrix.cholesky_in_place().ok()?;
    let solution = matrix.solve_factored(&rhs);

    let mut gaps: Vec<LengthStat> = fixed
        .iter()
        .map(|slot| slot.unwrap_or(LengthStat::zero()))
        .collect();
    for (col, &gap) in free_gaps.iter().enumerate() {
        gaps[gap] = LengthStat::new(solution[col], matrix.inverse_diagonal(col));
    }
    Some(gaps)
}

/// Residual chi-squared of the fit over every clone.
fn residual_error(clones: &[CloneConstraint], gaps: &[LengthStat]) -> f64 {
    let mut error = 0.0;
    for clone in clones {
        let mut fitted = 0.0;
        for gap in clone.first_gap..=clone.last_gap {
            fitted += gaps[gap].mean;
        }
        let diff = clone.mean - fitted;
        error += diff * diff / clone.variance;
    }
    error
}

/// Look for the leftmost free gap violating the minimum-gap constraint and
/// decide how to handle it.
fn examine_gaps(
    graph: &mut ScaffoldGraph,
    config: &ScaffoldConfig,
    oracle: &dyn OverlapOracle,
    contigs: &[NodeId],
    gaps: &[LengthStat],
    fixed: &[Option<LengthStat>],
) -> Result<ConstraintStep, GraphError> {
    for (gap, estimate) in gaps.iter().enumerate() {
        if fixed[gap].is_some() {
            continue;
        }
        if estimate.mean - 3.0 * estimate.stddev() >= config.minimum_gap {
            continue;
        }
        let lower = contigs[gap];
        let higher = contigs[gap + 1];
        let overlap_candidate = -estimate.mean;
        let shorter = graph
            .node(lower)?
            .bp_length
            .mean
            .min(graph.node(higher)?.bp_length.mean);

        // Overlap longer than the shorter contig: one contains the other.
        if overlap_candidate + config.containment_slack >= shorter {
            let scaffold_id = graph
                .node(lower)?
                .scaffold_id
                .ok_or(GraphError::StaleNode(lower))?;
            let merged = mutate::collapse_contained_pair(graph, scaffold_id, lower, higher)?;
            return Ok(ConstraintStep::Terminal(
                RecomputeResult::ContiggedContainments { merged },
            ));
        }

        if contradictory_overlap(graph, lower, higher)? {
            return Ok(ConstraintStep::Terminal(
                RecomputeResult::FailedReorderNeeded { lower, higher },
            ));
        }

        let spec = OverlapSpec {
            id_a: lower,
            id_b: higher,
            orient: implied_orientation(graph, lower, higher)?,
            min_length: (overlap_candidate - 3.0 * estimate.stddev()).max(1.0),
            max_length: overlap_candidate + 3.0 * estimate.stddev(),
            error_rate: config.overlap_error_rate,
        };
        let value = match oracle.try_overlap(&spec) {
            Some(found) if found.is_a_contains_b || found.is_b_contains_a => {
                let scaffold_id = graph
                    .node(lower)?
                    .scaffold_id
                    .ok_or(GraphError::StaleNode(lower))?;
                let merged = mutate::collapse_contained_pair(graph, scaffold_id, lower, higher)?;
                return Ok(ConstraintStep::Terminal(
                    RecomputeResult::ContiggedContainments { merged },
                ));
            }
            Some(found) => {
                // Confirmed overlap: pin the gap to the aligned length.
                let sigma = (found.length * config.overlap_error_rate).max(1.0);
                LengthStat::new(-found.length, sigma * sigma)
            }
            None => {
                // No sequence support: clamp to the boundary with inflated
                // uncertainty.
                debug!(gap, mean = estimate.mean, "gap clamped to minimum");
                LengthStat::new(
                    config.minimum_gap,
                    estimate.variance.max(crate::graph::MIN_COMBINE_VARIANCE)
                        * config.clamp_variance_inflation,
                )
            }
        };
        return Ok(ConstraintStep::Pin { gap, value });
    }
    Ok(ConstraintStep::Accept)
}

/// Does an overlap edge between the pair disagree with the placement's
/// implied orientation?
fn contradictory_overlap(
    graph: &ScaffoldGraph,
    lower: NodeId,
    higher: NodeId,
) -> Result<bool, GraphError> {
    let implied = implied_orientation(graph, lower, higher)?;
    for &edge_id in &graph.node(lower)?.edges {
        let edge = graph.edge(edge_id)?;
        if edge.other_end(lower) != Some(higher) || !edge.is_overlap_edge() {
            continue;
        }
        let wrt = edge.orientation_wrt(lower).ok_or(GraphError::NotAnEndpoint {
            node: lower,
            edge: edge_id,
        })?;
        if wrt != implied {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Propagate solved gaps into contig end offsets, left to right, variances
/// accumulating through contig lengths and gaps.
fn apply_offsets(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    contigs: &[NodeId],
    gaps: &[LengthStat],
) -> Result<(), GraphError> {
    let mut position = LengthStat::zero();
    for (i, &contig) in contigs.iter().enumerate() {
        let length = graph.node(contig)?.bp_length;
        let left = position;
        let right = left.plus(&length);
        let node = graph.node_mut(contig)?;
        match node.placed_direction() {
            NodeDirection::Forward => {
                node.offset_a_end = left;
                node.offset_b_end = right;
            }
            NodeDirection::Reversed => {
                node.offset_b_end = left;
                node.offset_a_end = right;
            }
        }
        position = right;
        if i < gaps.len() {
            position = position.plus(&gaps[i]);
            // A clamped gap may still be negative; positions only ever gain
            // variance.
        }
    }
    graph.node_mut(scaffold_id)?.bp_length =
        LengthStat::new(position.mean.max(0.0), position.variance);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::mark_internal_edge_status;
    use crate::graph::{EdgeOrient, NodeKind, Placement};
    use crate::oracle::NoOverlaps;

    /// Forward contigs laid out with the given lengths and rough gaps.
    fn scaffold(
        graph: &mut ScaffoldGraph,
        lengths: &[f64],
        rough_gap: f64,
    ) -> (NodeId, Vec<NodeId>) {
        let contigs: Vec<NodeId> = lengths
            .iter()
            .map(|&len| graph.add_node(NodeKind::Contig, LengthStat::new(len, 0.0)))
            .collect();
        let mut placements = Vec::new();
        let mut at = 0.0;
        let mut variance = 0.0;
        for (&contig, &len) in contigs.iter().zip(lengths) {
            placements.push(Placement {
                contig,
                a_end: LengthStat::new(at, variance),
                b_end: LengthStat::new(at + len, variance),
            });
            at += len + rough_gap;
            variance += 500.0;
        }
        let id = graph.build_scaffold(&placements).unwrap();
        (id, contigs)
    }

    fn trusted_edge(
        graph: &mut ScaffoldGraph,
        a: NodeId,
        b: NodeId,
        mean: f64,
        variance: f64,
    ) {
        let edge = graph
            .add_raw_edge(a, b, EdgeOrient::AbAb, LengthStat::new(mean, variance), None)
            .unwrap();
        graph.edge_mut(edge).unwrap().status = crate::graph::EdgeStatus::Trusted;
    }

    #[test]
    fn single_contig_scaffold_is_no_gaps() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0], 0.0);
        let before = graph.node(contigs[0]).unwrap().offset_b_end;
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        assert_eq!(result, RecomputeResult::NoGaps);
        assert_eq!(graph.node(contigs[0]).unwrap().offset_b_end, before);
    }

    #[test]
    fn two_single_gap_clones_reproduce_their_means() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0, 1500.0], 400.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], 500.0, 2500.0);
        trusted_edge(&mut graph, contigs[1], contigs[2], 300.0, 900.0);

        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        match result {
            RecomputeResult::Ok {
                least_square_error,
                num_clones,
            } => {
                assert!(least_square_error < 1e-9);
                assert_eq!(num_clones, 2);
            }
            other => panic!("unexpected result {other:?}"),
        }
        let a = graph.node(contigs[0]).unwrap();
        let b = graph.node(contigs[1]).unwrap();
        let c = graph.node(contigs[2]).unwrap();
        assert!((a.offset_a_end.mean - 0.0).abs() < 1e-9);
        assert!((a.offset_b_end.mean - 1000.0).abs() < 1e-9);
        assert!((b.offset_a_end.mean - 1500.0).abs() < 1e-9);
        assert!((b.offset_b_end.mean - 3500.0).abs() < 1e-9);
        assert!((c.offset_a_end.mean - 3800.0).abs() < 1e-9);
        assert!((c.offset_b_end.mean - 5300.0).abs() < 1e-9);
        // Variance accumulates left to right.
        assert!(b.offset_a_end.variance > a.offset_b_end.variance);
        assert!(c.offset_a_end.variance > b.offset_b_end.variance);
    }

    #[test]
    fn scaffold_span_carries_accumulated_variance() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0], 400.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], 450.0, 2500.0);
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        assert!(matches!(result, RecomputeResult::Ok { .. }));
        let span = graph.node(id).unwrap().bp_length;
        assert!((span.mean - 3450.0).abs() < 1e-9);
        // One clone constrains the one gap; its variance reaches the span.
        assert!((span.variance - 2500.0).abs() < 1e-9);
    }

    #[test]
    fn spanning_clone_ties_both_gaps() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0, 1500.0], 400.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], 500.0, 2500.0);
        trusted_edge(&mut graph, contigs[1], contigs[2], 300.0, 900.0);
        // Spans both gaps plus the middle contig: 500 + 2000 + 300.
        trusted_edge(&mut graph, contigs[0], contigs[2], 2800.0, 10_000.0);

        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        match result {
            RecomputeResult::Ok {
                least_square_error, ..
            } => assert!(least_square_error < 1e-6),
            other => panic!("unexpected result {other:?}"),
        }
        let b = graph.node(contigs[1]).unwrap();
        assert!((b.offset_a_end.mean - 1500.0).abs() < 1e-6);
    }

    #[test]
    fn under_constrained_scaffold_reports_not_enough_clones() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0, 1500.0], 400.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], 500.0, 2500.0);
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        assert_eq!(result, RecomputeResult::NotEnoughClones);
    }

    #[test]
    fn unconnected_gap_reports_singular() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0, 1500.0], 400.0);
        // Two clones over the first gap, none over the second.
        trusted_edge(&mut graph, contigs[0], contigs[1], 500.0, 2500.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], 520.0, 2500.0);
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        assert_eq!(result, RecomputeResult::Singular);
    }

    #[test]
    fn containment_is_detected_and_collapsed() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[500.0, 2000.0], 100.0);
        // Overlap deeper than the shorter contig's length.
        trusted_edge(&mut graph, contigs[0], contigs[1], -600.0, 400.0);
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &NoOverlaps,
            true,
        )
        .unwrap();
        match result {
            RecomputeResult::ContiggedContainments { merged } => {
                assert_eq!(graph.scaffold_contigs(id).unwrap(), vec![merged]);
                assert_eq!(graph.node(merged).unwrap().bp_length.mean, 2000.0);
            }
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn moderate_overlap_is_clamped_without_oracle_support() {
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0], 50.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], -150.0, 100.0);
        let config = ScaffoldConfig::default();
        let result =
            recompute_offsets_in_scaffold(&mut graph, id, &config, &NoOverlaps, true).unwrap();
        assert!(matches!(result, RecomputeResult::Ok { .. }));
        let b = graph.node(contigs[1]).unwrap();
        // Gap pinned at the boundary.
        assert!((b.offset_a_end.mean - (1000.0 + config.minimum_gap)).abs() < 1e-9);
    }

    #[test]
    fn oracle_confirmed_overlap_pins_the_gap() {
        struct FixedOverlap;
        impl OverlapOracle for FixedOverlap {
            fn try_overlap(&self, _spec: &OverlapSpec) -> Option<crate::oracle::OverlapResult> {
                Some(crate::oracle::OverlapResult {
                    length: 140.0,
                    quality: 0.98,
                    is_a_contains_b: false,
                    is_b_contains_a: false,
                })
            }
        }
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0], 50.0);
        trusted_edge(&mut graph, contigs[0], contigs[1], -150.0, 100.0);
        let result = recompute_offsets_in_scaffold(
            &mut graph,
            id,
            &ScaffoldConfig::default(),
            &FixedOverlap,
            true,
        )
        .unwrap();
        assert!(matches!(result, RecomputeResult::Ok { .. }));
        let b = graph.node(contigs[1]).unwrap();
        assert!((b.offset_a_end.mean - 860.0).abs() < 1e-9);
    }

    #[test]
    fn solver_matches_marked_statuses() {
        // Full pipeline sanity: mark then solve.
        let mut graph = ScaffoldGraph::new();
        let (id, contigs) = scaffold(&mut graph, &[1000.0, 2000.0, 1500.0], 450.0);
        graph
            .add_raw_edge(
                contigs[0],
                contigs[1],
                EdgeOrient::AbAb,
                LengthStat::new(500.0, 2500.0),
                None,
            )
            .unwrap();
        graph
            .add_raw_edge(
                contigs[1],
                contigs[2],
                EdgeOrient::AbAb,
                LengthStat::new(480.0, 2500.0),
                None,
            )
            .unwrap();
        let config = ScaffoldConfig::default();
        mark_internal_edge_status(&mut graph, id, &config, false, StatusMask::ALL).unwrap();
        let result =
            recompute_offsets_in_scaffold(&mut graph, id, &config, &NoOverlaps, true).unwrap();
        assert!(matches!(result, RecomputeResult::Ok { .. }));
    }
}
