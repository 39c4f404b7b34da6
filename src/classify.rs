//! Edge status classification within a scaffold
//!
//! Every edge internal to a scaffold is compared against the gap implied by
//! the current contig placements: orientation must agree with the stored
//! contig directions, and the edge's distance must pass a chi-squared
//! compatibility test against the placement-implied gap. The outcome feeds
//! the gap solver (only trusted edges constrain gaps) and the scaffold
//! mutators (splits follow the trusted subgraph).

use tracing::warn;

use crate::graph::{
    EdgeIterator, EdgeOrient, EdgeStatus, EndSelector, GraphError, LengthStat, NodeId,
    ScaffoldGraph, StatusMask,
};
use crate::ScaffoldConfig;

/// Gap between two placed contigs as implied by their scaffold offsets,
/// lower index first. The variance is the difference of the end variances:
/// offsets accumulate uncertainty along the scaffold, so the downstream end
/// carries the upstream end's variance plus the gap's own.
pub fn implied_gap(
    graph: &ScaffoldGraph,
    lower: NodeId,
    higher: NodeId,
) -> Result<LengthStat, GraphError> {
    let lo = graph.node(lower)?;
    let hi = graph.node(higher)?;
    Ok(LengthStat::new(
        hi.left_offset().mean - lo.right_offset().mean,
        hi.left_offset().variance - lo.right_offset().variance,
    ))
}

/// Orientation the scaffold placement implies for the pair (lower, higher).
pub fn implied_orientation(
    graph: &ScaffoldGraph,
    lower: NodeId,
    higher: NodeId,
) -> Result<EdgeOrient, GraphError> {
    Ok(EdgeOrient::from_directions(
        graph.node(lower)?.placed_direction(),
        graph.node(higher)?.placed_direction(),
    ))
}

/// Classification cascade for one edge whose endpoints both lie in
/// `scaffold_id`, read from the lower-index endpoint.
fn classify(
    graph: &ScaffoldGraph,
    edge_id: crate::graph::EdgeId,
    lower: NodeId,
    higher: NodeId,
    config: &ScaffoldConfig,
    tentative: bool,
) -> Result<EdgeStatus, GraphError> {
    let edge = graph.edge(edge_id)?;
    let untrusted = if tentative {
        EdgeStatus::TentativeUntrusted
    } else {
        EdgeStatus::Untrusted
    };
    let trusted = if tentative {
        EdgeStatus::TentativeTrusted
    } else {
        EdgeStatus::Trusted
    };

    let edge_orient = edge.orientation_wrt(lower).ok_or(GraphError::NotAnEndpoint {
        node: lower,
        edge: edge_id,
    })?;
    if edge_orient != implied_orientation(graph, lower, higher)? {
        return Ok(untrusted);
    }

    let gap = implied_gap(graph, lower, higher)?;
    if gap.variance <= 0.0 {
        // Offsets should accumulate variance monotonically; a non-positive
        // implied variance means upstream data is inconsistent.
        warn!(
            ?edge_id,
            gap_mean = gap.mean,
            gap_variance = gap.variance,
            "implied gap variance non-positive; marking edge untrusted"
        );
        return Ok(EdgeStatus::Untrusted);
    }

    if gap.chi_squared(&edge.distance) > config.chi_squared_threshold {
        return Ok(untrusted);
    }
    if edge.distance.variance > config.max_variance {
        return Ok(EdgeStatus::LargeVariance);
    }
    Ok(trusted)
}

/// Reclassify every edge internal to `scaffold_id`, visiting each canonical
/// (lower-index, higher-index) pair once, and refresh the scaffold's
/// internal-edge counters. Idempotent for unchanged inputs.
pub fn mark_internal_edge_status(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    config: &ScaffoldConfig,
    tentative: bool,
    mask: StatusMask,
) -> Result<(), GraphError> {
    let contigs = graph.reindex_scaffold(scaffold_id)?;

    let mut assignments: Vec<(crate::graph::EdgeId, EdgeStatus)> = Vec::new();
    for &contig in &contigs {
        let edge_ids =
            EdgeIterator::new(graph, contig, EndSelector::All, mask).collect_merged();
        for edge_id in edge_ids {
            let edge = graph.edge(edge_id)?;
            let other = edge.other_end(contig).ok_or(GraphError::NotAnEndpoint {
                node: contig,
                edge: edge_id,
            })?;
            let other_node = graph.node(other)?;
            if other_node.scaffold_id != Some(scaffold_id) {
                assignments.push((edge_id, EdgeStatus::InterScaffold));
                continue;
            }
            // Visit each in-scaffold pair from its lower-index side only.
            if graph.node(contig)?.index_in_scaffold >= other_node.index_in_scaffold {
                continue;
            }
            let status = classify(graph, edge_id, contig, other, config, tentative)?;
            assignments.push((edge_id, status));
        }
    }

    let mut internal = 0usize;
    let mut confirmed = 0usize;
    for (edge_id, status) in assignments {
        graph.edge_mut(edge_id)?.status = status;
        if StatusMask::INTERNAL.admits(status) {
            internal += 1;
        }
        if StatusMask::TRUSTED.admits(status) {
            confirmed += 1;
        }
    }
    let stats = &mut graph.node_mut(scaffold_id)?.stats;
    stats.internal_edges = internal;
    stats.confirmed_internal_edges = confirmed;
    Ok(())
}

/// Re-derive every internal edge's status without writing and count
/// disagreements with the stored statuses. Zero on a freshly marked,
/// unchanged scaffold.
pub fn check_internal_edge_status(
    graph: &ScaffoldGraph,
    scaffold_id: NodeId,
    config: &ScaffoldConfig,
    tentative: bool,
    mask: StatusMask,
) -> Result<usize, GraphError> {
    let contigs = graph.scaffold_contigs(scaffold_id)?;
    let mut mismatches = 0usize;
    for &contig in &contigs {
        let edge_ids =
            EdgeIterator::new(graph, contig, EndSelector::All, mask).collect_merged();
        for edge_id in edge_ids {
            let edge = graph.edge(edge_id)?;
            let other = edge.other_end(contig).ok_or(GraphError::NotAnEndpoint {
                node: contig,
                edge: edge_id,
            })?;
            let other_node = graph.node(other)?;
            let expected = if other_node.scaffold_id != Some(scaffold_id) {
                EdgeStatus::InterScaffold
            } else {
                if graph.node(contig)?.index_in_scaffold >= other_node.index_in_scaffold {
                    continue;
                }
                classify(graph, edge_id, contig, other, config, tentative)?
            };
            if edge.status != expected {
                mismatches += 1;
                warn!(
                    ?edge_id,
                    stored = ?edge.status,
                    ?expected,
                    "internal edge status disagrees with re-derivation"
                );
            }
        }
    }
    Ok(mismatches)
}
