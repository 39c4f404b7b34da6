//! Edge merger: consolidate same-pair mate evidence
//!
//! Raw edges sharing (id_a, id_b, orientation) sit consecutively in each
//! node's sorted edge list. The merger folds every such run into a single
//! top-level edge whose distance is the inverse-variance-weighted
//! combination of the run, keeping each raw edge alive and retrievable
//! behind the merged record.

use tracing::debug;

use crate::graph::{
    Edge, EdgeFlags, EdgeId, EdgeKind, EdgeStatus, GraphError, ScaffoldGraph,
    MIN_COMBINE_VARIANCE,
};
use crate::ScaffoldConfig;

/// Scan every node's edge list and fold mergeable runs. Guide and sloppy
/// edges are left out of candidacy unless `include_guides` is set, so they
/// stay at the tail of their priority runs. Returns the number of merges
/// performed. Singleton runs are left untouched.
pub fn merge_all_edges(
    graph: &mut ScaffoldGraph,
    config: &ScaffoldConfig,
    include_guides: bool,
) -> Result<usize, GraphError> {
    let mut runs: Vec<Vec<EdgeId>> = Vec::new();
    for node_id in graph.node_ids() {
        let list = graph.node(node_id)?.edges.clone();
        let mut current: Vec<EdgeId> = Vec::new();
        for edge_id in list {
            let edge = graph.edge(edge_id)?;
            let mergeable = edge.is_raw()
                && edge.id_a == node_id
                && (include_guides || !edge.is_sloppy_edge(config.sloppy_variance_threshold));
            if !mergeable {
                flush_run(&mut runs, &mut current);
                continue;
            }
            if let Some(&head) = current.first() {
                let head_edge = graph.edge(head)?;
                if head_edge.id_b != edge.id_b || head_edge.orient != edge.orient {
                    flush_run(&mut runs, &mut current);
                }
            }
            current.push(edge_id);
        }
        flush_run(&mut runs, &mut current);
    }

    let count = runs.len();
    for run in runs {
        merge_run(graph, &run)?;
    }
    if count > 0 {
        debug!(merges = count, "edge runs consolidated");
    }
    Ok(count)
}

fn flush_run(runs: &mut Vec<Vec<EdgeId>>, current: &mut Vec<EdgeId>) {
    if current.len() >= 2 {
        runs.push(std::mem::take(current));
    } else {
        current.clear();
    }
}

/// Fold one run (already verified to share endpoints and orientation) into
/// a merged top-level edge.
fn merge_run(graph: &mut ScaffoldGraph, run: &[EdgeId]) -> Result<EdgeId, GraphError> {
    debug_assert!(run.len() >= 2);

    let (id_a, id_b, orient, mut distance) = {
        let head = graph.edge(run[0])?;
        (
            head.id_a,
            head.id_b,
            head.orient,
            head.distance.clamped(MIN_COMBINE_VARIANCE, "merge input"),
        )
    };
    // Fold in run order for deterministic rounding.
    for &raw_id in &run[1..] {
        let observed = graph
            .edge(raw_id)?
            .distance
            .clamped(MIN_COMBINE_VARIANCE, "merge input");
        distance = distance.combine(&observed);
    }

    let mut flags = EdgeFlags::default();
    for &raw_id in run {
        let raw = graph.edge(raw_id)?;
        // Overlap evidence survives consolidation.
        flags.has_contributing_overlap |= raw.flags.has_contributing_overlap;
        flags.has_repeat_overlap |= raw.flags.has_repeat_overlap;
        flags.has_tandem_overlap |= raw.flags.has_tandem_overlap;
        flags.a_contains_b |= raw.flags.a_contains_b;
        flags.b_contains_a |= raw.flags.b_contains_a;
    }

    for &raw_id in run {
        graph.unlink_edge(raw_id)?;
    }

    let merged = Edge {
        id_a,
        id_b,
        orient,
        distance,
        status: EdgeStatus::Unknown,
        flags,
        kind: EdgeKind::Merged(run.to_vec()),
    };
    graph.insert_edge(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{EdgeOrient, LengthStat, NodeId, NodeKind};

    fn pair() -> (ScaffoldGraph, NodeId, NodeId) {
        let mut graph = ScaffoldGraph::new();
        let a = graph.add_node(NodeKind::Contig, LengthStat::new(1000.0, 0.0));
        let b = graph.add_node(NodeKind::Contig, LengthStat::new(2000.0, 0.0));
        (graph, a, b)
    }

    fn add(graph: &mut ScaffoldGraph, a: NodeId, b: NodeId, orient: EdgeOrient, mean: f64, var: f64) -> EdgeId {
        graph
            .add_raw_edge(a, b, orient, LengthStat::new(mean, var), None)
            .unwrap()
    }

    #[test]
    fn merge_combines_run_and_preserves_raws() {
        let (mut graph, a, b) = pair();
        let raws = [
            add(&mut graph, a, b, EdgeOrient::AbAb, 400.0, 1600.0),
            add(&mut graph, a, b, EdgeOrient::AbAb, 500.0, 2500.0),
            add(&mut graph, a, b, EdgeOrient::AbAb, 600.0, 400.0),
        ];
        let merges = merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();
        assert_eq!(merges, 1);

        let list = graph.node(a).unwrap().edges.clone();
        assert_eq!(list.len(), 1);
        let merged = graph.edge(list[0]).unwrap();
        assert_eq!(merged.edges_contributing(), 3);
        assert!(merged.distance.mean >= 400.0 && merged.distance.mean <= 600.0);
        // Tightest observation dominates.
        assert!(merged.distance.mean > 500.0);
        assert!(merged.distance.variance < 400.0);
        match &merged.kind {
            EdgeKind::Merged(c) => assert_eq!(c.as_slice(), &raws[..]),
            EdgeKind::Raw(_) => panic!("expected merged edge"),
        }
        // Raw records remain individually resolvable.
        for raw in raws {
            assert!(graph.edge(raw).is_ok());
            assert!(!graph.is_linked(raw, a).unwrap());
        }
    }

    #[test]
    fn merged_distance_is_the_pairwise_combination() {
        let (mut graph, a, b) = pair();
        let observations = [(400.0, 1600.0), (500.0, 2500.0), (600.0, 400.0)];
        for (mean, var) in observations {
            add(&mut graph, a, b, EdgeOrient::AbAb, mean, var);
        }
        merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();

        let expected = observations[1..].iter().fold(
            LengthStat::new(observations[0].0, observations[0].1),
            |acc, &(mean, var)| acc.combine(&LengthStat::new(mean, var)),
        );
        let list = graph.node(a).unwrap().edges.clone();
        let merged = graph.edge(list[0]).unwrap();
        assert!((merged.distance.mean - expected.mean).abs() < 1e-12);
        assert!((merged.distance.variance - expected.variance).abs() < 1e-12);
    }

    #[test]
    fn singleton_run_is_identity() {
        let (mut graph, a, b) = pair();
        let lone = add(&mut graph, a, b, EdgeOrient::AbAb, 500.0, 2500.0);
        let merges = merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();
        assert_eq!(merges, 0);
        let edge = graph.edge(lone).unwrap();
        assert_eq!(edge.distance.mean, 500.0);
        assert_eq!(edge.distance.variance, 2500.0);
        assert!(edge.is_raw());
        assert!(graph.is_linked(lone, a).unwrap());
    }

    #[test]
    fn different_orientations_do_not_merge() {
        let (mut graph, a, b) = pair();
        add(&mut graph, a, b, EdgeOrient::AbAb, 500.0, 2500.0);
        add(&mut graph, a, b, EdgeOrient::AbBa, 500.0, 2500.0);
        let merges = merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();
        assert_eq!(merges, 0);
        assert_eq!(graph.node(a).unwrap().edges.len(), 2);
    }

    #[test]
    fn guide_edges_stay_out_unless_requested() {
        let (mut graph, a, b) = pair();
        add(&mut graph, a, b, EdgeOrient::AbAb, 500.0, 2500.0);
        add(&mut graph, a, b, EdgeOrient::AbAb, 520.0, 2500.0);
        let guide = add(&mut graph, a, b, EdgeOrient::AbAb, 480.0, 2500.0);
        graph.edge_mut(guide).unwrap().flags.has_guide = true;

        let merges = merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();
        assert_eq!(merges, 1);
        let list = graph.node(a).unwrap().edges.clone();
        // Merged mate edge plus the untouched guide.
        assert_eq!(list.len(), 2);
        assert!(graph.edge(list[1]).unwrap().flags.has_guide);
    }

    #[test]
    fn containment_bits_survive_merge() {
        let (mut graph, a, b) = pair();
        let first = add(&mut graph, a, b, EdgeOrient::AbAb, -900.0, 100.0);
        add(&mut graph, a, b, EdgeOrient::AbAb, -880.0, 150.0);
        graph.edge_mut(first).unwrap().flags.a_contains_b = true;
        merge_all_edges(&mut graph, &ScaffoldConfig::default(), false).unwrap();
        let list = graph.node(a).unwrap().edges.clone();
        assert!(graph.edge(list[0]).unwrap().flags.a_contains_b);
    }
}
