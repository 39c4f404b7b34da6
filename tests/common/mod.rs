//! Shared builders for scaffold-graph integration tests

#![allow(dead_code)]

use scafgraph::graph::Placement;
use scafgraph::{EdgeId, EdgeOrient, LengthStat, NodeId, NodeKind, ScaffoldGraph};

/// Forward contigs laid out with the given lengths and a uniform rough gap,
/// end variance growing by 500 per contig along the chain.
pub fn chain(graph: &mut ScaffoldGraph, lengths: &[f64], gap: f64) -> (NodeId, Vec<NodeId>) {
    let mut placements = Vec::new();
    let mut contigs = Vec::new();
    let mut at = 0.0;
    let mut variance = 0.0;
    for &len in lengths {
        let contig = graph.add_node(NodeKind::Contig, LengthStat::new(len, 0.0));
        placements.push(Placement {
            contig,
            a_end: LengthStat::new(at, variance),
            b_end: LengthStat::new(at + len, variance),
        });
        contigs.push(contig);
        at += len + gap;
        variance += 500.0;
    }
    let scaffold = graph
        .build_scaffold(&placements)
        .expect("scaffold builds from fresh placements");
    (scaffold, contigs)
}

/// An innie mate observation between two forward contigs.
pub fn mate(
    graph: &mut ScaffoldGraph,
    a: NodeId,
    b: NodeId,
    mean: f64,
    variance: f64,
) -> EdgeId {
    graph
        .add_raw_edge(a, b, EdgeOrient::AbAb, LengthStat::new(mean, variance), None)
        .expect("endpoints are live")
}
