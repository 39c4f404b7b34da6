//! Scaffold restructuring operations
//!
//! The gap solver's terminal outcomes (containment, mis-order) and the
//! status classifier's trusted subgraph feed back into scaffold topology
//! through the operations here: containment collapsing, adjacent reorder
//! fix-up, and scaffold splitting on low weight or disconnection.

use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::unionfind::UnionFind;
use tracing::debug;

use crate::graph::{
    EdgeKind, GraphError, LengthStat, NodeDirection, NodeId, NodeKind, ScaffoldGraph, StatusMask,
};
use crate::ScaffoldConfig;

/// Rewire a scaffold node over an ordered (by coordinate) contig list:
/// membership, chain links, head/tail, indices, element count, span.
pub(crate) fn relink_chain(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    contigs: &[NodeId],
) -> Result<(), GraphError> {
    for (index, &contig) in contigs.iter().enumerate() {
        let prev = index.checked_sub(1).map(|i| contigs[i]);
        let next = contigs.get(index + 1).copied();
        let node = graph.node_mut(contig)?;
        node.scaffold_id = Some(scaffold_id);
        node.index_in_scaffold = index;
        match node.placed_direction() {
            NodeDirection::Forward => {
                node.a_end_next = prev;
                node.b_end_next = next;
            }
            NodeDirection::Reversed => {
                node.b_end_next = prev;
                node.a_end_next = next;
            }
        }
    }
    let span = match contigs.last() {
        Some(&last) => graph.node(last)?.right_offset(),
        None => LengthStat::zero(),
    };
    let scaffold = graph.node_mut(scaffold_id)?;
    scaffold.chain_head = contigs.first().copied();
    scaffold.chain_tail = contigs.last().copied();
    scaffold.stats.num_elements = contigs.len();
    scaffold.bp_length = span;
    Ok(())
}

/// Shift a component's offsets so its leftmost contig starts at zero, with
/// variances rebased against the new anchor.
fn rebase_offsets(graph: &mut ScaffoldGraph, contigs: &[NodeId]) -> Result<(), GraphError> {
    let first = match contigs.first() {
        Some(&c) => c,
        None => return Ok(()),
    };
    let anchor = graph.node(first)?.left_offset();
    for &contig in contigs {
        let node = graph.node_mut(contig)?;
        for offset in [&mut node.offset_a_end, &mut node.offset_b_end] {
            offset.mean -= anchor.mean;
            offset.variance = (offset.variance - anchor.variance).max(0.0);
        }
    }
    Ok(())
}

/// Merge two chain-adjacent contigs, one of which contains the other, into
/// a single multi-unitig contig occupying the container's span. Incident
/// edges are transferred to the new contig (re-canonicalized); edges
/// between the pair become degenerate and are retired. The originals are
/// marked dead. Returns the replacement contig.
pub fn collapse_contained_pair(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    lower: NodeId,
    higher: NodeId,
) -> Result<NodeId, GraphError> {
    let (lower_len, higher_len) = (
        graph.node(lower)?.bp_length,
        graph.node(higher)?.bp_length,
    );
    let container = if lower_len.mean >= higher_len.mean {
        lower
    } else {
        higher
    };
    let (offset_a, offset_b, length) = {
        let c = graph.node(container)?;
        (c.offset_a_end, c.offset_b_end, c.bp_length)
    };

    let merged = graph.add_node(NodeKind::Contig, length);
    {
        let node = graph.node_mut(merged)?;
        node.offset_a_end = offset_a;
        node.offset_b_end = offset_b;
        node.scaffold_id = Some(scaffold_id);
    }

    transfer_edges(graph, lower, merged, higher)?;
    transfer_edges(graph, higher, merged, lower)?;

    // Splice the replacement into the chain where the pair sat.
    let contigs = graph.scaffold_contigs(scaffold_id)?;
    let rebuilt: Vec<NodeId> = contigs
        .into_iter()
        .filter(|&c| c != higher)
        .map(|c| if c == lower { merged } else { c })
        .collect();

    graph.kill_node(lower)?;
    graph.kill_node(higher)?;
    graph.node_mut(lower)?.scaffold_id = None;
    graph.node_mut(higher)?.scaffold_id = None;
    relink_chain(graph, scaffold_id, &rebuilt)?;
    debug!(?lower, ?higher, ?merged, "contained pair collapsed");
    Ok(merged)
}

/// Re-point every edge incident on `from` at `to`. Edges whose other
/// endpoint is `dropped_peer` (the partner being collapsed away) are
/// retired instead: their evidence refers to a relationship that no longer
/// exists.
fn transfer_edges(
    graph: &mut ScaffoldGraph,
    from: NodeId,
    to: NodeId,
    dropped_peer: NodeId,
) -> Result<(), GraphError> {
    let incident = graph.node(from)?.edges.clone();
    for edge_id in incident {
        let other = graph
            .edge(edge_id)?
            .other_end(from)
            .ok_or(GraphError::NotAnEndpoint {
                node: from,
                edge: edge_id,
            })?;
        if other == dropped_peer || other == to {
            graph.delete_edge(edge_id)?;
            continue;
        }
        graph.unlink_edge(edge_id)?;
        let constituents = match &graph.edge(edge_id)?.kind {
            EdgeKind::Merged(raws) => raws.clone(),
            EdgeKind::Raw(_) => Vec::new(),
        };
        for id in constituents.into_iter().chain(std::iter::once(edge_id)) {
            repoint_edge(graph, id, from, to)?;
        }
        let (a, b) = {
            let e = graph.edge(edge_id)?;
            (e.id_a, e.id_b)
        };
        graph.insert_edge_in_list(edge_id, a)?;
        if b != a {
            graph.insert_edge_in_list(edge_id, b)?;
        }
    }
    Ok(())
}

/// Substitute one endpoint of an edge record, restoring canonical order.
fn repoint_edge(
    graph: &mut ScaffoldGraph,
    edge_id: crate::graph::EdgeId,
    from: NodeId,
    to: NodeId,
) -> Result<(), GraphError> {
    let edge = graph.edge_mut(edge_id)?;
    if edge.id_a == from {
        edge.id_a = to;
    } else if edge.id_b == from {
        edge.id_b = to;
    } else {
        return Err(GraphError::NotAnEndpoint {
            node: from,
            edge: edge_id,
        });
    }
    if edge.id_a.index() > edge.id_b.index() {
        std::mem::swap(&mut edge.id_a, &mut edge.id_b);
        edge.orient = edge.orient.swapped();
        std::mem::swap(&mut edge.flags.a_contains_b, &mut edge.flags.b_contains_a);
    }
    Ok(())
}

/// Swap two chain-adjacent contigs whose overlap evidence contradicts the
/// stored order, recomputing their offsets from the overlap edge between
/// them (falling back to any other edge, then to gap 0, when none
/// survives). Downstream offsets are left for the next solver pass.
pub fn fix_order(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    lower: NodeId,
    higher: NodeId,
) -> Result<(), GraphError> {
    let mut pair_gap = None;
    for &edge_id in &graph.node(lower)?.edges {
        let edge = graph.edge(edge_id)?;
        if edge.other_end(lower) != Some(higher) {
            continue;
        }
        if edge.is_overlap_edge() {
            pair_gap = Some(edge.distance);
            break;
        }
        if pair_gap.is_none() {
            pair_gap = Some(edge.distance);
        }
    }
    let pair_gap = pair_gap.unwrap_or(LengthStat::zero());

    let left = {
        let lo = graph.node(lower)?;
        let hi = graph.node(higher)?;
        lo.left_offset().mean.min(hi.left_offset().mean)
    };

    // `higher` now leads; `lower` follows across the (possibly negative) gap.
    place_at(graph, higher, left)?;
    let follow = graph.node(higher)?.right_offset().mean + pair_gap.mean;
    place_at(graph, lower, follow)?;

    let contigs = graph.scaffold_contigs(scaffold_id)?;
    let mut rebuilt = contigs;
    let li = rebuilt.iter().position(|&c| c == lower);
    let hi = rebuilt.iter().position(|&c| c == higher);
    if let (Some(li), Some(hi)) = (li, hi) {
        rebuilt.swap(li, hi);
    }
    relink_chain(graph, scaffold_id, &rebuilt)?;
    debug!(?lower, ?higher, "adjacent contigs reordered");
    Ok(())
}

/// Move a contig so its lower-coordinate end sits at `left`, preserving its
/// direction and end variances.
fn place_at(graph: &mut ScaffoldGraph, contig: NodeId, left: f64) -> Result<(), GraphError> {
    let node = graph.node_mut(contig)?;
    let len = node.bp_length.mean;
    match node.placed_direction() {
        NodeDirection::Forward => {
            node.offset_a_end.mean = left;
            node.offset_b_end.mean = left + len;
        }
        NodeDirection::Reversed => {
            node.offset_b_end.mean = left;
            node.offset_a_end.mean = left + len;
        }
    }
    Ok(())
}

/// Detach contigs held in their scaffold only by trusted weight below
/// `config.min_split_weight` into singleton scaffolds. Returns the new
/// scaffold ids.
pub fn split_low_weight(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
    config: &ScaffoldConfig,
) -> Result<Vec<NodeId>, GraphError> {
    let contigs = graph.scaffold_contigs(scaffold_id)?;
    if contigs.len() < 2 {
        return Ok(Vec::new());
    }
    let mut keep = Vec::new();
    let mut evicted = Vec::new();
    for contig in contigs {
        let weight = graph.internal_edge_weight(contig, StatusMask::TRUSTED)?;
        if weight < config.min_split_weight {
            evicted.push(contig);
        } else {
            keep.push(contig);
        }
    }
    if evicted.is_empty() || keep.is_empty() {
        return Ok(Vec::new());
    }

    let mut new_scaffolds = Vec::new();
    for contig in evicted {
        let singleton = graph.add_node(NodeKind::Scaffold, LengthStat::zero());
        rebase_offsets(graph, &[contig])?;
        relink_chain(graph, singleton, &[contig])?;
        new_scaffolds.push(singleton);
    }
    rebase_offsets(graph, &keep)?;
    relink_chain(graph, scaffold_id, &keep)?;
    debug!(
        ?scaffold_id,
        evicted = new_scaffolds.len(),
        "low-weight contigs split out"
    );
    Ok(new_scaffolds)
}

/// Partition a scaffold whose trusted internal edge graph is disconnected.
/// The component containing the chain head keeps the original scaffold id;
/// every other component becomes a new scaffold with rebased offsets.
/// Returns the component count and the new scaffold ids.
pub fn check_connectivity_and_split(
    graph: &mut ScaffoldGraph,
    scaffold_id: NodeId,
) -> Result<(usize, Vec<NodeId>), GraphError> {
    let contigs = graph.scaffold_contigs(scaffold_id)?;
    if contigs.len() < 2 {
        return Ok((contigs.len().min(1), Vec::new()));
    }

    let mut connectivity: UnGraph<NodeId, ()> = UnGraph::new_undirected();
    let indices: Vec<NodeIndex> = contigs.iter().map(|&c| connectivity.add_node(c)).collect();
    for (pos, &contig) in contigs.iter().enumerate() {
        for &edge_id in &graph.node(contig)?.edges {
            let edge = graph.edge(edge_id)?;
            if !StatusMask::TRUSTED.admits(edge.status) {
                continue;
            }
            let other = edge.other_end(contig).ok_or(GraphError::NotAnEndpoint {
                node: contig,
                edge: edge_id,
            })?;
            if let Some(other_pos) = contigs.iter().position(|&c| c == other) {
                if other_pos > pos {
                    connectivity.add_edge(indices[pos], indices[other_pos], ());
                }
            }
        }
    }

    let mut components = UnionFind::new(connectivity.node_count());
    for edge in connectivity.edge_indices() {
        if let Some((a, b)) = connectivity.edge_endpoints(edge) {
            components.union(a.index(), b.index());
        }
    }
    let labels = components.into_labeling();

    // Group contigs by component, preserving chain order within each.
    let mut roots: Vec<usize> = Vec::new();
    let mut groups: Vec<Vec<NodeId>> = Vec::new();
    for (pos, &contig) in contigs.iter().enumerate() {
        let root = labels[pos];
        match roots.iter().position(|&r| r == root) {
            Some(g) => groups[g].push(contig),
            None => {
                roots.push(root);
                groups.push(vec![contig]);
            }
        }
    }

    let count = groups.len();
    if count <= 1 {
        return Ok((count, Vec::new()));
    }

    let mut new_scaffolds = Vec::new();
    for (g, group) in groups.into_iter().enumerate() {
        if g == 0 {
            rebase_offsets(graph, &group)?;
            relink_chain(graph, scaffold_id, &group)?;
        } else {
            let fresh = graph.add_node(NodeKind::Scaffold, LengthStat::zero());
            rebase_offsets(graph, &group)?;
            relink_chain(graph, fresh, &group)?;
            new_scaffolds.push(fresh);
        }
    }
    debug!(?scaffold_id, components = count, "scaffold split on disconnection");
    Ok((count, new_scaffolds))
}
