//! The scaffold graph context object
//!
//! Owns the node and edge arenas, the recycle lists, and every structural
//! mutation: canonical edge insertion, sorted per-node edge lists, scaffold
//! chain construction and traversal. All components operate through a
//! `&mut ScaffoldGraph` borrow; there is no global state.
//!
//! Structural integrity violations (stale ids, an edge missing from a list
//! it claims membership in) are reported as [`GraphError`] and abort the
//! current top-level call; they indicate a prior bug, never a recoverable
//! data condition.

use std::cmp::Ordering;

use thiserror::Error;
use tracing::debug;

use super::arena::Arena;
use super::edge::{Edge, EdgeKind, MateLink, StatusMask};
use super::node::{EdgeId, Node, NodeId, NodeKind};
use super::orient::{EdgeOrient, NodeDirection};
use super::stats::LengthStat;

/// Structural integrity failures. Fatal to the current top-level call.
#[derive(Debug, Error)]
pub enum GraphError {
    /// A node id did not resolve to a live record.
    #[error("stale or unknown node id {0:?}")]
    StaleNode(NodeId),
    /// An edge id did not resolve to a live record.
    #[error("stale or unknown edge id {0:?}")]
    StaleEdge(EdgeId),
    /// An edge was queried with respect to a node it does not touch.
    #[error("node {node:?} is not an endpoint of edge {edge:?}")]
    NotAnEndpoint {
        /// The queried node.
        node: NodeId,
        /// The edge in question.
        edge: EdgeId,
    },
    /// An edge claimed membership in a per-node list it is not linked into.
    #[error("edge {edge:?} not linked into the edge list of node {node:?}")]
    EdgeNotLinked {
        /// List owner.
        node: NodeId,
        /// The missing edge.
        edge: EdgeId,
    },
    /// A scaffold chain walk revisited a node (corrupt chain links).
    #[error("cycle detected walking the chain of scaffold {0:?}")]
    ChainCycle(NodeId),
    /// A scaffold operation was applied to a non-scaffold node.
    #[error("node {0:?} is not a scaffold")]
    NotAScaffold(NodeId),
}

/// Placement of one contig when assembling a scaffold chain.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    /// The contig being placed.
    pub contig: NodeId,
    /// Scaffold coordinate of the contig's A end.
    pub a_end: LengthStat,
    /// Scaffold coordinate of the contig's B end.
    pub b_end: LengthStat,
}

/// Arena-backed graph of contigs, unitigs, and scaffolds.
#[derive(Debug, Default, Clone)]
pub struct ScaffoldGraph {
    nodes: Arena<Node>,
    edges: Arena<Edge>,
    dead_nodes: Vec<NodeId>,
    tobe_free: Vec<EdgeId>,
}

impl ScaffoldGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes (dead-but-unrecycled included).
    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    /// Number of live edge records, raw constituents included.
    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    /// Register a new node.
    pub fn add_node(&mut self, kind: NodeKind, bp_length: LengthStat) -> NodeId {
        self.nodes.insert(Node::new(kind, bp_length))
    }

    /// Resolve a node id.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.nodes.get(id).ok_or(GraphError::StaleNode(id))
    }

    /// Resolve a node id mutably.
    pub fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes.get_mut(id).ok_or(GraphError::StaleNode(id))
    }

    /// Resolve an edge id.
    pub fn edge(&self, id: EdgeId) -> Result<&Edge, GraphError> {
        self.edges.get(id).ok_or(GraphError::StaleEdge(id))
    }

    /// Resolve an edge id mutably.
    pub fn edge_mut(&mut self, id: EdgeId) -> Result<&mut Edge, GraphError> {
        self.edges.get_mut(id).ok_or(GraphError::StaleEdge(id))
    }

    /// All live node ids in slot order.
    pub fn node_ids(&self) -> Vec<NodeId> {
        self.nodes.ids()
    }

    /// Create a raw edge, canonicalizing endpoint order, and link it into
    /// both endpoints' sorted lists.
    pub fn add_raw_edge(
        &mut self,
        id_a: NodeId,
        id_b: NodeId,
        orient: EdgeOrient,
        distance: LengthStat,
        link: Option<MateLink>,
    ) -> Result<EdgeId, GraphError> {
        self.node(id_a)?;
        self.node(id_b)?;
        // Canonical form: lower arena index first, orientation swapped to
        // match.
        let (id_a, id_b, orient) = if id_a.index() <= id_b.index() {
            (id_a, id_b, orient)
        } else {
            (id_b, id_a, orient.swapped())
        };
        let edge_id = self
            .edges
            .insert(Edge::raw(id_a, id_b, orient, distance, link));
        self.insert_edge_in_list(edge_id, id_a)?;
        if id_b != id_a {
            self.insert_edge_in_list(edge_id, id_b)?;
        }
        Ok(edge_id)
    }

    /// Insert a constructed edge record (used by the merger) and link it.
    pub fn insert_edge(&mut self, edge: Edge) -> Result<EdgeId, GraphError> {
        let (a, b) = (edge.id_a, edge.id_b);
        let edge_id = self.edges.insert(edge);
        self.insert_edge_in_list(edge_id, a)?;
        if b != a {
            self.insert_edge_in_list(edge_id, b)?;
        }
        Ok(edge_id)
    }

    /// Total order over a node's edge list: (id_a, id_b, orientation), then
    /// guides last, overlap edges after mate-only edges, then distance mean,
    /// then edge identity. Keeps the most informative edges first and makes
    /// same-pair runs consecutive for the merger.
    fn edge_cmp(&self, x_id: EdgeId, y_id: EdgeId) -> Ordering {
        let x = match self.edges.get(x_id) {
            Some(e) => e,
            None => return Ordering::Greater,
        };
        let y = match self.edges.get(y_id) {
            Some(e) => e,
            None => return Ordering::Less,
        };
        let key = |e: &Edge| {
            (
                e.id_a.index(),
                e.id_b.index(),
                e.orient,
                e.flags.has_guide || e.flags.has_sts_guide,
                e.is_overlap_edge(),
            )
        };
        key(x)
            .cmp(&key(y))
            .then_with(|| x.distance.mean.total_cmp(&y.distance.mean))
            .then_with(|| x_id.cmp(&y_id))
    }

    /// Link an edge into one endpoint's sorted list.
    pub fn insert_edge_in_list(
        &mut self,
        edge_id: EdgeId,
        node_id: NodeId,
    ) -> Result<(), GraphError> {
        let edge = self.edge(edge_id)?;
        if edge.other_end(node_id).is_none() {
            return Err(GraphError::NotAnEndpoint {
                node: node_id,
                edge: edge_id,
            });
        }
        let list = &self.node(node_id)?.edges;
        let pos = list.partition_point(|&other| self.edge_cmp(other, edge_id) == Ordering::Less);
        self.node_mut(node_id)?.edges.insert(pos, edge_id);
        Ok(())
    }

    /// Remove an edge from both endpoints' lists. The edge record stays
    /// live (the merger unlinks raw edges it is about to fold).
    pub fn unlink_edge(&mut self, edge_id: EdgeId) -> Result<(), GraphError> {
        let (a, b) = {
            let edge = self.edge(edge_id)?;
            (edge.id_a, edge.id_b)
        };
        self.unlink_from(edge_id, a)?;
        if b != a {
            self.unlink_from(edge_id, b)?;
        }
        Ok(())
    }

    fn unlink_from(&mut self, edge_id: EdgeId, node_id: NodeId) -> Result<(), GraphError> {
        let node = self.node_mut(node_id)?;
        match node.edges.iter().position(|&e| e == edge_id) {
            Some(pos) => {
                node.edges.remove(pos);
                Ok(())
            }
            None => Err(GraphError::EdgeNotLinked {
                node: node_id,
                edge: edge_id,
            }),
        }
    }

    /// Is the edge currently linked into `node`'s list?
    pub fn is_linked(&self, edge_id: EdgeId, node_id: NodeId) -> Result<bool, GraphError> {
        Ok(self.node(node_id)?.edges.contains(&edge_id))
    }

    /// Unlink an edge, mark it deleted, and push it (and, for merged edges,
    /// its constituents) onto the recycle list. Slots are reclaimed by
    /// [`ScaffoldGraph::collect_garbage`].
    pub fn delete_edge(&mut self, edge_id: EdgeId) -> Result<(), GraphError> {
        self.unlink_edge(edge_id)?;
        let constituents = match &self.edge(edge_id)?.kind {
            EdgeKind::Merged(raws) => raws.clone(),
            EdgeKind::Raw(_) => Vec::new(),
        };
        for raw_id in constituents {
            self.edge_mut(raw_id)?.flags.is_deleted = true;
            self.tobe_free.push(raw_id);
        }
        self.edge_mut(edge_id)?.flags.is_deleted = true;
        self.tobe_free.push(edge_id);
        Ok(())
    }

    /// Fold the recycle list into the arena free list, releasing slots.
    pub fn collect_garbage(&mut self) {
        let reclaimed = self.tobe_free.len();
        for edge_id in std::mem::take(&mut self.tobe_free) {
            self.edges.remove(edge_id);
        }
        if reclaimed > 0 {
            debug!(reclaimed, "edge slots reclaimed");
        }
    }

    /// Edges awaiting reclamation.
    pub fn pending_free(&self) -> usize {
        self.tobe_free.len()
    }

    /// Mark a node dead and remember it for recycling. The record stays
    /// resolvable until [`ScaffoldGraph::recycle_dead_nodes`] runs.
    pub fn kill_node(&mut self, node_id: NodeId) -> Result<(), GraphError> {
        self.node_mut(node_id)?.flags.is_dead = true;
        self.dead_nodes.push(node_id);
        Ok(())
    }

    /// Release every dead node's slot.
    pub fn recycle_dead_nodes(&mut self) {
        for node_id in std::mem::take(&mut self.dead_nodes) {
            self.nodes.remove(node_id);
        }
    }

    /// Assemble a scaffold node from ordered placements (lowest coordinate
    /// first), wiring chain links off the correct sequence ends and setting
    /// membership, indices, and aggregate length.
    pub fn build_scaffold(&mut self, placements: &[Placement]) -> Result<NodeId, GraphError> {
        let span = placements
            .last()
            .map(|p| {
                if p.a_end.mean >= p.b_end.mean {
                    p.a_end
                } else {
                    p.b_end
                }
            })
            .unwrap_or(LengthStat::zero());
        let scaffold_id = self.add_node(NodeKind::Scaffold, span);

        for (index, placement) in placements.iter().enumerate() {
            let prev = index.checked_sub(1).map(|i| placements[i].contig);
            let next = placements.get(index + 1).map(|p| p.contig);
            let node = self.node_mut(placement.contig)?;
            node.scaffold_id = Some(scaffold_id);
            node.index_in_scaffold = index;
            node.offset_a_end = placement.a_end;
            node.offset_b_end = placement.b_end;
            // Chain neighbors hang off the sequence end that faces them.
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

        let scaffold = self.node_mut(scaffold_id)?;
        scaffold.chain_head = placements.first().map(|p| p.contig);
        scaffold.chain_tail = placements.last().map(|p| p.contig);
        scaffold.stats.num_elements = placements.len();
        Ok(scaffold_id)
    }

    /// Contigs of a scaffold in chain order (A end to B end), with a cycle
    /// guard against corrupt links.
    pub fn scaffold_contigs(&self, scaffold_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let scaffold = self.node(scaffold_id)?;
        if scaffold.kind != NodeKind::Scaffold {
            return Err(GraphError::NotAScaffold(scaffold_id));
        }
        let mut out = Vec::new();
        let mut cursor = scaffold.chain_head;
        let limit = self.nodes.len() + 1;
        while let Some(id) = cursor {
            if out.len() > limit {
                return Err(GraphError::ChainCycle(scaffold_id));
            }
            out.push(id);
            cursor = self.node(id)?.next_in_chain();
        }
        Ok(out)
    }

    /// Reassign `index_in_scaffold` along the chain and refresh the element
    /// count. Returns the ordered contigs.
    pub fn reindex_scaffold(&mut self, scaffold_id: NodeId) -> Result<Vec<NodeId>, GraphError> {
        let contigs = self.scaffold_contigs(scaffold_id)?;
        for (index, &contig) in contigs.iter().enumerate() {
            self.node_mut(contig)?.index_in_scaffold = index;
        }
        self.node_mut(scaffold_id)?.stats.num_elements = contigs.len();
        Ok(contigs)
    }

    /// Sum of `edges_contributing` over a node's incident edges admitted by
    /// `mask` and confined to its own scaffold.
    pub fn internal_edge_weight(
        &self,
        node_id: NodeId,
        mask: StatusMask,
    ) -> Result<usize, GraphError> {
        let node = self.node(node_id)?;
        let mut weight = 0;
        for &edge_id in &node.edges {
            let edge = self.edge(edge_id)?;
            if !mask.admits(edge.status) {
                continue;
            }
            let other = edge.other_end(node_id).ok_or(GraphError::NotAnEndpoint {
                node: node_id,
                edge: edge_id,
            })?;
            if self.node(other)?.scaffold_id == node.scaffold_id {
                weight += edge.edges_contributing();
            }
        }
        Ok(weight)
    }
}
