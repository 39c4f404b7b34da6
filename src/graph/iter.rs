//! Lazy traversal of a node's incident edges
//!
//! The iterator borrows the graph for its whole lifetime, so any attempt to
//! mutate an edge list mid-traversal is rejected by the borrow checker
//! rather than corrupting the walk. A fresh iterator restarts from the head
//! of the node's sorted list.

use tracing::{error, warn};

use super::edge::{Edge, EdgeKind, StatusMask};
use super::node::{EdgeId, NodeId};
use super::orient::EndSelector;
use super::store::ScaffoldGraph;

/// Stateful walk over the top-level (and optionally raw) edges incident on
/// one node, filtered by end, status mask, and containment exclusion.
#[derive(Debug)]
pub struct EdgeIterator<'g> {
    graph: &'g ScaffoldGraph,
    node: NodeId,
    end: EndSelector,
    mask: StatusMask,
    exclude_containment: bool,
    cursor: usize,
    /// Progress inside the current merged edge's constituent list.
    raw_cursor: Option<(EdgeId, usize)>,
}

impl<'g> EdgeIterator<'g> {
    /// Start a traversal at the head of `node`'s edge list.
    pub fn new(graph: &'g ScaffoldGraph, node: NodeId, end: EndSelector, mask: StatusMask) -> Self {
        Self {
            graph,
            node,
            end,
            mask,
            exclude_containment: false,
            cursor: 0,
            raw_cursor: None,
        }
    }

    /// Skip containment edges during traversal.
    pub fn excluding_containment(mut self) -> Self {
        self.exclude_containment = true;
        self
    }

    /// Resolve an id taken from the node's edge list. A stale id here means
    /// the list and the edge arena disagree, which unlink/delete must never
    /// leave behind.
    fn resolve(&self, edge_id: EdgeId) -> Option<&'g Edge> {
        match self.graph.edge(edge_id) {
            Ok(edge) => Some(edge),
            Err(err) => {
                debug_assert!(false, "edge list holds a stale id: {err}");
                error!(?edge_id, node = ?self.node, %err, "edge list holds a stale id");
                None
            }
        }
    }

    fn admits(&self, edge: &Edge) -> bool {
        if !self.mask.admits(edge.status) {
            return false;
        }
        if edge.flags.is_deleted {
            return false;
        }
        if self.exclude_containment && edge.is_containment_edge() {
            return false;
        }
        match edge.end_at(self.node) {
            Some(end) => self.end.admits(end),
            None => false,
        }
    }

    /// Next top-level edge (merged or singleton raw) passing the filters.
    pub fn next_merged(&mut self) -> Option<EdgeId> {
        self.raw_cursor = None;
        let list = match self.graph.node(self.node) {
            Ok(node) => &node.edges,
            Err(err) => {
                warn!(node = ?self.node, %err, "iterating a dead node");
                return None;
            }
        };
        while self.cursor < list.len() {
            let edge_id = list[self.cursor];
            self.cursor += 1;
            let edge = self.resolve(edge_id)?;
            if self.admits(edge) {
                return Some(edge_id);
            }
        }
        None
    }

    /// Next raw edge, descending transparently into merged bundles. Raw
    /// constituents inherit the top-level edge's filtering.
    pub fn next_raw(&mut self) -> Option<EdgeId> {
        loop {
            if let Some((merged_id, index)) = self.raw_cursor {
                let merged = self.resolve(merged_id)?;
                if let EdgeKind::Merged(raws) = &merged.kind {
                    if index < raws.len() {
                        self.raw_cursor = Some((merged_id, index + 1));
                        return Some(raws[index]);
                    }
                }
                self.raw_cursor = None;
            }
            let top_id = self.next_merged()?;
            let top = self.resolve(top_id)?;
            match &top.kind {
                EdgeKind::Raw(_) => return Some(top_id),
                EdgeKind::Merged(_) => {
                    self.raw_cursor = Some((top_id, 0));
                }
            }
        }
    }

    /// Drain the remaining top-level edges into a vector.
    pub fn collect_merged(mut self) -> Vec<EdgeId> {
        let mut out = Vec::new();
        while let Some(id) = self.next_merged() {
            out.push(id);
        }
        out
    }

    /// Drain the remaining raw edges into a vector.
    pub fn collect_raw(mut self) -> Vec<EdgeId> {
        let mut out = Vec::new();
        while let Some(id) = self.next_raw() {
            out.push(id);
        }
        out
    }
}
