//! Node records: contigs, unitigs, and scaffolds
//!
//! All three graph levels share one record shape, distinguished by
//! [`NodeKind`]. Scaffold membership and placement live directly on the
//! node; the per-node edge list is an id vector kept sorted by the edge
//! priority order (see `store`).

use super::arena::SlotId;
use super::edge::Edge;
use super::orient::NodeDirection;
use super::stats::LengthStat;

/// Stable handle to a node record.
pub type NodeId = SlotId<Node>;

/// Stable handle to an edge record.
pub type EdgeId = SlotId<Edge>;

/// What a node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// A uniquely-assembled initial contig.
    Unitig,
    /// A (possibly multi-unitig) contig.
    Contig,
    /// An ordered chain of contigs.
    Scaffold,
}

/// Boolean properties of a node.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeFlags {
    /// Uniquely placeable (not a repeat).
    pub is_unique: bool,
    /// Logically deleted, awaiting recycling.
    pub is_dead: bool,
    /// Instance of a repeat placed into multiple locations.
    pub is_surrogate: bool,
    /// Tandem-repeat overlap marker on the A end.
    pub tandem_a_end: bool,
    /// Tandem-repeat overlap marker on the B end.
    pub tandem_b_end: bool,
    /// Gap recomputation gave up on this scaffold; offsets are the
    /// last-known-good values.
    pub unresolved: bool,
}

/// Aggregate statistics maintained on scaffold nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaffoldStats {
    /// Number of contigs in the chain.
    pub num_elements: usize,
    /// Residual chi-squared of the last gap solve.
    pub least_square_error: f64,
    /// Clones used by the last gap solve.
    pub num_least_square_clones: usize,
    /// Internal edges counted by the last status marking
    /// (trusted + tentative either way).
    pub internal_edges: usize,
    /// Internal edges marked trusted or tentatively trusted.
    pub confirmed_internal_edges: usize,
}

/// A contig, unitig, or scaffold record.
#[derive(Debug, Clone)]
pub struct Node {
    /// What this node represents.
    pub kind: NodeKind,
    /// Estimated sequence length.
    pub bp_length: LengthStat,
    /// Owning scaffold, if placed.
    pub scaffold_id: Option<NodeId>,
    /// Position in the owning scaffold's chain; recomputed on every
    /// scaffold traversal, meaningless when unplaced.
    pub index_in_scaffold: usize,
    /// Scaffold-coordinate position of the A end.
    pub offset_a_end: LengthStat,
    /// Scaffold-coordinate position of the B end.
    pub offset_b_end: LengthStat,
    /// Chain neighbor off this node's A end (within a scaffold).
    pub a_end_next: Option<NodeId>,
    /// Chain neighbor off this node's B end.
    pub b_end_next: Option<NodeId>,
    /// For scaffold nodes: first contig in the chain (lowest coordinate).
    pub chain_head: Option<NodeId>,
    /// For scaffold nodes: last contig in the chain.
    pub chain_tail: Option<NodeId>,
    /// Edge ids incident on this node, sorted by edge priority.
    pub edges: Vec<EdgeId>,
    /// Boolean properties.
    pub flags: NodeFlags,
    /// Aggregates (scaffold nodes only; zeroed elsewhere).
    pub stats: ScaffoldStats,
}

impl Node {
    /// Fresh unplaced node of the given kind and length.
    pub fn new(kind: NodeKind, bp_length: LengthStat) -> Self {
        Self {
            kind,
            bp_length,
            scaffold_id: None,
            index_in_scaffold: 0,
            offset_a_end: LengthStat::zero(),
            offset_b_end: LengthStat::zero(),
            a_end_next: None,
            b_end_next: None,
            chain_head: None,
            chain_tail: None,
            edges: Vec::new(),
            flags: NodeFlags::default(),
            stats: ScaffoldStats::default(),
        }
    }

    /// Direction the node is placed in within its scaffold, from its end
    /// offsets: A before B is forward.
    pub fn placed_direction(&self) -> NodeDirection {
        if self.offset_a_end.mean <= self.offset_b_end.mean {
            NodeDirection::Forward
        } else {
            NodeDirection::Reversed
        }
    }

    /// Scaffold coordinate of the node's lower-coordinate edge.
    pub fn left_offset(&self) -> LengthStat {
        if self.offset_a_end.mean <= self.offset_b_end.mean {
            self.offset_a_end
        } else {
            self.offset_b_end
        }
    }

    /// Scaffold coordinate of the node's higher-coordinate edge.
    pub fn right_offset(&self) -> LengthStat {
        if self.offset_a_end.mean <= self.offset_b_end.mean {
            self.offset_b_end
        } else {
            self.offset_a_end
        }
    }

    /// Chain neighbor toward increasing scaffold coordinates.
    pub fn next_in_chain(&self) -> Option<NodeId> {
        match self.placed_direction() {
            NodeDirection::Forward => self.b_end_next,
            NodeDirection::Reversed => self.a_end_next,
        }
    }

    /// Chain neighbor toward decreasing scaffold coordinates.
    pub fn prev_in_chain(&self) -> Option<NodeId> {
        match self.placed_direction() {
            NodeDirection::Forward => self.a_end_next,
            NodeDirection::Reversed => self.b_end_next,
        }
    }

    /// Number of incident top-level edges.
    pub fn degree(&self) -> usize {
        self.edges.len()
    }
}
