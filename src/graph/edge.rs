//! Edge records: overlap and mate-pair relationships
//!
//! Edges are stored canonically with `id_a <= id_b` (by arena index) and an
//! orientation expressed relative to that ordering. A top-level edge is
//! either a single raw observation or a merged bundle of raw edges; the raw
//! evidence is never discarded.

use super::node::{EdgeId, NodeId};
use super::orient::{EdgeOrient, SequenceEnd};
use super::stats::LengthStat;

/// One mate-pair observation: the hard input contract from the mate-pair /
/// library subsystem.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MateLink {
    /// Fragment (read) id on the `id_a` side.
    pub frag_a: u64,
    /// Fragment id on the `id_b` side.
    pub frag_b: u64,
    /// Library mean insert size.
    pub library_mean: f64,
    /// Library insert-size standard deviation.
    pub library_stddev: f64,
}

/// Evidence behind a top-level edge.
#[derive(Debug, Clone)]
pub enum EdgeKind {
    /// A single mate-pair or overlap observation.
    Raw(Option<MateLink>),
    /// Consolidation of several raw edges; the ids remain live in the edge
    /// arena and are reachable only through this list.
    Merged(Vec<EdgeId>),
}

/// Reliability classification of an edge, driven by the status classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeStatus {
    /// Not yet classified.
    Unknown,
    /// Statistically inconsistent with the current layout.
    Untrusted,
    /// Inconsistent under a tentative (trial) layout.
    TentativeUntrusted,
    /// Consistent under a tentative layout.
    TentativeTrusted,
    /// Consistent with the current layout.
    Trusted,
    /// Variance too large to constrain anything.
    LargeVariance,
    /// Endpoints live in different scaffolds.
    InterScaffold,
    /// Structurally unusable.
    Invalid,
}

impl EdgeStatus {
    /// Bit used in status masks.
    pub const fn bit(self) -> u16 {
        match self {
            EdgeStatus::Unknown => 1 << 0,
            EdgeStatus::Untrusted => 1 << 1,
            EdgeStatus::TentativeUntrusted => 1 << 2,
            EdgeStatus::TentativeTrusted => 1 << 3,
            EdgeStatus::Trusted => 1 << 4,
            EdgeStatus::LargeVariance => 1 << 5,
            EdgeStatus::InterScaffold => 1 << 6,
            EdgeStatus::Invalid => 1 << 7,
        }
    }
}

/// Bitmask over [`EdgeStatus`] values for iterator filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusMask(pub u16);

impl StatusMask {
    /// Admits every status.
    pub const ALL: StatusMask = StatusMask(0xffff);
    /// Trusted plus tentatively trusted.
    pub const TRUSTED: StatusMask =
        StatusMask(EdgeStatus::Trusted.bit() | EdgeStatus::TentativeTrusted.bit());
    /// Everything counted as scaffold-internal by the classifier.
    pub const INTERNAL: StatusMask = StatusMask(
        EdgeStatus::Trusted.bit()
            | EdgeStatus::TentativeTrusted.bit()
            | EdgeStatus::TentativeUntrusted.bit(),
    );

    /// Does the mask admit `status`?
    pub fn admits(self, status: EdgeStatus) -> bool {
        self.0 & status.bit() != 0
    }

    /// Union of two masks.
    pub fn or(self, other: StatusMask) -> StatusMask {
        StatusMask(self.0 | other.0)
    }
}

/// Boolean properties of an edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeFlags {
    /// Backed by a confirmed sequence overlap.
    pub has_contributing_overlap: bool,
    /// Overlap runs through a repeat.
    pub has_repeat_overlap: bool,
    /// Overlap runs through a tandem repeat (length ambiguous).
    pub has_tandem_overlap: bool,
    /// `id_a`'s sequence contains `id_b`'s.
    pub a_contains_b: bool,
    /// `id_b`'s sequence contains `id_a`'s.
    pub b_contains_a: bool,
    /// Long-range guide link (low confidence).
    pub has_guide: bool,
    /// STS-marker guide link.
    pub has_sts_guide: bool,
    /// Explicitly marked low-confidence.
    pub is_sloppy: bool,
    /// Inferred transitively rather than observed.
    pub is_inferred: bool,
    /// Removed by transitive reduction.
    pub is_transitively_removed: bool,
    /// Participating in the active constraint set.
    pub is_active: bool,
    /// Confirmed by downstream analysis.
    pub is_confirmed: bool,
    /// Unlinked and awaiting recycling.
    pub is_deleted: bool,
}

/// A canonical relationship record between two nodes.
#[derive(Debug, Clone)]
pub struct Edge {
    /// Lower-index endpoint (canonical invariant: `id_a <= id_b`).
    pub id_a: NodeId,
    /// Higher-index endpoint.
    pub id_b: NodeId,
    /// Orientation relative to (id_a, id_b) order.
    pub orient: EdgeOrient,
    /// Estimated gap between the facing ends; negative means overlap.
    pub distance: LengthStat,
    /// Reliability classification.
    pub status: EdgeStatus,
    /// Boolean properties.
    pub flags: EdgeFlags,
    /// Raw observation or merged bundle.
    pub kind: EdgeKind,
}

impl Edge {
    /// Raw mate edge with canonicalization left to the graph layer.
    pub fn raw(
        id_a: NodeId,
        id_b: NodeId,
        orient: EdgeOrient,
        distance: LengthStat,
        link: Option<MateLink>,
    ) -> Self {
        Self {
            id_a,
            id_b,
            orient,
            distance,
            status: EdgeStatus::Unknown,
            flags: EdgeFlags::default(),
            kind: EdgeKind::Raw(link),
        }
    }

    /// The endpoint opposite `node`, or `None` when `node` is not an
    /// endpoint at all.
    pub fn other_end(&self, node: NodeId) -> Option<NodeId> {
        if node == self.id_a {
            Some(self.id_b)
        } else if node == self.id_b {
            Some(self.id_a)
        } else {
            None
        }
    }

    /// Orientation as seen from `node`: stored orientation for `id_a`, the
    /// endpoint swap for `id_b`.
    pub fn orientation_wrt(&self, node: NodeId) -> Option<EdgeOrient> {
        if node == self.id_a {
            Some(self.orient)
        } else if node == self.id_b {
            Some(self.orient.swapped())
        } else {
            None
        }
    }

    /// Which of `node`'s sequence ends this edge attaches to.
    pub fn end_at(&self, node: NodeId) -> Option<SequenceEnd> {
        let wrt = self.orientation_wrt(node)?;
        Some(EdgeOrient::facing_end(wrt.first()))
    }

    /// Number of raw observations folded into this edge. Structural: a raw
    /// edge contributes one, a merged edge as many as it bundles.
    pub fn edges_contributing(&self) -> usize {
        match &self.kind {
            EdgeKind::Raw(_) => 1,
            EdgeKind::Merged(raws) => raws.len(),
        }
    }

    /// Is this a top-level raw (unmerged) edge?
    pub fn is_raw(&self) -> bool {
        matches!(self.kind, EdgeKind::Raw(_))
    }

    /// Overlap-backed relationship of any flavor, containment included.
    pub fn is_overlap_edge(&self) -> bool {
        self.flags.has_contributing_overlap
            || self.flags.has_repeat_overlap
            || self.flags.has_tandem_overlap
            || self.is_containment_edge()
    }

    /// One endpoint's sequence contains the other's.
    pub fn is_containment_edge(&self) -> bool {
        self.flags.a_contains_b || self.flags.b_contains_a
    }

    /// Low-confidence edge: guides, explicit sloppiness, or variance above
    /// `variance_threshold` — unless the edge was inferred (inferred edges
    /// carry deliberately wide variances).
    pub fn is_sloppy_edge(&self, variance_threshold: f64) -> bool {
        !self.flags.is_inferred
            && (self.flags.has_guide
                || self.flags.has_sts_guide
                || self.flags.is_sloppy
                || self.distance.variance > variance_threshold)
    }

    /// Confirmed by at least two independent observations.
    pub fn is_confirmed_edge(&self) -> bool {
        self.edges_contributing() >= 2
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::arena::Arena;
    use crate::graph::node::Node;
    use crate::graph::NodeKind;
    use test_case::test_case;

    fn two_nodes() -> (NodeId, NodeId) {
        let mut arena: Arena<Node> = Arena::new();
        let a = arena.insert(Node::new(NodeKind::Contig, LengthStat::new(100.0, 0.0)));
        let b = arena.insert(Node::new(NodeKind::Contig, LengthStat::new(100.0, 0.0)));
        (a, b)
    }

    #[test_case(EdgeOrient::AbAb)]
    #[test_case(EdgeOrient::AbBa)]
    #[test_case(EdgeOrient::BaAb)]
    #[test_case(EdgeOrient::BaBa)]
    fn orientation_wrt_each_endpoint(orient: EdgeOrient) {
        let (a, b) = two_nodes();
        let edge = Edge::raw(a, b, orient, LengthStat::new(50.0, 25.0), None);
        assert_eq!(edge.orientation_wrt(a), Some(orient));
        assert_eq!(edge.orientation_wrt(b), Some(orient.swapped()));
    }

    #[test]
    fn classifier_predicates() {
        let (a, b) = two_nodes();
        let mut edge = Edge::raw(a, b, EdgeOrient::AbAb, LengthStat::new(-40.0, 9.0), None);
        assert!(!edge.is_overlap_edge());
        edge.flags.a_contains_b = true;
        assert!(edge.is_overlap_edge());
        assert!(edge.is_containment_edge());

        edge.flags.a_contains_b = false;
        edge.flags.has_tandem_overlap = true;
        assert!(edge.is_overlap_edge());
        assert!(!edge.is_containment_edge());
    }

    #[test]
    fn sloppy_from_variance_or_guide() {
        let (a, b) = two_nodes();
        let mut edge = Edge::raw(a, b, EdgeOrient::AbAb, LengthStat::new(0.0, 5.0e6), None);
        assert!(edge.is_sloppy_edge(4.0e6));
        edge.distance.variance = 100.0;
        assert!(!edge.is_sloppy_edge(4.0e6));
        edge.flags.has_guide = true;
        assert!(edge.is_sloppy_edge(4.0e6));
        // Inferred edges are exempt.
        edge.flags.is_inferred = true;
        assert!(!edge.is_sloppy_edge(4.0e6));
    }

    #[test]
    fn status_mask_filtering() {
        assert!(StatusMask::ALL.admits(EdgeStatus::Invalid));
        assert!(StatusMask::TRUSTED.admits(EdgeStatus::Trusted));
        assert!(!StatusMask::TRUSTED.admits(EdgeStatus::Untrusted));
        assert!(StatusMask::INTERNAL.admits(EdgeStatus::TentativeUntrusted));
        assert!(!StatusMask::INTERNAL.admits(EdgeStatus::InterScaffold));
    }
}
