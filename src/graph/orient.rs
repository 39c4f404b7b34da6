//! Relative orientation of an edge's two endpoints
//!
//! An edge between contigs (A, B) records how each contig is traversed when
//! walking across the relationship left to right: `AbAb` means both are
//! traversed A-end to B-end, `AbBa` means the second is reversed, and so on.
//! The same physical relationship read with the endpoints swapped reverses
//! the walk, so both directions flip: `AbAb` ↔ `BaBa`, while `AbBa` and
//! `BaAb` are their own mirror images.

use std::fmt;

/// Direction a contig is traversed within an edge relationship.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub enum NodeDirection {
    /// A-end first.
    Forward,
    /// B-end first.
    Reversed,
}

impl NodeDirection {
    /// Opposite direction.
    pub fn flipped(self) -> Self {
        match self {
            NodeDirection::Forward => NodeDirection::Reversed,
            NodeDirection::Reversed => NodeDirection::Forward,
        }
    }
}

/// Four-way relative orientation of a canonical edge, stored with respect to
/// the edge's (id_a, id_b) endpoint order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub enum EdgeOrient {
    /// Both endpoints forward (first's B end faces second's A end).
    AbAb,
    /// First forward, second reversed (B ends face each other).
    AbBa,
    /// First reversed, second forward (A ends face each other).
    BaAb,
    /// Both reversed.
    BaBa,
}

impl EdgeOrient {
    /// All four orientations, in storage order.
    pub const ALL: [EdgeOrient; 4] = [
        EdgeOrient::AbAb,
        EdgeOrient::AbBa,
        EdgeOrient::BaAb,
        EdgeOrient::BaBa,
    ];

    /// Build from the two endpoint traversal directions, first endpoint
    /// direction first.
    pub fn from_directions(first: NodeDirection, second: NodeDirection) -> Self {
        match (first, second) {
            (NodeDirection::Forward, NodeDirection::Forward) => EdgeOrient::AbAb,
            (NodeDirection::Forward, NodeDirection::Reversed) => EdgeOrient::AbBa,
            (NodeDirection::Reversed, NodeDirection::Forward) => EdgeOrient::BaAb,
            (NodeDirection::Reversed, NodeDirection::Reversed) => EdgeOrient::BaBa,
        }
    }

    /// Traversal direction of the first endpoint.
    pub fn first(self) -> NodeDirection {
        match self {
            EdgeOrient::AbAb | EdgeOrient::AbBa => NodeDirection::Forward,
            EdgeOrient::BaAb | EdgeOrient::BaBa => NodeDirection::Reversed,
        }
    }

    /// Traversal direction of the second endpoint.
    pub fn second(self) -> NodeDirection {
        match self {
            EdgeOrient::AbAb | EdgeOrient::BaAb => NodeDirection::Forward,
            EdgeOrient::AbBa | EdgeOrient::BaBa => NodeDirection::Reversed,
        }
    }

    /// The same physical relationship with the endpoints listed in the
    /// opposite order. Applied when canonicalizing an edge whose ids arrive
    /// swapped, and when reading an edge's orientation with respect to its
    /// second endpoint. An involution.
    pub fn swapped(self) -> Self {
        EdgeOrient::from_directions(self.second().flipped(), self.first().flipped())
    }

    /// End of the given endpoint that faces into the relationship (the gap):
    /// a forward-traversed contig contributes its B end.
    pub fn facing_end(direction: NodeDirection) -> SequenceEnd {
        match direction {
            NodeDirection::Forward => SequenceEnd::B,
            NodeDirection::Reversed => SequenceEnd::A,
        }
    }
}

impl fmt::Display for EdgeOrient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EdgeOrient::AbAb => "AB_AB",
            EdgeOrient::AbBa => "AB_BA",
            EdgeOrient::BaAb => "BA_AB",
            EdgeOrient::BaBa => "BA_BA",
        };
        f.write_str(s)
    }
}

/// One of a contig's two sequence ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SequenceEnd {
    /// The A (left, in native coordinates) end.
    A,
    /// The B (right) end.
    B,
}

/// Which of a node's ends an edge query should consider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndSelector {
    /// Only edges attached at the A end.
    AEnd,
    /// Only edges attached at the B end.
    BEnd,
    /// Edges at either end.
    All,
}

impl EndSelector {
    /// Does this selector admit an edge attached at `end`?
    pub fn admits(self, end: SequenceEnd) -> bool {
        match self {
            EndSelector::AEnd => end == SequenceEnd::A,
            EndSelector::BEnd => end == SequenceEnd::B,
            EndSelector::All => true,
        }
    }
}
