//! Graph storage: arenas, nodes, edges, orientation, and traversal.
//!
//! Nodes (contigs, unitigs, scaffolds) and edges (overlap or consolidated
//! mate-pair relationships) live in generational arenas, reference each
//! other only by id, and are mutated exclusively through the
//! [`ScaffoldGraph`] context object.

mod arena;
mod edge;
mod iter;
mod node;
mod orient;
mod stats;
mod store;

pub use arena::{Arena, SlotId};
pub use edge::{Edge, EdgeFlags, EdgeKind, EdgeStatus, MateLink, StatusMask};
pub use iter::EdgeIterator;
pub use node::{EdgeId, Node, NodeFlags, NodeId, NodeKind, ScaffoldStats};
pub use orient::{EdgeOrient, EndSelector, NodeDirection, SequenceEnd};
pub use stats::{LengthStat, MIN_COMBINE_VARIANCE};
pub use store::{GraphError, Placement, ScaffoldGraph};
