//! Scaffold output records
//!
//! The persisted scaffold shape consumed by downstream serialization: an
//! ordered run of oriented contigs with offset estimates, plus the
//! scaffold-level fit aggregates.

use crate::graph::{GraphError, LengthStat, NodeDirection, NodeId, ScaffoldGraph};

/// One contig row of a scaffold record.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ScaffoldRow {
    /// The contig.
    #[cfg_attr(feature = "visualize", serde(skip))]
    pub contig: NodeId,
    /// Placement direction within the scaffold.
    pub direction: NodeDirection,
    /// Mean scaffold coordinate of the contig's lower end.
    pub offset_mean: f64,
    /// Variance of that coordinate.
    pub offset_variance: f64,
}

/// Ordered scaffold output with aggregates.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ScaffoldRecord {
    /// Contig rows in chain order.
    pub rows: Vec<ScaffoldRow>,
    /// Scaffold span estimate.
    pub bp_length: LengthStat,
    /// Residual chi-squared of the last gap solve.
    pub least_square_error: f64,
    /// Clones used by the last gap solve.
    pub num_least_square_clones: usize,
}

/// Emit the output record for one scaffold.
pub fn scaffold_record(
    graph: &ScaffoldGraph,
    scaffold_id: NodeId,
) -> Result<ScaffoldRecord, GraphError> {
    let contigs = graph.scaffold_contigs(scaffold_id)?;
    let mut rows = Vec::with_capacity(contigs.len());
    for contig in contigs {
        let node = graph.node(contig)?;
        rows.push(ScaffoldRow {
            contig,
            direction: node.placed_direction(),
            offset_mean: node.left_offset().mean,
            offset_variance: node.left_offset().variance,
        });
    }
    let scaffold = graph.node(scaffold_id)?;
    Ok(ScaffoldRecord {
        rows,
        bp_length: scaffold.bp_length,
        least_square_error: scaffold.stats.least_square_error,
        num_least_square_clones: scaffold.stats.num_least_square_clones,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::{NodeKind, Placement};

    #[test]
    fn record_preserves_chain_order_and_aggregates() {
        let mut graph = ScaffoldGraph::new();
        let a = graph.add_node(NodeKind::Contig, LengthStat::new(1000.0, 0.0));
        let b = graph.add_node(NodeKind::Contig, LengthStat::new(2000.0, 0.0));
        let scaffold = graph
            .build_scaffold(&[
                Placement {
                    contig: a,
                    a_end: LengthStat::zero(),
                    b_end: LengthStat::new(1000.0, 0.0),
                },
                Placement {
                    contig: b,
                    a_end: LengthStat::new(3500.0, 120.0),
                    b_end: LengthStat::new(1500.0, 100.0),
                },
            ])
            .unwrap();
        graph.node_mut(scaffold).unwrap().stats.least_square_error = 0.5;
        graph.node_mut(scaffold).unwrap().stats.num_least_square_clones = 4;

        let record = scaffold_record(&graph, scaffold).unwrap();
        assert_eq!(record.rows.len(), 2);
        assert_eq!(record.rows[0].contig, a);
        assert_eq!(record.rows[1].contig, b);
        assert_eq!(record.rows[1].direction, NodeDirection::Reversed);
        assert_eq!(record.rows[1].offset_mean, 1500.0);
        assert_eq!(record.least_square_error, 0.5);
        assert_eq!(record.num_least_square_clones, 4);
    }
}
