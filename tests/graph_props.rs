//! Property tests for orientation algebra, edge canonicalization, and the
//! distance statistics.

use proptest::prelude::*;
use scafgraph::{
    EdgeOrient, LengthStat, NodeDirection, NodeKind, ScaffoldGraph,
};

fn any_orient() -> impl Strategy<Value = EdgeOrient> {
    prop_oneof![
        Just(EdgeOrient::AbAb),
        Just(EdgeOrient::AbBa),
        Just(EdgeOrient::BaAb),
        Just(EdgeOrient::BaBa),
    ]
}

fn any_direction() -> impl Strategy<Value = NodeDirection> {
    prop_oneof![Just(NodeDirection::Forward), Just(NodeDirection::Reversed)]
}

proptest! {
    #[test]
    fn orientation_swap_is_an_involution(orient in any_orient()) {
        prop_assert_eq!(orient.swapped().swapped(), orient);
    }

    #[test]
    fn swap_commutes_with_direction_flips(
        first in any_direction(),
        second in any_direction(),
    ) {
        let orient = EdgeOrient::from_directions(first, second);
        prop_assert_eq!(
            orient.swapped(),
            EdgeOrient::from_directions(second.flipped(), first.flipped())
        );
    }

    #[test]
    fn raw_edges_are_always_canonical(
        orient in any_orient(),
        reversed in any::<bool>(),
        mean in -2000.0f64..20_000.0,
        variance in 1.0f64..1.0e6,
    ) {
        let mut graph = ScaffoldGraph::new();
        let a = graph.add_node(NodeKind::Contig, LengthStat::new(1000.0, 0.0));
        let b = graph.add_node(NodeKind::Contig, LengthStat::new(2000.0, 0.0));
        let (from, to) = if reversed { (b, a) } else { (a, b) };

        let edge_id = graph
            .add_raw_edge(from, to, orient, LengthStat::new(mean, variance), None)
            .unwrap();
        let edge = graph.edge(edge_id).unwrap();

        prop_assert_eq!(edge.id_a, a);
        prop_assert_eq!(edge.id_b, b);
        // The stored orientation reads correctly from both endpoints.
        prop_assert_eq!(edge.orientation_wrt(a), Some(edge.orient));
        prop_assert_eq!(edge.orientation_wrt(b), Some(edge.orient.swapped()));
        // Reading from the non-canonical side recovers the caller's view.
        let wrt_from = edge.orientation_wrt(from).unwrap();
        prop_assert_eq!(wrt_from, orient);
        prop_assert!(graph.is_linked(edge_id, a).unwrap());
        prop_assert!(graph.is_linked(edge_id, b).unwrap());
    }

    #[test]
    fn chi_squared_is_symmetric(
        m1 in -5000.0f64..5000.0,
        m2 in -5000.0f64..5000.0,
        v1 in 1.0f64..1.0e6,
        v2 in 1.0f64..1.0e6,
    ) {
        let a = LengthStat::new(m1, v1);
        let b = LengthStat::new(m2, v2);
        prop_assert_eq!(a.chi_squared(&b), b.chi_squared(&a));
    }

    #[test]
    fn combined_stat_tightens_the_estimate(
        m1 in -5000.0f64..5000.0,
        m2 in -5000.0f64..5000.0,
        v1 in 1.0f64..1.0e6,
        v2 in 1.0f64..1.0e6,
    ) {
        let combined = LengthStat::new(m1, v1).combine(&LengthStat::new(m2, v2));
        prop_assert!(combined.mean >= m1.min(m2) - 1e-9);
        prop_assert!(combined.mean <= m1.max(m2) + 1e-9);
        prop_assert!(combined.variance <= v1.min(v2) + 1e-9);
    }
}
