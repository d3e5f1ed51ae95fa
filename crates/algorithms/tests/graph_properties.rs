//! Property tests for graph traversals and join repair

use proptest::prelude::*;
use rivernet_algorithms::graph::DirectedGraph;
use rivernet_algorithms::joins::{remove_joins, update_joins};
use rivernet_core::{Join, JoinTable, JoinType, SegmentId};
use std::collections::{BTreeSet, HashMap, HashSet};

fn edges() -> impl Strategy<Value = Vec<(SegmentId, SegmentId)>> {
    prop::collection::vec((1u32..40, 1u32..40), 0..80)
}

fn join_table(edges: &[(SegmentId, SegmentId)]) -> JoinTable {
    edges
        .iter()
        .map(|&(u, d)| Join::new(u, d, JoinType::Internal))
        .collect()
}

proptest! {
    #[test]
    fn components_partition_nodes(edges in edges()) {
        let (sources, targets): (Vec<_>, Vec<_>) = edges.iter().copied().unzip();
        let graph = DirectedGraph::new(&sources, &targets).unwrap();

        let components = graph.components();
        let mut seen = HashSet::new();
        for c in &components {
            for id in c {
                prop_assert!(seen.insert(*id), "node {} in two components", id);
            }
        }
        let expected: HashSet<SegmentId> = graph.nodes().iter().copied().collect();
        prop_assert_eq!(seen, expected);
    }

    #[test]
    fn descendants_are_closed_under_targets(edges in edges(), node in 1u32..40) {
        let (sources, targets): (Vec<_>, Vec<_>) = edges.iter().copied().unzip();
        let graph = DirectedGraph::new(&sources, &targets).unwrap();

        let direct: Vec<SegmentId> = graph.targets(node).collect();
        let mut expected: BTreeSet<SegmentId> = direct.iter().copied().collect();
        for d in graph.descendants(&direct) {
            expected.extend(d);
        }
        let actual: BTreeSet<SegmentId> = graph.descendants(&[node])[0].iter().copied().collect();
        prop_assert_eq!(actual, expected);
    }

    #[test]
    fn reachability_agrees_with_descendants(edges in edges(), a in 1u32..40, b in 1u32..40) {
        let (sources, targets): (Vec<_>, Vec<_>) = edges.iter().copied().unzip();
        let graph = DirectedGraph::new(&sources, &targets).unwrap();
        let reachable = graph.is_reachable(&[a], &[b], None).unwrap()[0];
        prop_assert_eq!(reachable, graph.descendants(&[a])[0].contains(&b));
    }

    #[test]
    fn remove_joins_is_idempotent(edges in edges(), ids in prop::collection::vec(1u32..40, 0..6)) {
        let joins = join_table(&edges);
        let once = remove_joins(&joins, &ids);
        let twice = remove_joins(&once, &ids);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn update_then_remove_leaves_no_stale_ids(edges in edges(), replaced in prop::collection::vec(1u32..40, 1..6)) {
        let joins = join_table(&edges);
        let new_downstreams: HashMap<SegmentId, SegmentId> =
            replaced.iter().map(|&id| (id, id + 1000)).collect();
        let new_upstreams: HashMap<SegmentId, SegmentId> =
            replaced.iter().map(|&id| (id, id + 2000)).collect();

        let updated = update_joins(&joins, &new_downstreams, &new_upstreams);
        let cleaned = remove_joins(&updated, &replaced);
        for j in cleaned.iter() {
            prop_assert!(!replaced.contains(&j.upstream_id));
            prop_assert!(!replaced.contains(&j.downstream_id));
        }
    }
}
