//! Join table operations
//!
//! Lookup by neighborhood, integrity-preserving removal and id remapping.
//! Every operation takes a table by reference and returns a new one.
//!
//! The zero sentinel is never treated as a segment id and empty id sets are
//! no-ops.

mod repair;

pub use repair::{remove_barrier_joins, remove_joins, update_barrier_joins, update_joins};

use rivernet_core::{JoinTable, SegmentId, NO_SEGMENT};
use std::collections::{HashMap, HashSet};

fn id_set(ids: &[SegmentId]) -> HashSet<SegmentId> {
    ids.iter().copied().filter(|&id| id != NO_SEGMENT).collect()
}

/// Joins touching `ids`.
///
/// With `expand > 0` the id set is widened that many times by the other end
/// of every matched join before selecting.
pub fn find_joins(joins: &JoinTable, ids: &[SegmentId], expand: usize) -> JoinTable {
    let mut matched = id_set(ids);
    if matched.is_empty() {
        return JoinTable::new();
    }

    for _ in 0..expand {
        let before = matched.len();
        let neighbors: Vec<SegmentId> = joins
            .iter()
            .filter(|j| j.touches_any(&matched))
            .flat_map(|j| [j.upstream_id, j.downstream_id])
            .filter(|&id| id != NO_SEGMENT)
            .collect();
        matched.extend(neighbors);
        if matched.len() == before {
            break;
        }
    }

    joins.filter(|j| j.touches_any(&matched))
}

/// Neighbors of a segment that has exactly one upstream and one downstream join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunIndex {
    pub segment_id: SegmentId,
    pub upstream_id: SegmentId,
    pub downstream_id: SegmentId,
}

impl RunIndex {
    /// A single-segment run connected to nothing on either end.
    pub fn is_isolated(&self) -> bool {
        self.upstream_id == NO_SEGMENT && self.downstream_id == NO_SEGMENT
    }
}

/// Index segments that form single-segment runs: one join on each end.
///
/// Entries whose neighbors are both the zero sentinel are isolated segments
/// (for example a standalone pipeline). Sorted by segment id.
pub fn index_joins(joins: &JoinTable) -> Vec<RunIndex> {
    #[derive(Default)]
    struct Ends {
        upstream_count: u32,
        upstream_id: SegmentId,
        downstream_count: u32,
        downstream_id: SegmentId,
    }

    let mut ends: HashMap<SegmentId, Ends> = HashMap::new();
    for j in joins.iter() {
        if j.downstream_id != NO_SEGMENT {
            let e = ends.entry(j.downstream_id).or_default();
            e.upstream_count += 1;
            e.upstream_id = j.upstream_id;
        }
        if j.upstream_id != NO_SEGMENT {
            let e = ends.entry(j.upstream_id).or_default();
            e.downstream_count += 1;
            e.downstream_id = j.downstream_id;
        }
    }

    let mut index: Vec<RunIndex> = ends
        .into_iter()
        .filter(|(_, e)| e.upstream_count == 1 && e.downstream_count == 1)
        .map(|(segment_id, e)| RunIndex {
            segment_id,
            upstream_id: e.upstream_id,
            downstream_id: e.downstream_id,
        })
        .collect();
    index.sort_unstable_by_key(|r| r.segment_id);
    index
}

/// Segments whose downstream neighbor never appears as an upstream end of
/// any join: the last segment before flow leaves the table.
pub fn find_downstream_terminals(joins: &JoinTable) -> Vec<SegmentId> {
    let upstreams: HashSet<SegmentId> = joins.iter().map(|j| j.upstream_id).collect();
    let mut terminals: Vec<SegmentId> = joins
        .iter()
        .filter(|j| {
            j.upstream_id != NO_SEGMENT
                && j.downstream_id != NO_SEGMENT
                && !upstreams.contains(&j.downstream_id)
        })
        .map(|j| j.upstream_id)
        .collect();
    terminals.sort_unstable();
    terminals.dedup();
    terminals
}

/// Segments with a join to the zero sentinel on their downstream end.
pub fn outlets(joins: &JoinTable) -> Vec<SegmentId> {
    let mut ids: Vec<SegmentId> = joins
        .iter()
        .filter(|j| j.downstream_id == NO_SEGMENT && j.upstream_id != NO_SEGMENT)
        .map(|j| j.upstream_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivernet_core::{Join, JoinType};

    /// 0 -> 1 -> 2 -> 3 -> 0, 0 -> 4 -> 2, isolated 0 -> 9 -> 0
    fn network() -> JoinTable {
        JoinTable::from_joins(vec![
            Join::new(0, 1, JoinType::Origin),
            Join::new(1, 2, JoinType::Internal),
            Join::new(0, 4, JoinType::Origin),
            Join::new(4, 2, JoinType::Internal),
            Join::new(2, 3, JoinType::Internal),
            Join::new(3, 0, JoinType::Terminal),
            Join::new(0, 9, JoinType::Origin),
            Join::new(9, 0, JoinType::Terminal),
        ])
    }

    fn keys(table: &JoinTable) -> Vec<(SegmentId, SegmentId)> {
        let mut k: Vec<_> = table.iter().map(|j| j.key()).collect();
        k.sort_unstable();
        k
    }

    #[test]
    fn test_find_joins() {
        let found = find_joins(&network(), &[1], 0);
        assert_eq!(keys(&found), vec![(0, 1), (1, 2)]);
    }

    #[test]
    fn test_find_joins_expand() {
        let found = find_joins(&network(), &[1], 1);
        // widened to {1, 2}; never through the sentinel to 4 or 9
        assert_eq!(keys(&found), vec![(0, 1), (1, 2), (2, 3), (4, 2)]);
    }

    #[test]
    fn test_find_joins_empty_and_sentinel() {
        assert!(find_joins(&network(), &[], 3).is_empty());
        assert!(find_joins(&network(), &[0], 3).is_empty());
    }

    #[test]
    fn test_index_joins() {
        let index = index_joins(&network());
        let ids: Vec<_> = index.iter().map(|r| r.segment_id).collect();
        // 2 has two upstream joins
        assert_eq!(ids, vec![1, 3, 4, 9]);
        let nine = index.iter().find(|r| r.segment_id == 9).unwrap();
        assert!(nine.is_isolated());
        let three = index.iter().find(|r| r.segment_id == 3).unwrap();
        assert_eq!((three.upstream_id, three.downstream_id), (2, 0));
        assert!(!three.is_isolated());
    }

    #[test]
    fn test_find_downstream_terminals() {
        // 3 flows into 7, which never appears upstream (lives in another table)
        let joins = JoinTable::from_joins(vec![
            Join::new(1, 3, JoinType::Internal),
            Join::new(3, 7, JoinType::HucOut),
            Join::new(2, 0, JoinType::Terminal),
        ]);
        assert_eq!(find_downstream_terminals(&joins), vec![3]);
        assert!(find_downstream_terminals(&network()).is_empty());
    }

    #[test]
    fn test_outlets() {
        assert_eq!(outlets(&network()), vec![3, 9]);
    }
}
