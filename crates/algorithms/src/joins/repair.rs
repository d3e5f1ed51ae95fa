//! Structural edits that keep the join table connected

use super::id_set;
use rivernet_core::{BarrierJoinTable, Join, JoinTable, JoinType, SegmentId, NO_SEGMENT};
use std::collections::{HashMap, HashSet};

/// Remove every join referencing `ids`, repairing the neighbors first.
///
/// A neighbor whose *only* connection on one side goes to removed segments
/// keeps a join to the zero sentinel on that side instead: an upstream
/// neighbor becomes an outlet (`terminal`), a downstream neighbor becomes a
/// headwater (`origin`). Neighbors with other connections simply lose the
/// join.
///
/// Idempotent: removing the same ids again returns an identical table.
pub fn remove_joins(joins: &JoinTable, ids: &[SegmentId]) -> JoinTable {
    let ids = id_set(ids);
    if ids.is_empty() {
        return joins.clone();
    }

    // Upstream neighbors that drain into a removed segment ...
    let upstreams: HashSet<SegmentId> = joins
        .iter()
        .filter(|j| {
            ids.contains(&j.downstream_id)
                && j.upstream_id != NO_SEGMENT
                && !ids.contains(&j.upstream_id)
        })
        .map(|j| j.upstream_id)
        .collect();
    // ... and those of them that still drain somewhere else.
    let upstreams_with_other: HashSet<SegmentId> = joins
        .iter()
        .filter(|j| upstreams.contains(&j.upstream_id) && !ids.contains(&j.downstream_id))
        .map(|j| j.upstream_id)
        .collect();

    let downstreams: HashSet<SegmentId> = joins
        .iter()
        .filter(|j| {
            ids.contains(&j.upstream_id)
                && j.downstream_id != NO_SEGMENT
                && !ids.contains(&j.downstream_id)
        })
        .map(|j| j.downstream_id)
        .collect();
    let downstreams_with_other: HashSet<SegmentId> = joins
        .iter()
        .filter(|j| downstreams.contains(&j.downstream_id) && !ids.contains(&j.upstream_id))
        .map(|j| j.downstream_id)
        .collect();

    joins
        .iter()
        .filter_map(|j| {
            if !j.touches_any(&ids) {
                return Some(*j);
            }
            if ids.contains(&j.downstream_id)
                && upstreams.contains(&j.upstream_id)
                && !upstreams_with_other.contains(&j.upstream_id)
            {
                return Some(Join {
                    downstream: 0,
                    downstream_id: NO_SEGMENT,
                    kind: JoinType::Terminal,
                    junction: false,
                    ..*j
                });
            }
            if ids.contains(&j.upstream_id)
                && downstreams.contains(&j.downstream_id)
                && !downstreams_with_other.contains(&j.downstream_id)
            {
                return Some(Join {
                    upstream: 0,
                    upstream_id: NO_SEGMENT,
                    kind: JoinType::Origin,
                    junction: false,
                    ..*j
                });
            }
            None
        })
        .collect()
}

/// Point joins at replacement segments.
///
/// `new_downstreams` rewrites `downstream_id` fields (references to a
/// segment from upstream), `new_upstreams` rewrites `upstream_id` fields.
/// After a cut, a parent maps to its most upstream child in the first map
/// and to its most downstream child in the second. Permanent ids are kept.
pub fn update_joins(
    joins: &JoinTable,
    new_downstreams: &HashMap<SegmentId, SegmentId>,
    new_upstreams: &HashMap<SegmentId, SegmentId>,
) -> JoinTable {
    if new_downstreams.is_empty() && new_upstreams.is_empty() {
        return joins.clone();
    }
    joins
        .iter()
        .map(|j| {
            let mut j = *j;
            if let Some(&id) = new_downstreams.get(&j.downstream_id) {
                j.downstream_id = id;
            }
            if let Some(&id) = new_upstreams.get(&j.upstream_id) {
                j.upstream_id = id;
            }
            j
        })
        .collect()
}

/// Point barrier rows at replacement segments, mapping ids as [`update_joins`] does.
pub fn update_barrier_joins(
    rows: &BarrierJoinTable,
    new_downstreams: &HashMap<SegmentId, SegmentId>,
    new_upstreams: &HashMap<SegmentId, SegmentId>,
) -> BarrierJoinTable {
    if new_downstreams.is_empty() && new_upstreams.is_empty() {
        return rows.clone();
    }
    let rows = rows
        .iter()
        .map(|r| {
            let mut r = *r;
            if let Some(&id) = new_downstreams.get(&r.downstream_id) {
                r.downstream_id = id;
            }
            if let Some(&id) = new_upstreams.get(&r.upstream_id) {
                r.upstream_id = id;
            }
            r
        })
        .collect();
    BarrierJoinTable::from_rows(rows)
}

/// Drop barrier rows that reference any of `ids`.
pub fn remove_barrier_joins(rows: &BarrierJoinTable, ids: &[SegmentId]) -> BarrierJoinTable {
    let ids = id_set(ids);
    if ids.is_empty() {
        return rows.clone();
    }
    let kept = rows
        .iter()
        .filter(|r| !ids.contains(&r.upstream_id) && !ids.contains(&r.downstream_id))
        .copied()
        .collect();
    BarrierJoinTable::from_rows(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivernet_core::BarrierJoin;

    fn keys(table: &JoinTable) -> Vec<(SegmentId, SegmentId, JoinType)> {
        let mut k: Vec<_> = table
            .iter()
            .map(|j| (j.upstream_id, j.downstream_id, j.kind))
            .collect();
        k.sort_unstable();
        k
    }

    /// 0 -> 1 -> 2 -> 3 -> 0 with a tributary 0 -> 5 -> 2
    fn chain() -> JoinTable {
        JoinTable::from_joins(vec![
            Join::new(0, 1, JoinType::Origin),
            Join::new(1, 2, JoinType::Internal),
            Join::new(0, 5, JoinType::Origin),
            Join::new(5, 2, JoinType::Internal),
            Join::new(2, 3, JoinType::Internal),
            Join::new(3, 0, JoinType::Terminal),
        ])
    }

    #[test]
    fn test_remove_middle_segment_repairs_both_sides() {
        let out = remove_joins(&chain(), &[2]);
        assert_eq!(
            keys(&out),
            vec![
                (0, 1, JoinType::Origin),
                (0, 3, JoinType::Origin),
                (0, 5, JoinType::Origin),
                (1, 0, JoinType::Terminal),
                (3, 0, JoinType::Terminal),
                (5, 0, JoinType::Terminal),
            ]
        );
    }

    #[test]
    fn test_remove_keeps_other_connections() {
        // 1 drains into both 2 and 4; removing 2 leaves 1 -> 4 alone
        let joins = JoinTable::from_joins(vec![
            Join::new(1, 2, JoinType::Internal),
            Join::new(1, 4, JoinType::Internal),
            Join::new(2, 0, JoinType::Terminal),
            Join::new(4, 0, JoinType::Terminal),
        ]);
        let out = remove_joins(&joins, &[2]);
        assert_eq!(
            keys(&out),
            vec![(1, 4, JoinType::Internal), (4, 0, JoinType::Terminal)]
        );
    }

    #[test]
    fn test_remove_is_idempotent() {
        let once = remove_joins(&chain(), &[2, 5]);
        let twice = remove_joins(&once, &[2, 5]);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_remove_empty_is_noop() {
        assert_eq!(remove_joins(&chain(), &[]), chain());
        assert_eq!(remove_joins(&chain(), &[0]), chain());
    }

    #[test]
    fn test_update_joins() {
        // 2 was cut into 20 (upstream part) .. 22 (downstream part)
        let out = update_joins(
            &chain(),
            &HashMap::from([(2, 20)]),
            &HashMap::from([(2, 22)]),
        );
        let k = keys(&out);
        assert!(k.contains(&(1, 20, JoinType::Internal)));
        assert!(k.contains(&(5, 20, JoinType::Internal)));
        assert!(k.contains(&(22, 3, JoinType::Internal)));
        assert!(!k.iter().any(|&(u, d, _)| u == 2 || d == 2));
    }

    #[test]
    fn test_update_then_remove_leaves_no_dangling_refs() {
        let updated = update_joins(
            &chain(),
            &HashMap::from([(2, 20)]),
            &HashMap::from([(2, 22)]),
        )
        .concat([Join::new(20, 22, JoinType::Internal)]);
        let out = remove_joins(&updated, &[2]);
        assert_eq!(out, updated, "nothing references the replaced id anymore");
    }

    #[test]
    fn test_update_barrier_joins() {
        let rows = BarrierJoinTable::from_rows(vec![
            BarrierJoin::new(1, 1, 2, JoinType::Internal),
            BarrierJoin::new(2, 2, 3, JoinType::Internal),
            BarrierJoin::new(3, 0, 1, JoinType::Origin),
        ]);
        let out = update_barrier_joins(&rows, &HashMap::from([(2, 20)]), &HashMap::from([(2, 22)]));
        let pairs: Vec<_> = out.iter().map(|r| (r.barrier_id, r.upstream_id, r.downstream_id)).collect();
        assert_eq!(pairs, vec![(1, 1, 20), (2, 22, 3), (3, 0, 1)]);
    }

    #[test]
    fn test_remove_barrier_joins() {
        let rows = BarrierJoinTable::from_rows(vec![
            BarrierJoin::new(1, 1, 2, JoinType::Internal),
            BarrierJoin::new(2, 2, 3, JoinType::Internal),
            BarrierJoin::new(3, 0, 1, JoinType::Origin),
        ]);
        let out = remove_barrier_joins(&rows, &[2, 0]);
        assert_eq!(out.iter().map(|r| r.barrier_id).collect::<Vec<_>>(), vec![3]);
        assert_eq!(remove_barrier_joins(&rows, &[]), rows);
    }
}
