//! Cross-partition boundaries
//!
//! A flowline crossing from partition A into partition B appears twice: as a
//! `huc_out` join in A (local upstream segment, downstream id 0) and as a
//! `huc_in` join in B (upstream id 0, local downstream segment). Both carry
//! the permanent ids of the two segments, which is what ties them together
//! once the partitions are combined.

use rivernet_core::io::PartitionTables;
use rivernet_core::{Join, JoinTable, JoinType, PermanentId, Result, SegmentId, NO_SEGMENT};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

fn is_open_in(j: &Join) -> bool {
    j.kind == JoinType::HucIn && j.upstream_id == NO_SEGMENT
}

fn is_open_out(j: &Join) -> bool {
    j.kind == JoinType::HucOut && j.downstream_id == NO_SEGMENT
}

/// Resolve `huc_in` joins against matching `huc_out` joins in the same table.
///
/// A match sets the upstream id of the `huc_in` row, turns it into an
/// internal join and drops the `huc_out` row. Unmatched rows of either kind
/// stay as boundary sentinels.
pub fn reconcile_boundaries(joins: &JoinTable) -> JoinTable {
    let outs: HashMap<(PermanentId, PermanentId), &Join> = joins
        .iter()
        .filter(|j| is_open_out(j))
        .map(|j| ((j.upstream, j.downstream), j))
        .collect();
    if outs.is_empty() {
        return joins.clone();
    }

    let mut resolved: HashSet<(SegmentId, PermanentId)> = HashSet::new();
    let rewired: Vec<Join> = joins
        .iter()
        .map(|j| {
            if !is_open_in(j) {
                return *j;
            }
            match outs.get(&(j.upstream, j.downstream)) {
                Some(out) => {
                    resolved.insert((out.upstream_id, out.downstream));
                    Join {
                        upstream_id: out.upstream_id,
                        kind: JoinType::Internal,
                        ..*j
                    }
                }
                None => *j,
            }
        })
        .collect();

    debug!(resolved = resolved.len(), open_out = outs.len(), "matched boundary joins");

    rewired
        .into_iter()
        .filter(|j| !(is_open_out(j) && resolved.contains(&(j.upstream_id, j.downstream))))
        .collect()
}

/// Combine partitions into one table set and resolve their shared boundaries.
///
/// Segment ids must be disjoint across partitions, which per-partition id
/// ranges guarantee.
pub fn merge_partitions(parts: impl IntoIterator<Item = PartitionTables>) -> Result<PartitionTables> {
    let mut merged = PartitionTables::default();
    let mut count = 0;
    for part in parts {
        merged.segments = merged.segments.concat(part.segments)?;
        merged.retired = merged.retired.concat(part.retired)?;
        merged.joins = merged.joins.concat(part.joins);
        merged.barrier_joins = merged.barrier_joins.concat(part.barrier_joins);
        count += 1;
    }

    merged.joins = reconcile_boundaries(&merged.joins);
    let open = merged.joins.iter().filter(|j| is_open_in(j) || is_open_out(j)).count();
    info!(
        partitions = count,
        segments = merged.segments.len(),
        joins = merged.joins.len(),
        open_boundaries = open,
        "merged partitions"
    );
    Ok(merged)
}
