//! Checkpoint validation after bulk structural edits
//!
//! Each check returns an integrity error on the first violation so that a
//! corrupted table never reaches serialized output.

use crate::cut::CutResult;
use crate::network::Networks;
use rivernet_core::{Error, JoinTable, Result, Segment, SegmentId, SegmentTable, NO_SEGMENT};
use std::collections::HashMap;

/// Relative tolerance for comparing child and parent lengths.
pub const LENGTH_TOLERANCE: f64 = 1e-6;

/// Every nonzero segment id referenced by a join must exist, except the far
/// end of a partition boundary join.
pub fn validate_joins(segments: &SegmentTable, joins: &JoinTable) -> Result<()> {
    for j in joins.iter() {
        for id in [j.upstream_id, j.downstream_id] {
            if id != NO_SEGMENT && !segments.contains(id) && !j.is_boundary() {
                return Err(Error::DanglingJoin {
                    upstream_id: j.upstream_id,
                    downstream_id: j.downstream_id,
                    missing: id,
                });
            }
        }
    }
    Ok(())
}

/// Children of a cut must add up to the parent's length.
pub fn validate_children(parent: &Segment, children: &[Segment]) -> Result<()> {
    let total: f64 = children.iter().map(|c| c.length).sum();
    let scale = parent.length.abs().max(f64::MIN_POSITIVE);
    if (total - parent.length).abs() / scale > LENGTH_TOLERANCE {
        return Err(Error::LengthNotPreserved {
            segment_id: parent.id,
            parent_length: parent.length,
            children_length: total,
        });
    }
    Ok(())
}

/// Check a cut: joins resolve, no barrier row points at a retired parent and
/// every retired parent is covered by children of matching total length.
pub fn validate_cut(result: &CutResult) -> Result<()> {
    validate_joins(&result.segments, &result.joins)?;
    for r in result.barrier_joins.iter() {
        for id in [r.upstream_id, r.downstream_id] {
            if id != NO_SEGMENT && result.retired.contains(id) {
                return Err(Error::DanglingJoin {
                    upstream_id: r.upstream_id,
                    downstream_id: r.downstream_id,
                    missing: id,
                });
            }
        }
    }

    let mut children: HashMap<SegmentId, Vec<Segment>> = HashMap::new();
    for s in result.segments.iter() {
        if let Some(parent) = s.parent_id.filter(|&p| result.retired.contains(p)) {
            children.entry(parent).or_default().push(s.clone());
        }
    }
    for parent in result.retired.iter() {
        let pieces = children.get(&parent.id).map(Vec::as_slice).unwrap_or(&[]);
        validate_children(parent, pieces)?;
    }
    Ok(())
}

/// No segment in two networks and every live non-loop segment in one.
pub fn validate_networks(networks: &Networks, segments: &SegmentTable) -> Result<()> {
    let mut previous: Option<(SegmentId, SegmentId)> = None;
    for (segment_id, network_id) in networks.iter() {
        if let Some((prev_segment, prev_network)) = previous {
            if prev_segment == segment_id && prev_network != network_id {
                return Err(Error::OverlappingNetworks {
                    segment_id,
                    first: prev_network,
                    second: network_id,
                });
            }
        }
        previous = Some((segment_id, network_id));
    }

    match segments
        .iter()
        .find(|s| !s.is_loop && networks.network_of(s.id).is_none())
    {
        Some(s) => Err(Error::UnassignedSegment(s.id)),
        None => Ok(()),
    }
}
