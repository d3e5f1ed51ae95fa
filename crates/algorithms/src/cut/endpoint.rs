//! Barrier joins for barriers that sit on an existing confluence

use super::classify::{Located, Placement};
use rivernet_core::{BarrierJoin, Join, JoinTable, JoinType, SegmentId, NO_SEGMENT};
use std::collections::HashMap;

/// Joins indexed by either end.
struct Neighborhood<'a> {
    into: HashMap<SegmentId, Vec<&'a Join>>,
    out_of: HashMap<SegmentId, Vec<&'a Join>>,
}

impl<'a> Neighborhood<'a> {
    fn new(joins: &'a JoinTable) -> Self {
        let mut into: HashMap<SegmentId, Vec<&Join>> = HashMap::new();
        let mut out_of: HashMap<SegmentId, Vec<&Join>> = HashMap::new();
        for j in joins.iter() {
            if j.downstream_id != NO_SEGMENT {
                into.entry(j.downstream_id).or_default().push(j);
            }
            if j.upstream_id != NO_SEGMENT {
                out_of.entry(j.upstream_id).or_default().push(j);
            }
        }
        Self { into, out_of }
    }

    fn inflows(&self, id: SegmentId) -> &[&'a Join] {
        self.into.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    fn outflows(&self, id: SegmentId) -> &[&'a Join] {
        self.out_of.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Rows for endpoint barriers, resolved against the already rewired joins.
///
/// `first_child` / `last_child` map segments cut in the same pass to their
/// most upstream / most downstream piece, so an endpoint barrier on a cut
/// segment lands on the piece that actually owns that endpoint.
///
/// An upstream endpoint yields every join into the segment (or a synthetic
/// origin row for a headwater). A downstream endpoint yields every join out
/// of the segment together with the other inflows to the same confluence
/// (or a synthetic terminal row for an outlet).
pub(crate) fn endpoint_rows(
    located: &[Located],
    joins: &JoinTable,
    first_child: &HashMap<SegmentId, SegmentId>,
    last_child: &HashMap<SegmentId, SegmentId>,
) -> Vec<BarrierJoin> {
    if located.is_empty() {
        return Vec::new();
    }

    let hood = Neighborhood::new(joins);
    let mut rows = Vec::new();

    for l in located {
        match l.placement {
            Placement::UpstreamEndpoint => {
                let target = first_child.get(&l.segment_id).copied().unwrap_or(l.segment_id);
                let inflows = hood.inflows(target);
                if inflows.is_empty() {
                    rows.push(BarrierJoin::new(l.barrier_id, NO_SEGMENT, target, JoinType::Origin));
                }
                rows.extend(inflows.iter().map(|j| BarrierJoin::from_join(l.barrier_id, j)));
            }
            Placement::DownstreamEndpoint => {
                let target = last_child.get(&l.segment_id).copied().unwrap_or(l.segment_id);
                let outflows = hood.outflows(target);
                if outflows.is_empty() {
                    rows.push(BarrierJoin::new(l.barrier_id, target, NO_SEGMENT, JoinType::Terminal));
                }
                for out in outflows {
                    rows.push(BarrierJoin::from_join(l.barrier_id, out));
                    if out.downstream_id == NO_SEGMENT {
                        continue;
                    }
                    rows.extend(
                        hood.inflows(out.downstream_id)
                            .iter()
                            .filter(|j| j.upstream_id != target)
                            .map(|j| BarrierJoin::from_join(l.barrier_id, j)),
                    );
                }
            }
            Placement::Interior => {}
        }
    }

    rows
}
