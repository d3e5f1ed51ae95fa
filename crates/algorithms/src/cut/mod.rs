//! Cutting flowlines at barriers
//!
//! Each barrier is projected onto the segment it was snapped to and
//! classified as sitting on the upstream endpoint, the downstream endpoint
//! or the interior. Interior barriers split their segment into `n + 1`
//! children with fresh ids; the parent is retired and every join is rewired
//! onto the children. Endpoint barriers leave geometry alone and are
//! associated with the joins at the confluence they sit on.
//!
//! Ids are reserved in (segment id, position, barrier id) order before any
//! geometry work, so the output is identical with or without the
//! `parallel` feature.

mod classify;
mod endpoint;

pub use classify::{classify, Placement};

use crate::joins::{update_barrier_joins, update_joins};
use crate::maybe_rayon::*;
use crate::validate::{validate_children, validate_cut};
use crate::vector::split_line;
use classify::{locate, Located};
use rivernet_core::vector::line_length;
use rivernet_core::{
    Algorithm, Barrier, BarrierJoin, BarrierJoinTable, Error, IdAllocator, Join, JoinTable,
    JoinType, Result, Segment, SegmentId, SegmentTable,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info, warn};

/// Parameters for cutting
#[derive(Debug, Clone)]
pub struct CutParams {
    /// Distance (CRS units) within which a barrier counts as sitting on an
    /// endpoint
    pub tolerance: f64,
}

impl Default for CutParams {
    fn default() -> Self {
        Self { tolerance: 1.0 }
    }
}

/// Tables of one partition plus its id allocator
#[derive(Debug, Clone)]
pub struct CutInput {
    pub segments: SegmentTable,
    pub joins: JoinTable,
    /// Rows from earlier passes
    pub barrier_joins: BarrierJoinTable,
    pub barriers: Vec<Barrier>,
    pub allocator: IdAllocator,
}

/// Result of a cut
#[derive(Debug, Clone)]
pub struct CutResult {
    /// Live segments: untouched originals plus new children
    pub segments: SegmentTable,
    /// Parents replaced by their children
    pub retired: SegmentTable,
    pub joins: JoinTable,
    /// Rows from earlier passes rewired onto children, plus this pass's rows
    pub barrier_joins: BarrierJoinTable,
    /// Allocator state after reserving child ids
    pub allocator: IdAllocator,
}

/// Segment cutter
#[derive(Debug, Clone, Default)]
pub struct SegmentCutter;

impl Algorithm for SegmentCutter {
    type Input = CutInput;
    type Output = CutResult;
    type Params = CutParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "SegmentCutter"
    }

    fn description(&self) -> &'static str {
        "Cut flowlines at barriers and rewire joins onto the pieces"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        let mut allocator = input.allocator;
        cut_segments(
            &input.segments,
            &input.joins,
            &input.barrier_joins,
            &input.barriers,
            &mut allocator,
            params,
        )
    }
}

/// A segment with its interior barriers and reserved child ids.
struct CutPlan<'a> {
    segment: &'a Segment,
    interior: Vec<Located>,
    first_child: SegmentId,
}

struct Pieces {
    parent_id: SegmentId,
    children: Vec<Segment>,
    internal_joins: Vec<Join>,
    barrier_joins: Vec<BarrierJoin>,
}

/// Cut `segments` at `barriers`.
///
/// Barriers snapped to a segment missing from the table are skipped with a
/// warning. A barrier snapped to a segment that was already cut is
/// ambiguous and rejected, as are two interior barriers at the same
/// position on one segment.
///
/// `barrier_joins` holds rows from earlier passes; those pointing at a parent
/// cut here are moved onto its most upstream or most downstream child.
pub fn cut_segments(
    segments: &SegmentTable,
    joins: &JoinTable,
    barrier_joins: &BarrierJoinTable,
    barriers: &[Barrier],
    allocator: &mut IdAllocator,
    params: CutParams,
) -> Result<CutResult> {
    if !params.tolerance.is_finite() || params.tolerance < 0.0 {
        return Err(Error::InvalidParameter {
            name: "tolerance",
            value: params.tolerance.to_string(),
            reason: "must be a non-negative finite distance".into(),
        });
    }

    let parents: HashSet<SegmentId> = segments.iter().filter_map(|s| s.parent_id).collect();

    let mut located = Vec::with_capacity(barriers.len());
    for barrier in barriers {
        match segments.get(barrier.segment_id) {
            Some(segment) => located.push(locate(segment, barrier, params.tolerance)),
            None if parents.contains(&barrier.segment_id) => {
                return Err(Error::AmbiguousContainment {
                    barrier_id: barrier.id,
                    segment_id: barrier.segment_id,
                    reason: "segment was already cut; snap the barrier to one of its children".into(),
                });
            }
            None => warn!(
                barrier_id = barrier.id,
                segment_id = barrier.segment_id,
                "barrier snapped to unknown segment, skipped"
            ),
        }
    }
    located.sort_by(|a, b| {
        a.segment_id
            .cmp(&b.segment_id)
            .then(a.position.total_cmp(&b.position))
            .then(a.barrier_id.cmp(&b.barrier_id))
    });

    let mut plans = Vec::new();
    let mut at_endpoints = Vec::new();
    for group in located.chunk_by(|a, b| a.segment_id == b.segment_id) {
        let segment_id = group[0].segment_id;
        let (interior, endpoints): (Vec<Located>, Vec<Located>) =
            group.iter().partition(|l| l.placement == Placement::Interior);
        at_endpoints.extend(endpoints);

        if let Some(pair) = interior.windows(2).find(|w| w[0].position == w[1].position) {
            return Err(Error::DuplicateBarrierPosition {
                segment_id,
                position: pair[0].position,
                first: pair[0].barrier_id,
                second: pair[1].barrier_id,
            });
        }
        if interior.is_empty() {
            continue;
        }
        let Some(segment) = segments.get(segment_id) else {
            continue;
        };
        let first_child = allocator.reserve(interior.len() + 1)?.start;
        plans.push(CutPlan { segment, interior, first_child });
    }

    debug!(
        cut = plans.len(),
        endpoint_barriers = at_endpoints.len(),
        "barriers classified"
    );

    let pieces: Vec<Pieces> = plans.into_par_iter().map(split_segment).collect::<Result<_>>()?;

    let mut first_child = HashMap::with_capacity(pieces.len());
    let mut last_child = HashMap::with_capacity(pieces.len());
    for p in &pieces {
        if let (Some(first), Some(last)) = (p.children.first(), p.children.last()) {
            first_child.insert(p.parent_id, first.id);
            last_child.insert(p.parent_id, last.id);
        }
    }

    let joins = update_joins(joins, &first_child, &last_child)
        .concat(pieces.iter().flat_map(|p| p.internal_joins.iter().copied()));

    let previous = update_barrier_joins(barrier_joins, &first_child, &last_child);
    let mut rows: Vec<BarrierJoin> = pieces
        .iter()
        .flat_map(|p| p.barrier_joins.iter().copied())
        .collect();
    rows.extend(endpoint::endpoint_rows(&at_endpoints, &joins, &first_child, &last_child));

    let retired_ids: HashSet<SegmentId> = first_child.keys().copied().collect();
    let (kept, retired) = segments.clone().partition_by_ids(&retired_ids);
    let children = SegmentTable::from_segments(pieces.into_iter().flat_map(|p| p.children).collect())?;
    let segments = kept.concat(children)?;

    let result = CutResult {
        segments,
        retired,
        joins,
        barrier_joins: previous.concat(BarrierJoinTable::from_rows(rows)),
        allocator: *allocator,
    };
    validate_cut(&result)?;

    info!(
        retired = result.retired.len(),
        segments = result.segments.len(),
        joins = result.joins.len(),
        barrier_joins = result.barrier_joins.len(),
        "cut segments"
    );
    Ok(result)
}

fn split_segment(plan: CutPlan<'_>) -> Result<Pieces> {
    let segment = plan.segment;
    let geometry_length = line_length(&segment.geometry);

    let mut bounds = Vec::with_capacity(plan.interior.len() + 2);
    bounds.push(0.0);
    bounds.extend(plan.interior.iter().map(|l| l.fraction));
    bounds.push(1.0);

    let distances: Vec<f64> = plan.interior.iter().map(|l| l.fraction * geometry_length).collect();
    let lines = split_line(&segment.geometry, &distances);
    if lines.len() != plan.interior.len() + 1 {
        return Err(Error::Algorithm(format!(
            "segment {} split into {} pieces, expected {}",
            segment.id,
            lines.len(),
            plan.interior.len() + 1
        )));
    }

    let children: Vec<Segment> = lines
        .into_iter()
        .zip(bounds.windows(2))
        .enumerate()
        .map(|(i, (line, w))| {
            segment.child(plan.first_child + i as SegmentId, line, segment.length * (w[1] - w[0]))
        })
        .collect();
    validate_children(segment, &children)?;

    let internal_joins: Vec<Join> = children
        .windows(2)
        .map(|w| {
            Join::new(w[0].id, w[1].id, JoinType::Internal)
                .with_permanent_ids(segment.permanent_id, segment.permanent_id)
        })
        .collect();

    let barrier_joins = plan
        .interior
        .iter()
        .zip(&internal_joins)
        .map(|(l, j)| BarrierJoin::from_join(l.barrier_id, j))
        .collect();

    Ok(Pieces {
        parent_id: segment.id,
        children,
        internal_joins,
        barrier_joins,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use geo::LineString;

    /// 0 -> 1 -> 2 -> 0, each 100 long and running north.
    fn chain() -> (SegmentTable, JoinTable) {
        let segments = SegmentTable::from_segments(vec![
            Segment::new(1, 11, LineString::from(vec![(0.0, 0.0), (0.0, 100.0)])),
            Segment::new(2, 22, LineString::from(vec![(0.0, 100.0), (0.0, 200.0)])),
        ])
        .unwrap();
        let joins = JoinTable::from_joins(vec![
            Join::new(0, 1, JoinType::Origin).with_permanent_ids(0, 11),
            Join::new(1, 2, JoinType::Internal).with_permanent_ids(11, 22),
            Join::new(2, 0, JoinType::Terminal).with_permanent_ids(22, 0),
        ]);
        (segments, joins)
    }

    fn run(barriers: &[Barrier]) -> Result<CutResult> {
        let (segments, joins) = chain();
        let mut allocator = IdAllocator::starting_at(100);
        cut_segments(&segments, &joins, &BarrierJoinTable::new(), barriers, &mut allocator, CutParams::default())
    }

    #[test]
    fn test_interior_cut() {
        let out = run(&[Barrier::new(7, 1, 0.0, 40.0)]).unwrap();

        assert_eq!(out.retired.ids().collect::<Vec<_>>(), vec![1]);
        assert_eq!(out.segments.ids().collect::<Vec<_>>(), vec![2, 100, 101]);
        assert_relative_eq!(out.segments.get(100).unwrap().length, 40.0, epsilon = 1e-9);
        assert_relative_eq!(out.segments.get(101).unwrap().length, 60.0, epsilon = 1e-9);
        assert_eq!(out.segments.get(101).unwrap().parent_id, Some(1));
        assert_eq!(out.allocator.peek(), 102);

        let mut keys: Vec<_> = out.joins.iter().map(|j| j.key()).collect();
        keys.sort_unstable();
        assert_eq!(keys, vec![(0, 100), (2, 0), (100, 101), (101, 2)]);

        let rows = out.barrier_joins.for_barrier(7);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (100, 101));
        assert_eq!(rows[0].kind, JoinType::Internal);
    }

    #[test]
    fn test_endpoint_barrier_does_not_cut() {
        let out = run(&[Barrier::new(3, 2, 0.0, 100.2)]).unwrap();
        assert!(out.retired.is_empty());
        assert_eq!(out.segments.len(), 2);
        let rows = out.barrier_joins.for_barrier(3);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (1, 2));
    }

    #[test]
    fn test_duplicate_position_rejected() {
        let err = run(&[Barrier::new(1, 1, 0.0, 50.0), Barrier::new(2, 1, 0.0, 50.0)]).unwrap_err();
        assert!(err.is_data_quality());
        assert!(matches!(err, Error::DuplicateBarrierPosition { first: 1, second: 2, .. }));
    }

    #[test]
    fn test_unknown_segment_skipped() {
        let out = run(&[Barrier::new(1, 99, 0.0, 50.0)]).unwrap();
        assert!(out.barrier_joins.is_empty());
        assert!(out.retired.is_empty());
    }

    #[test]
    fn test_already_cut_parent_is_ambiguous() {
        let out = run(&[Barrier::new(7, 1, 0.0, 40.0)]).unwrap();
        let mut allocator = out.allocator;
        let err = cut_segments(
            &out.segments,
            &out.joins,
            &out.barrier_joins,
            &[Barrier::new(8, 1, 0.0, 20.0)],
            &mut allocator,
            CutParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::AmbiguousContainment { barrier_id: 8, .. }));
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let (segments, joins) = chain();
        let mut allocator = IdAllocator::starting_at(100);
        let params = CutParams { tolerance: -1.0 };
        assert!(matches!(
            cut_segments(&segments, &joins, &BarrierJoinTable::new(), &[], &mut allocator, params),
            Err(Error::InvalidParameter { name: "tolerance", .. })
        ));
    }

    #[test]
    fn test_algorithm_trait() {
        let (segments, joins) = chain();
        let input = CutInput {
            segments,
            joins,
            barrier_joins: BarrierJoinTable::new(),
            barriers: vec![Barrier::new(1, 2, 0.0, 150.0)],
            allocator: IdAllocator::starting_at(10),
        };
        let out = SegmentCutter.execute_default(input).unwrap();
        assert_eq!(out.segments.ids().collect::<Vec<_>>(), vec![1, 10, 11]);
    }

    #[test]
    fn test_short_segment_barrier_goes_downstream() {
        // 1.2 long: a barrier anywhere on it is within 1.0 of both ends
        let segments = SegmentTable::from_segments(vec![
            Segment::new(1, 11, LineString::from(vec![(0.0, 0.0), (0.0, 100.0)])),
            Segment::new(2, 22, LineString::from(vec![(0.0, 100.0), (0.0, 101.2)])),
            Segment::new(3, 33, LineString::from(vec![(0.0, 101.2), (0.0, 200.0)])),
        ])
        .unwrap();
        let joins = JoinTable::from_joins(vec![
            Join::new(0, 1, JoinType::Origin),
            Join::new(1, 2, JoinType::Internal),
            Join::new(2, 3, JoinType::Internal),
            Join::new(3, 0, JoinType::Terminal),
        ]);
        let mut allocator = IdAllocator::starting_at(100);
        let out = cut_segments(
            &segments,
            &joins,
            &BarrierJoinTable::new(),
            &[Barrier::new(5, 2, 0.0, 100.4)],
            &mut allocator,
            CutParams::default(),
        )
        .unwrap();

        assert!(out.retired.is_empty());
        assert_eq!(out.segments.len(), 3);
        assert_eq!(allocator.peek(), 100);
        let rows = out.barrier_joins.for_barrier(5);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (2, 3));
    }

    #[test]
    fn test_second_pass_rewires_earlier_rows() {
        // pass 1: barrier 100 on the upstream end of 2
        let (segments, joins) = chain();
        let mut allocator = IdAllocator::starting_at(10);
        let first = cut_segments(
            &segments,
            &joins,
            &BarrierJoinTable::new(),
            &[Barrier::new(100, 2, 0.0, 100.2)],
            &mut allocator,
            CutParams::default(),
        )
        .unwrap();
        let rows = first.barrier_joins.for_barrier(100);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (1, 2));

        // pass 2: cut 2 in the middle
        let second = cut_segments(
            &first.segments,
            &first.joins,
            &first.barrier_joins,
            &[Barrier::new(200, 2, 0.0, 150.0)],
            &mut allocator,
            CutParams::default(),
        )
        .unwrap();
        assert_eq!(second.segments.ids().collect::<Vec<_>>(), vec![1, 10, 11]);
        let rows = second.barrier_joins.for_barrier(100);
        assert_eq!(rows.len(), 1);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (1, 10));
        let rows = second.barrier_joins.for_barrier(200);
        assert_eq!((rows[0].upstream_id, rows[0].downstream_id), (10, 11));

        let networks = crate::network::build_networks(
            &second.segments,
            &second.joins,
            &second.barrier_joins,
            crate::network::NetworkParams::default(),
        )
        .unwrap();
        assert_eq!(networks.network_of(1), Some(1));
        assert_eq!(networks.network_of(10), Some(10));
        assert_eq!(networks.network_of(11), Some(11));
    }
}
