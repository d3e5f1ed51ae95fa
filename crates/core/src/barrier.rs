//! Barriers and their associations with neighboring segments

use crate::ids::{BarrierId, SegmentId};
use crate::join::{Join, JoinType};
use geo_types::Point;
use serde::{Deserialize, Serialize};

/// A barrier already snapped onto a segment by an earlier stage.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Barrier {
    pub id: BarrierId,
    pub segment_id: SegmentId,
    pub point: Point<f64>,
}

impl Barrier {
    pub fn new(id: BarrierId, segment_id: SegmentId, x: f64, y: f64) -> Self {
        Self {
            id,
            segment_id,
            point: Point::new(x, y),
        }
    }
}

/// One (barrier, neighboring segment pair) row.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BarrierJoin {
    pub barrier_id: BarrierId,
    pub upstream_id: SegmentId,
    pub downstream_id: SegmentId,
    #[serde(rename = "type")]
    pub kind: JoinType,
    pub marine: bool,
    pub great_lakes: bool,
    pub junction: bool,
}

impl BarrierJoin {
    /// Row inheriting the attributes of `join`.
    pub fn from_join(barrier_id: BarrierId, join: &Join) -> Self {
        Self {
            barrier_id,
            upstream_id: join.upstream_id,
            downstream_id: join.downstream_id,
            kind: join.kind,
            marine: join.marine,
            great_lakes: join.great_lakes,
            junction: join.junction,
        }
    }

    pub fn new(
        barrier_id: BarrierId,
        upstream_id: SegmentId,
        downstream_id: SegmentId,
        kind: JoinType,
    ) -> Self {
        Self::from_join(barrier_id, &Join::new(upstream_id, downstream_id, kind))
    }
}

/// Barrier joins sorted by (barrier_id, upstream_id, downstream_id), without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BarrierJoinTable {
    rows: Vec<BarrierJoin>,
}

impl BarrierJoinTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_rows(mut rows: Vec<BarrierJoin>) -> Self {
        rows.sort_by_key(|r| (r.barrier_id, r.upstream_id, r.downstream_id));
        rows.dedup_by_key(|r| (r.barrier_id, r.upstream_id, r.downstream_id));
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BarrierJoin> {
        self.rows.iter()
    }

    pub fn as_slice(&self) -> &[BarrierJoin] {
        &self.rows
    }

    /// Rows of one barrier.
    pub fn for_barrier(&self, barrier_id: BarrierId) -> &[BarrierJoin] {
        let start = self.rows.partition_point(|r| r.barrier_id < barrier_id);
        let end = self.rows.partition_point(|r| r.barrier_id <= barrier_id);
        &self.rows[start..end]
    }

    pub fn concat(self, other: BarrierJoinTable) -> Self {
        let mut rows = self.rows;
        rows.extend(other.rows);
        Self::from_rows(rows)
    }
}
