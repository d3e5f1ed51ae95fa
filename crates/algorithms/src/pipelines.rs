//! Segment removal and pipeline cleanup
//!
//! Pipelines (flow type 428) are artificial conveyances. Long ones are not
//! passable river habitat, and a pipeline that connects to nothing is noise.
//! Both are dropped before cutting, repairing the joins around them.

use crate::joins::{index_joins, remove_barrier_joins, remove_joins};
use rivernet_core::{
    Algorithm, BarrierJoinTable, Error, JoinTable, Result, SegmentId, SegmentTable, NO_SEGMENT,
};
use std::collections::HashSet;
use tracing::{info, warn};

/// Parameters for pipeline removal
#[derive(Debug, Clone)]
pub struct PipelineParams {
    /// Pipelines longer than this (CRS units) are dropped
    pub max_length: f64,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self { max_length: 250.0 }
    }
}

/// Tables after removing segments
#[derive(Debug, Clone)]
pub struct Removal {
    pub segments: SegmentTable,
    pub joins: JoinTable,
    /// The dropped segments
    pub removed: SegmentTable,
}

impl Removal {
    /// Barrier rows left after dropping those that touch a removed segment.
    pub fn prune_barrier_joins(&self, rows: &BarrierJoinTable) -> BarrierJoinTable {
        let ids: Vec<SegmentId> = self.removed.ids().collect();
        remove_barrier_joins(rows, &ids)
    }
}

/// Drop `ids` from the segment table and repair the joins around them.
pub fn remove_segments(segments: &SegmentTable, joins: &JoinTable, ids: &[SegmentId]) -> Removal {
    let drop: HashSet<SegmentId> = ids.iter().copied().filter(|&id| id != NO_SEGMENT).collect();
    if drop.is_empty() {
        return Removal {
            segments: segments.clone(),
            joins: joins.clone(),
            removed: SegmentTable::new(),
        };
    }
    let (segments, removed) = segments.clone().partition_by_ids(&drop);
    let ids: Vec<SegmentId> = removed.ids().collect();
    Removal {
        segments,
        joins: remove_joins(joins, &ids),
        removed,
    }
}

/// Pipeline remover
#[derive(Debug, Clone, Default)]
pub struct PipelineRemover;

impl Algorithm for PipelineRemover {
    type Input = (SegmentTable, JoinTable);
    type Output = Removal;
    type Params = PipelineParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "PipelineRemover"
    }

    fn description(&self) -> &'static str {
        "Drop long or isolated pipeline segments"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        remove_pipelines(&input.0, &input.1, params)
    }
}

/// Drop pipelines longer than `max_length` and pipelines forming an
/// isolated single-segment run.
pub fn remove_pipelines(segments: &SegmentTable, joins: &JoinTable, params: PipelineParams) -> Result<Removal> {
    if params.max_length.is_nan() || params.max_length < 0.0 {
        return Err(Error::InvalidParameter {
            name: "max_length",
            value: params.max_length.to_string(),
            reason: "must be a non-negative length".into(),
        });
    }

    let isolated: HashSet<SegmentId> = index_joins(joins)
        .into_iter()
        .filter(|r| r.is_isolated())
        .map(|r| r.segment_id)
        .collect();
    let joined: HashSet<SegmentId> = joins.iter().flat_map(|j| [j.upstream_id, j.downstream_id]).collect();

    let mut drop = Vec::new();
    for s in segments.iter().filter(|s| s.is_pipeline()) {
        if s.length > params.max_length {
            warn!(segment_id = s.id, length = s.length, "dropping long pipeline");
            drop.push(s.id);
        } else if isolated.contains(&s.id) || !joined.contains(&s.id) {
            warn!(segment_id = s.id, length = s.length, "dropping isolated pipeline");
            drop.push(s.id);
        }
    }

    let removal = remove_segments(segments, joins, &drop);
    info!(
        removed = removal.removed.len(),
        length = removal.removed.total_length(),
        "removed pipelines"
    );
    Ok(removal)
}
