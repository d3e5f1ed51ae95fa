//! Flow segments (flowlines) and the segment table

use crate::error::{Error, Result};
use crate::ids::{PermanentId, SegmentId};
use crate::vector::line_length;
use geo_types::LineString;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Flow type code of artificial pipelines.
pub const FLOW_TYPE_PIPELINE: u16 = 428;

/// Flow type code of ordinary stream/river flowlines.
pub const FLOW_TYPE_STREAM: u16 = 460;

/// An atomic, non-branching piece of the river network.
///
/// Geometry is digitized from the upstream end to the downstream end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub permanent_id: PermanentId,
    pub geometry: LineString<f64>,
    /// Length in CRS units
    pub length: f64,
    pub stream_order: u8,
    pub flow_type: u16,
    pub size_class: u8,
    /// Part of a braided / divergent channel
    pub is_loop: bool,
    pub off_network: bool,
    /// Segment this one was cut from
    pub parent_id: Option<SegmentId>,
}

impl Segment {
    /// Create a stream segment, deriving its length from the geometry.
    pub fn new(id: SegmentId, permanent_id: PermanentId, geometry: LineString<f64>) -> Self {
        let length = line_length(&geometry);
        Self {
            id,
            permanent_id,
            geometry,
            length,
            stream_order: 1,
            flow_type: FLOW_TYPE_STREAM,
            size_class: 0,
            is_loop: false,
            off_network: false,
            parent_id: None,
        }
    }

    /// A child of `self` covering `geometry`. Hydrologic attributes are copied.
    pub fn child(&self, id: SegmentId, geometry: LineString<f64>, length: f64) -> Self {
        Self {
            id,
            geometry,
            length,
            parent_id: Some(self.id),
            ..self.clone()
        }
    }

    pub fn is_pipeline(&self) -> bool {
        self.flow_type == FLOW_TYPE_PIPELINE
    }
}

/// Segments of one partition, kept sorted by id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SegmentTable {
    segments: Vec<Segment>,
}

impl SegmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, rejecting duplicate ids and the reserved id 0.
    pub fn from_segments(mut segments: Vec<Segment>) -> Result<Self> {
        segments.sort_unstable_by_key(|s| s.id);
        if let Some(first) = segments.first() {
            if first.id == 0 {
                return Err(Error::InvalidParameter {
                    name: "segment_id",
                    value: "0".into(),
                    reason: "0 is reserved for \"no segment\"".into(),
                });
            }
        }
        if let Some(pair) = segments.windows(2).find(|w| w[0].id == w[1].id) {
            return Err(Error::DuplicateSegment(pair[0].id));
        }
        Ok(Self { segments })
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn get(&self, id: SegmentId) -> Option<&Segment> {
        self.segments
            .binary_search_by_key(&id, |s| s.id)
            .ok()
            .map(|i| &self.segments[i])
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.get(id).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Segment> {
        self.segments.iter()
    }

    pub fn ids(&self) -> impl Iterator<Item = SegmentId> + '_ {
        self.segments.iter().map(|s| s.id)
    }

    pub fn max_id(&self) -> Option<SegmentId> {
        self.segments.last().map(|s| s.id)
    }

    pub fn total_length(&self) -> f64 {
        self.segments.iter().map(|s| s.length).sum()
    }

    /// Split into (kept, removed) by id.
    pub fn partition_by_ids(self, ids: &HashSet<SegmentId>) -> (Self, Self) {
        let (removed, kept): (Vec<_>, Vec<_>) =
            self.segments.into_iter().partition(|s| ids.contains(&s.id));
        (Self { segments: kept }, Self { segments: removed })
    }

    /// Merge two tables with disjoint ids.
    pub fn concat(self, other: SegmentTable) -> Result<Self> {
        let mut segments = self.segments;
        segments.extend(other.segments);
        Self::from_segments(segments)
    }

    pub fn as_slice(&self) -> &[Segment] {
        &self.segments
    }
}

impl IntoIterator for SegmentTable {
    type Item = Segment;
    type IntoIter = std::vec::IntoIter<Segment>;

    fn into_iter(self) -> Self::IntoIter {
        self.segments.into_iter()
    }
}
