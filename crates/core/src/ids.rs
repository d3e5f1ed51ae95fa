//! Identifiers and the per-partition segment id allocator

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Dense integer id of a segment, unique within a partition.
pub type SegmentId = u32;

/// Permanent external identifier carried over from the source hydrography.
pub type PermanentId = u64;

/// Identifier of a barrier (dam, culvert, ...).
pub type BarrierId = u64;

/// "No neighbor". Upstream 0 marks a headwater, downstream 0 an outlet.
pub const NO_SEGMENT: SegmentId = 0;

/// Width of the id range reserved for each partition.
pub const PARTITION_ID_STRIDE: SegmentId = 100_000_000;

/// Hands out monotonically increasing segment ids.
///
/// Each partition owns the range
/// `partition * PARTITION_ID_STRIDE + 1 .. (partition + 1) * PARTITION_ID_STRIDE`,
/// so ids stay unique when partitions are merged later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next: SegmentId,
    end: SegmentId,
}

impl IdAllocator {
    /// Allocator over the id range of `partition`.
    pub fn for_partition(partition: u32) -> Result<Self> {
        let start = partition
            .checked_mul(PARTITION_ID_STRIDE)
            .and_then(|base| base.checked_add(1))
            .ok_or_else(|| Error::InvalidParameter {
                name: "partition",
                value: partition.to_string(),
                reason: "partition id range exceeds u32".into(),
            })?;
        let end = start.saturating_add(PARTITION_ID_STRIDE - 1);
        Ok(Self { next: start, end })
    }

    /// Unbounded allocator starting at `next` (0 is bumped to 1).
    pub fn starting_at(next: SegmentId) -> Self {
        Self {
            next: next.max(1),
            end: SegmentId::MAX,
        }
    }

    /// Skip past `id` so it is never handed out again.
    pub fn advance_past(&mut self, id: SegmentId) {
        if id >= self.next {
            self.next = id.saturating_add(1);
        }
    }

    /// The id the next call to [`next`](Self::next) returns.
    pub fn peek(&self) -> SegmentId {
        self.next
    }

    pub fn next(&mut self) -> Result<SegmentId> {
        Ok(self.reserve(1)?.start)
    }

    /// Reserve `count` consecutive ids.
    pub fn reserve(&mut self, count: usize) -> Result<Range<SegmentId>> {
        let exhausted = || Error::IdSpaceExhausted {
            next: self.next,
            requested: count,
        };
        let count = SegmentId::try_from(count).map_err(|_| exhausted())?;
        let end = self.next.checked_add(count).ok_or_else(exhausted)?;
        if end > self.end {
            return Err(exhausted());
        }
        let range = self.next..end;
        self.next = end;
        Ok(range)
    }
}
