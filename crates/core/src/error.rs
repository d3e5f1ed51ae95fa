//! Error types for rivernet
//!
//! Fatal failures fall into two families that callers treat differently:
//! - data quality errors point at bad input from an earlier stage
//!   (for example two barriers snapped to the same spot of one segment);
//! - integrity errors mean a structural edit produced an inconsistent table
//!   and indicate a bug.
//!
//! Recoverable conditions are not errors; they are logged with `tracing` and
//! processing continues.

use crate::ids::{BarrierId, SegmentId};
use thiserror::Error;

/// Main error type for rivernet operations
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("Length mismatch for {what}: {left} vs {right}")]
    LengthMismatch {
        what: &'static str,
        left: usize,
        right: usize,
    },

    #[error("Duplicate segment id {0}")]
    DuplicateSegment(SegmentId),

    #[error("Segment id space exhausted: next id {next}, requested {requested}")]
    IdSpaceExhausted { next: SegmentId, requested: usize },

    // ── data quality ────────────────────────────────────────────────────
    #[error(
        "Barriers {first} and {second} share position {position} on segment {segment_id}"
    )]
    DuplicateBarrierPosition {
        segment_id: SegmentId,
        position: f64,
        first: BarrierId,
        second: BarrierId,
    },

    #[error("Barrier {barrier_id} cannot be placed on segment {segment_id}: {reason}")]
    AmbiguousContainment {
        barrier_id: BarrierId,
        segment_id: SegmentId,
        reason: String,
    },

    // ── integrity ───────────────────────────────────────────────────────
    #[error("Join {upstream_id} -> {downstream_id} references missing segment {missing}")]
    DanglingJoin {
        upstream_id: SegmentId,
        downstream_id: SegmentId,
        missing: SegmentId,
    },

    #[error("Segment {segment_id} assigned to networks {first} and {second}")]
    OverlappingNetworks {
        segment_id: SegmentId,
        first: SegmentId,
        second: SegmentId,
    },

    #[error("Segment {0} was not assigned to any network")]
    UnassignedSegment(SegmentId),

    #[error(
        "Children of segment {segment_id} have length {children_length}, parent has {parent_length}"
    )]
    LengthNotPreserved {
        segment_id: SegmentId,
        parent_length: f64,
        children_length: f64,
    },

    #[error("Algorithm error: {0}")]
    Algorithm(String),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Bad input from an earlier stage; the partition stage must be rerun
    /// after fixing the input.
    pub fn is_data_quality(&self) -> bool {
        matches!(
            self,
            Error::DuplicateBarrierPosition { .. } | Error::AmbiguousContainment { .. }
        )
    }

    /// A structural edit left the tables inconsistent.
    pub fn is_integrity(&self) -> bool {
        matches!(
            self,
            Error::DanglingJoin { .. }
                | Error::OverlappingNetworks { .. }
                | Error::UnassignedSegment(_)
                | Error::LengthNotPreserved { .. }
        )
    }
}

/// Result type alias for rivernet operations
pub type Result<T> = std::result::Result<T, Error>;
