//! Placing barriers along their segments

use crate::vector::locate_fraction;
use rivernet_core::{Barrier, BarrierId, Segment, SegmentId};
use tracing::warn;

/// Where a barrier sits on its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Within tolerance of the upstream end
    UpstreamEndpoint,
    /// Within tolerance of the downstream end (wins when both ends are close)
    DownstreamEndpoint,
    /// Requires a cut
    Interior,
}

/// Classify a linear position (distance from the upstream end).
pub fn classify(position: f64, length: f64, tolerance: f64) -> Placement {
    let near_upstream = position <= tolerance;
    let near_downstream = length - position <= tolerance;
    if near_downstream {
        Placement::DownstreamEndpoint
    } else if near_upstream {
        Placement::UpstreamEndpoint
    } else {
        Placement::Interior
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Located {
    pub barrier_id: BarrierId,
    pub segment_id: SegmentId,
    /// Fraction of the way from the upstream end
    pub fraction: f64,
    /// Distance from the upstream end in length units
    pub position: f64,
    pub placement: Placement,
}

/// Project a barrier onto its segment and classify it.
pub(crate) fn locate(segment: &Segment, barrier: &Barrier, tolerance: f64) -> Located {
    let (fraction, placement) = match locate_fraction(&segment.geometry, &barrier.point) {
        Some(fraction) => {
            let position = fraction * segment.length;
            let placement = classify(position, segment.length, tolerance);
            if placement == Placement::DownstreamEndpoint && position <= tolerance {
                warn!(
                    barrier_id = barrier.id,
                    segment_id = segment.id,
                    length = segment.length,
                    "barrier within tolerance of both ends, placed on downstream endpoint"
                );
            }
            (fraction, placement)
        }
        None => {
            warn!(
                barrier_id = barrier.id,
                segment_id = segment.id,
                "segment has no length, barrier placed on downstream endpoint"
            );
            (1.0, Placement::DownstreamEndpoint)
        }
    };

    Located {
        barrier_id: barrier.id,
        segment_id: segment.id,
        fraction,
        position: fraction * segment.length,
        placement,
    }
}
