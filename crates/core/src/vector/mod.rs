//! Minimal planar geometry helpers shared by the record types

use geo::{Euclidean, Length, LineString};

/// Euclidean length of a line in CRS units.
pub fn line_length(line: &LineString<f64>) -> f64 {
    line.length::<Euclidean>()
}
