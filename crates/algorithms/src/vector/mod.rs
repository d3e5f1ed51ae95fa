//! Vector helpers for flowline geometry
//!
//! - Linear referencing: locate a point along a line
//! - Splitting a line at distances along it
//! - Extent of a set of lines

mod linear_ref;
mod spatial;

pub use linear_ref::{locate_fraction, split_line};
pub use spatial::extent;
