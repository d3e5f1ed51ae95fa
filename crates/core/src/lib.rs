//! # rivernet core
//!
//! Core records, tables and I/O for the rivernet topology engine.
//!
//! This crate provides:
//! - `Segment` / `SegmentTable`: flowlines keyed by dense segment id
//! - `Join` / `JoinTable`: directed upstream → downstream edges
//! - `Barrier` / `BarrierJoinTable`: barriers and their neighboring segments
//! - `IdAllocator`: per-partition segment id ranges
//! - Stage checkpoint I/O
//! - Algorithm traits for a consistent API

pub mod barrier;
pub mod error;
pub mod ids;
pub mod io;
pub mod join;
pub mod segment;
pub mod vector;

pub use barrier::{Barrier, BarrierJoin, BarrierJoinTable};
pub use error::{Error, Result};
pub use ids::{BarrierId, IdAllocator, PermanentId, SegmentId, NO_SEGMENT};
pub use join::{Join, JoinTable, JoinType};
pub use segment::{Segment, SegmentTable};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::barrier::{Barrier, BarrierJoin, BarrierJoinTable};
    pub use crate::error::{Error, Result};
    pub use crate::ids::{BarrierId, IdAllocator, PermanentId, SegmentId, NO_SEGMENT};
    pub use crate::join::{Join, JoinTable, JoinType};
    pub use crate::segment::{Segment, SegmentTable};
    pub use crate::Algorithm;
}

/// Core trait for batch transforms in rivernet.
///
/// Algorithms are pure functions from input tables to output tables.
pub trait Algorithm {
    /// Input type for the algorithm
    type Input;
    /// Output type for the algorithm
    type Output;
    /// Parameters controlling algorithm behavior
    type Params: Default;
    /// Error type for algorithm execution
    type Error: std::error::Error;

    /// Returns the algorithm name
    fn name(&self) -> &'static str;

    /// Returns a description of what the algorithm does
    fn description(&self) -> &'static str;

    /// Execute the algorithm
    fn execute(&self, input: Self::Input, params: Self::Params) -> std::result::Result<Self::Output, Self::Error>;

    /// Execute with default parameters
    fn execute_default(&self, input: Self::Input) -> std::result::Result<Self::Output, Self::Error> {
        self.execute(input, Self::Params::default())
    }
}
