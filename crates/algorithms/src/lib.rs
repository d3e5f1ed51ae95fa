//! # rivernet algorithms
//!
//! Topology algorithms over river networks.
//!
//! ## Modules
//!
//! - **graph**: CSR directed graph with components, descendants, reachability, loop detection
//! - **joins**: join table lookup, integrity-preserving removal, id remapping
//! - **vector**: linear referencing and line splitting
//! - **cut**: cutting segments at barriers
//! - **network**: functional networks and their statistics
//! - **pipelines**: segment removal and pipeline cleanup
//! - **boundary**: partition merge and boundary reconciliation
//! - **validate**: checkpoint validation

pub mod boundary;
pub mod cut;
pub mod graph;
pub mod joins;
pub(crate) mod maybe_rayon;
pub mod network;
pub mod pipelines;
pub mod validate;
pub mod vector;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::boundary::{merge_partitions, reconcile_boundaries};
    pub use crate::cut::{cut_segments, CutInput, CutParams, CutResult, Placement, SegmentCutter};
    pub use crate::graph::{DirectedGraph, LoopClosure};
    pub use crate::joins::{
        find_downstream_terminals, find_joins, index_joins, outlets, remove_joins, update_joins,
        RunIndex,
    };
    pub use crate::network::{
        barrier_networks, build_networks, network_stats, BarrierNetworks, NetworkBuilder,
        NetworkInput, NetworkParams, NetworkStats, Networks,
    };
    pub use crate::pipelines::{
        remove_pipelines, remove_segments, PipelineParams, PipelineRemover, Removal,
    };
    pub use crate::validate::{validate_children, validate_cut, validate_joins, validate_networks};
    pub use rivernet_core::prelude::*;
}
