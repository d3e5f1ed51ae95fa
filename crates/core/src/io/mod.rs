//! Reading and writing stage checkpoints

mod checkpoint;

pub use checkpoint::{read_barriers, read_stage, stage_dir, write_json, write_stage, PartitionTables};
