//! Stage checkpoints: one columnar file set per partition per stage
//!
//! A stage directory holds `segments.json`, `retired.json`, `joins.json` and
//! `barrier_joins.json`. Each file stores one array per column. Only
//! `segments.json` and `joins.json` are required; the others default to empty
//! tables (raw imports have no cuts yet).

use crate::barrier::{Barrier, BarrierJoin, BarrierJoinTable};
use crate::error::{Error, Result};
use crate::ids::{BarrierId, PermanentId, SegmentId, NO_SEGMENT};
use crate::join::{Join, JoinTable, JoinType};
use crate::segment::{Segment, SegmentTable};
use geo_types::LineString;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};

const SEGMENTS_FILE: &str = "segments.json";
const RETIRED_FILE: &str = "retired.json";
const JOINS_FILE: &str = "joins.json";
const BARRIER_JOINS_FILE: &str = "barrier_joins.json";

/// Everything a stage reads or writes for one partition.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionTables {
    pub segments: SegmentTable,
    /// Parents replaced by cuts, kept for lineage
    pub retired: SegmentTable,
    pub joins: JoinTable,
    pub barrier_joins: BarrierJoinTable,
}

/// Conventional location of a stage: `<root>/<partition>/<stage>`.
pub fn stage_dir(root: impl AsRef<Path>, partition: &str, stage: &str) -> PathBuf {
    root.as_ref().join(partition).join(stage)
}

// ─── Column layouts ─────────────────────────────────────────────────────

#[derive(Debug, Default, Serialize, Deserialize)]
struct SegmentColumns {
    segment_id: Vec<SegmentId>,
    permanent_id: Vec<PermanentId>,
    geometry: Vec<LineString<f64>>,
    length: Vec<f32>,
    stream_order: Vec<u8>,
    flow_type: Vec<u16>,
    size_class: Vec<u8>,
    #[serde(rename = "loop")]
    is_loop: Vec<bool>,
    off_network: Vec<bool>,
    /// 0 when the segment was not cut from another
    parent_id: Vec<SegmentId>,
}

impl SegmentColumns {
    fn from_table(table: &SegmentTable) -> Self {
        let mut cols = Self::default();
        for s in table.iter() {
            cols.segment_id.push(s.id);
            cols.permanent_id.push(s.permanent_id);
            cols.geometry.push(s.geometry.clone());
            cols.length.push(s.length as f32);
            cols.stream_order.push(s.stream_order);
            cols.flow_type.push(s.flow_type);
            cols.size_class.push(s.size_class);
            cols.is_loop.push(s.is_loop);
            cols.off_network.push(s.off_network);
            cols.parent_id.push(s.parent_id.unwrap_or(NO_SEGMENT));
        }
        cols
    }

    fn into_table(self) -> Result<SegmentTable> {
        let n = self.segment_id.len();
        for len in [
            self.permanent_id.len(),
            self.geometry.len(),
            self.length.len(),
            self.stream_order.len(),
            self.flow_type.len(),
            self.size_class.len(),
            self.is_loop.len(),
            self.off_network.len(),
            self.parent_id.len(),
        ] {
            check_column("segments", n, len)?;
        }

        let mut segments = Vec::with_capacity(n);
        let mut geometry = self.geometry.into_iter();
        for i in 0..n {
            let geometry = geometry.next().unwrap_or_else(|| LineString::new(vec![]));
            segments.push(Segment {
                id: self.segment_id[i],
                permanent_id: self.permanent_id[i],
                geometry,
                length: f64::from(self.length[i]),
                stream_order: self.stream_order[i],
                flow_type: self.flow_type[i],
                size_class: self.size_class[i],
                is_loop: self.is_loop[i],
                off_network: self.off_network[i],
                parent_id: Some(self.parent_id[i]).filter(|&p| p != NO_SEGMENT),
            });
        }
        SegmentTable::from_segments(segments)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct JoinColumns {
    upstream: Vec<PermanentId>,
    downstream: Vec<PermanentId>,
    upstream_id: Vec<SegmentId>,
    downstream_id: Vec<SegmentId>,
    #[serde(rename = "type")]
    kind: Vec<JoinType>,
    marine: Vec<bool>,
    great_lakes: Vec<bool>,
    junction: Vec<bool>,
}

impl JoinColumns {
    fn from_table(table: &JoinTable) -> Self {
        let mut cols = Self::default();
        for j in table.iter() {
            cols.upstream.push(j.upstream);
            cols.downstream.push(j.downstream);
            cols.upstream_id.push(j.upstream_id);
            cols.downstream_id.push(j.downstream_id);
            cols.kind.push(j.kind);
            cols.marine.push(j.marine);
            cols.great_lakes.push(j.great_lakes);
            cols.junction.push(j.junction);
        }
        cols
    }

    fn into_table(self) -> Result<JoinTable> {
        let n = self.upstream_id.len();
        for len in [
            self.upstream.len(),
            self.downstream.len(),
            self.downstream_id.len(),
            self.kind.len(),
            self.marine.len(),
            self.great_lakes.len(),
            self.junction.len(),
        ] {
            check_column("joins", n, len)?;
        }
        Ok((0..n)
            .map(|i| Join {
                upstream: self.upstream[i],
                downstream: self.downstream[i],
                upstream_id: self.upstream_id[i],
                downstream_id: self.downstream_id[i],
                kind: self.kind[i],
                marine: self.marine[i],
                great_lakes: self.great_lakes[i],
                junction: self.junction[i],
            })
            .collect())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct BarrierJoinColumns {
    barrier_id: Vec<BarrierId>,
    upstream_id: Vec<SegmentId>,
    downstream_id: Vec<SegmentId>,
    #[serde(rename = "type")]
    kind: Vec<JoinType>,
    marine: Vec<bool>,
    great_lakes: Vec<bool>,
    junction: Vec<bool>,
}

impl BarrierJoinColumns {
    fn from_table(table: &BarrierJoinTable) -> Self {
        let mut cols = Self::default();
        for r in table.iter() {
            cols.barrier_id.push(r.barrier_id);
            cols.upstream_id.push(r.upstream_id);
            cols.downstream_id.push(r.downstream_id);
            cols.kind.push(r.kind);
            cols.marine.push(r.marine);
            cols.great_lakes.push(r.great_lakes);
            cols.junction.push(r.junction);
        }
        cols
    }

    fn into_table(self) -> Result<BarrierJoinTable> {
        let n = self.barrier_id.len();
        for len in [
            self.upstream_id.len(),
            self.downstream_id.len(),
            self.kind.len(),
            self.marine.len(),
            self.great_lakes.len(),
            self.junction.len(),
        ] {
            check_column("barrier_joins", n, len)?;
        }
        Ok(BarrierJoinTable::from_rows(
            (0..n)
                .map(|i| BarrierJoin {
                    barrier_id: self.barrier_id[i],
                    upstream_id: self.upstream_id[i],
                    downstream_id: self.downstream_id[i],
                    kind: self.kind[i],
                    marine: self.marine[i],
                    great_lakes: self.great_lakes[i],
                    junction: self.junction[i],
                })
                .collect(),
        ))
    }
}

fn check_column(what: &'static str, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(Error::LengthMismatch {
            what,
            left: expected,
            right: actual,
        });
    }
    Ok(())
}

// ─── Reading / writing ──────────────────────────────────────────────────

/// Write all tables of a stage into `dir`, creating it if needed.
pub fn write_stage(dir: impl AsRef<Path>, tables: &PartitionTables) -> Result<()> {
    let dir = dir.as_ref();
    fs::create_dir_all(dir)?;
    write_json(dir.join(SEGMENTS_FILE), &SegmentColumns::from_table(&tables.segments))?;
    write_json(dir.join(RETIRED_FILE), &SegmentColumns::from_table(&tables.retired))?;
    write_json(dir.join(JOINS_FILE), &JoinColumns::from_table(&tables.joins))?;
    write_json(
        dir.join(BARRIER_JOINS_FILE),
        &BarrierJoinColumns::from_table(&tables.barrier_joins),
    )?;
    Ok(())
}

/// Read a stage written by [`write_stage`].
pub fn read_stage(dir: impl AsRef<Path>) -> Result<PartitionTables> {
    let dir = dir.as_ref();
    let segments = read_json::<SegmentColumns>(dir.join(SEGMENTS_FILE))?.into_table()?;
    let joins = read_json::<JoinColumns>(dir.join(JOINS_FILE))?.into_table()?;
    let retired = read_optional::<SegmentColumns>(dir.join(RETIRED_FILE))?.into_table()?;
    let barrier_joins =
        read_optional::<BarrierJoinColumns>(dir.join(BARRIER_JOINS_FILE))?.into_table()?;

    Ok(PartitionTables {
        segments,
        retired,
        joins,
        barrier_joins,
    })
}

/// Read snapped barriers: a JSON array of `{id, segment_id, point: {x, y}}`.
pub fn read_barriers(path: impl AsRef<Path>) -> Result<Vec<Barrier>> {
    read_json(path)
}

/// Serialize any value as JSON into `path`.
pub fn write_json<T: Serialize + ?Sized>(path: impl AsRef<Path>, value: &T) -> Result<()> {
    let file = File::create(path.as_ref())?;
    serde_json::to_writer(BufWriter::new(file), value)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let file = File::open(path.as_ref())?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

fn read_optional<T: DeserializeOwned + Default>(path: PathBuf) -> Result<T> {
    if path.exists() {
        read_json(path)
    } else {
        Ok(T::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample() -> PartitionTables {
        let a = Segment::new(1, 1001, LineString::from(vec![(0.0, 0.0), (0.0, 10.0)]));
        let b = Segment {
            is_loop: true,
            ..Segment::new(2, 1002, LineString::from(vec![(0.0, 10.0), (5.0, 10.0)]))
        };
        let child = a.child(3, LineString::from(vec![(0.0, 0.0), (0.0, 4.0)]), 4.0);

        let mut out = Join::new(2, 0, JoinType::Terminal).with_permanent_ids(1002, 0);
        out.marine = true;

        PartitionTables {
            segments: SegmentTable::from_segments(vec![b, child]).unwrap(),
            retired: SegmentTable::from_segments(vec![a]).unwrap(),
            joins: JoinTable::from_joins(vec![
                Join::new(0, 3, JoinType::Origin).with_permanent_ids(0, 1001),
                Join::new(3, 2, JoinType::Internal).with_permanent_ids(1001, 1002),
                out,
            ]),
            barrier_joins: BarrierJoinTable::from_rows(vec![BarrierJoin::new(
                77,
                3,
                2,
                JoinType::Internal,
            )]),
        }
    }

    #[test]
    fn test_stage_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let stage = stage_dir(dir.path(), "02", "cut");
        let tables = sample();
        write_stage(&stage, &tables).unwrap();

        let reloaded = read_stage(&stage).unwrap();
        assert_eq!(reloaded.joins, tables.joins);
        assert_eq!(reloaded.barrier_joins, tables.barrier_joins);
        assert_eq!(reloaded.retired.len(), 1);

        let child = reloaded.segments.get(3).unwrap();
        assert_eq!(child.parent_id, Some(1));
        assert_eq!(child.permanent_id, 1001);
        assert_relative_eq!(child.length, 4.0, max_relative = 1e-6);
        assert!(reloaded.segments.get(2).unwrap().is_loop);
        assert_eq!(reloaded.segments.get(2).unwrap().parent_id, None);
    }

    #[test]
    fn test_optional_files_default_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut tables = sample();
        write_stage(dir.path(), &tables).unwrap();
        fs::remove_file(dir.path().join(RETIRED_FILE)).unwrap();
        fs::remove_file(dir.path().join(BARRIER_JOINS_FILE)).unwrap();

        let reloaded = read_stage(dir.path()).unwrap();
        tables.retired = SegmentTable::new();
        tables.barrier_joins = BarrierJoinTable::new();
        assert!(reloaded.retired.is_empty());
        assert!(reloaded.barrier_joins.is_empty());
        assert_eq!(reloaded.joins, tables.joins);
    }

    #[test]
    fn test_ragged_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_stage(dir.path(), &sample()).unwrap();
        let ragged = r#"{"upstream":[0],"downstream":[0],"upstream_id":[0,1],
            "downstream_id":[1],"type":["origin"],"marine":[false],
            "great_lakes":[false],"junction":[false]}"#;
        fs::write(dir.path().join(JOINS_FILE), ragged).unwrap();

        assert!(matches!(
            read_stage(dir.path()),
            Err(Error::LengthMismatch { what: "joins", .. })
        ));
    }

    #[test]
    fn test_columns_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        write_stage(dir.path(), &sample()).unwrap();
        let raw = fs::read_to_string(dir.path().join(JOINS_FILE)).unwrap();
        assert!(raw.contains("\"upstream_id\":[0,3,2]"), "{raw}");
        assert!(raw.contains("\"type\":[\"origin\",\"internal\",\"terminal\"]"), "{raw}");
    }

    #[test]
    fn test_read_barriers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("barriers.json");
        write_json(&path, &vec![Barrier::new(5, 3, 0.0, 2.0)]).unwrap();
        let barriers = read_barriers(&path).unwrap();
        assert_eq!(barriers, vec![Barrier::new(5, 3, 0.0, 2.0)]);
    }
}
