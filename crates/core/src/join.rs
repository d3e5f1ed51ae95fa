//! Joins: the directed edges of the drainage network

use crate::ids::{PermanentId, SegmentId, NO_SEGMENT};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Role of a join in the network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinType {
    /// Headwater: nothing upstream
    Origin,
    Internal,
    /// Outlet: nothing downstream
    Terminal,
    /// Flow entering the partition from a neighbor
    HucIn,
    /// Flow leaving the partition into a neighbor
    HucOut,
}

/// Directed edge from `upstream_id` to `downstream_id`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Join {
    pub upstream: PermanentId,
    pub downstream: PermanentId,
    pub upstream_id: SegmentId,
    pub downstream_id: SegmentId,
    #[serde(rename = "type")]
    pub kind: JoinType,
    pub marine: bool,
    pub great_lakes: bool,
    pub junction: bool,
}

impl Join {
    /// Join without permanent ids or flags.
    pub fn new(upstream_id: SegmentId, downstream_id: SegmentId, kind: JoinType) -> Self {
        Self {
            upstream: 0,
            downstream: 0,
            upstream_id,
            downstream_id,
            kind,
            marine: false,
            great_lakes: false,
            junction: false,
        }
    }

    pub fn with_permanent_ids(mut self, upstream: PermanentId, downstream: PermanentId) -> Self {
        self.upstream = upstream;
        self.downstream = downstream;
        self
    }

    pub fn key(&self) -> (SegmentId, SegmentId) {
        (self.upstream_id, self.downstream_id)
    }

    /// Crosses a partition boundary; the far end may be unknown locally.
    pub fn is_boundary(&self) -> bool {
        matches!(self.kind, JoinType::HucIn | JoinType::HucOut)
    }

    pub fn touches(&self, id: SegmentId) -> bool {
        id != NO_SEGMENT && (self.upstream_id == id || self.downstream_id == id)
    }

    pub fn touches_any(&self, ids: &HashSet<SegmentId>) -> bool {
        ids.contains(&self.upstream_id) || ids.contains(&self.downstream_id)
    }
}

/// Edge list of a partition with unique (upstream_id, downstream_id) pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinTable {
    joins: Vec<Join>,
}

impl JoinTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table, keeping the first occurrence of each (upstream_id, downstream_id) pair.
    pub fn from_joins(joins: Vec<Join>) -> Self {
        let mut seen = HashSet::with_capacity(joins.len());
        let joins = joins.into_iter().filter(|j| seen.insert(j.key())).collect();
        Self { joins }
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Join> {
        self.joins.iter()
    }

    pub fn as_slice(&self) -> &[Join] {
        &self.joins
    }

    /// Joins that flow into `id`.
    pub fn upstream_of(&self, id: SegmentId) -> impl Iterator<Item = &Join> {
        self.joins.iter().filter(move |j| id != NO_SEGMENT && j.downstream_id == id)
    }

    /// Joins that flow out of `id`.
    pub fn downstream_of(&self, id: SegmentId) -> impl Iterator<Item = &Join> {
        self.joins.iter().filter(move |j| id != NO_SEGMENT && j.upstream_id == id)
    }

    /// Keep the joins matching `predicate`.
    pub fn filter<F: FnMut(&Join) -> bool>(&self, mut predicate: F) -> Self {
        Self {
            joins: self.joins.iter().filter(|j| predicate(j)).copied().collect(),
        }
    }

    /// Append joins, dropping pairs already present.
    pub fn concat(self, other: impl IntoIterator<Item = Join>) -> Self {
        let mut joins = self.joins;
        joins.extend(other);
        Self::from_joins(joins)
    }

    pub fn into_inner(self) -> Vec<Join> {
        self.joins
    }
}

impl FromIterator<Join> for JoinTable {
    fn from_iter<I: IntoIterator<Item = Join>>(iter: I) -> Self {
        Self::from_joins(iter.into_iter().collect())
    }
}

impl IntoIterator for JoinTable {
    type Item = Join;
    type IntoIter = std::vec::IntoIter<Join>;

    fn into_iter(self) -> Self::IntoIter {
        self.joins.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_joins_drops_duplicate_pairs() {
        let mut first = Join::new(1, 2, JoinType::Internal);
        first.junction = true;
        let table = JoinTable::from_joins(vec![
            first,
            Join::new(1, 2, JoinType::Internal),
            Join::new(2, 0, JoinType::Terminal),
        ]);
        assert_eq!(table.len(), 2);
        assert!(table.as_slice()[0].junction, "first occurrence wins");
    }

    #[test]
    fn test_neighborhood_lookups() {
        let table: JoinTable = vec![
            Join::new(0, 1, JoinType::Origin),
            Join::new(1, 3, JoinType::Internal),
            Join::new(2, 3, JoinType::Internal),
            Join::new(3, 0, JoinType::Terminal),
        ]
        .into_iter()
        .collect();

        let ups: Vec<_> = table.upstream_of(3).map(|j| j.upstream_id).collect();
        assert_eq!(ups, vec![1, 2]);
        let downs: Vec<_> = table.downstream_of(1).map(|j| j.downstream_id).collect();
        assert_eq!(downs, vec![3]);
        assert_eq!(table.upstream_of(0).count(), 0, "sentinel is not a segment");
    }

    #[test]
    fn test_concat_tables() {
        let a = JoinTable::from_joins(vec![Join::new(1, 2, JoinType::Internal)]);
        let b = JoinTable::from_joins(vec![
            Join::new(1, 2, JoinType::Internal),
            Join::new(2, 0, JoinType::Terminal),
        ]);
        let merged = a.concat(b);
        assert_eq!(merged.len(), 2);
        assert_eq!(merged.into_iter().map(|j| j.key()).collect::<Vec<_>>(), vec![(1, 2), (2, 0)]);
    }

    #[test]
    fn test_touches_ignores_sentinel() {
        let j = Join::new(0, 4, JoinType::Origin);
        assert!(j.touches(4));
        assert!(!j.touches(0));
    }

    #[test]
    fn test_type_serializes_snake_case() {
        let j = Join::new(1, 0, JoinType::HucOut);
        let json = serde_json::to_string(&j).unwrap();
        assert!(json.contains("\"type\":\"huc_out\""), "{json}");
    }
}
