//! Directed graph over segment ids
//!
//! The graph is an adjacency index built once from parallel
//! (source, target) arrays and shared by every traversal:
//! - sparse segment ids are mapped to dense node indices through a sorted
//!   side table;
//! - outgoing and incoming edges are stored in CSR form (an offset array
//!   plus a flattened neighbor array), so a node costs two `usize` offsets
//!   and its edges four bytes each.
//!
//! Duplicate edges are kept as given; filtering them is up to the caller.

mod traversal;

pub use traversal::LoopClosure;

use rivernet_core::{Error, JoinTable, Result, SegmentId, NO_SEGMENT};

/// Compressed sparse row adjacency.
#[derive(Debug, Clone, Default)]
struct Csr {
    offsets: Vec<usize>,
    neighbors: Vec<u32>,
}

impl Csr {
    fn build(node_count: usize, from: &[u32], to: &[u32]) -> Self {
        let mut offsets = vec![0usize; node_count + 1];
        for &f in from {
            offsets[f as usize + 1] += 1;
        }
        for i in 0..node_count {
            offsets[i + 1] += offsets[i];
        }

        let mut cursor = offsets[..node_count].to_vec();
        let mut neighbors = vec![0u32; from.len()];
        for (&f, &t) in from.iter().zip(to) {
            let slot = &mut cursor[f as usize];
            neighbors[*slot] = t;
            *slot += 1;
        }
        Self { offsets, neighbors }
    }

    #[inline]
    fn row(&self, node: u32) -> &[u32] {
        let n = node as usize;
        &self.neighbors[self.offsets[n]..self.offsets[n + 1]]
    }
}

/// Adjacency index over a snapshot of segment edges.
#[derive(Debug, Clone, Default)]
pub struct DirectedGraph {
    /// Dense index -> segment id, sorted ascending
    ids: Vec<SegmentId>,
    outgoing: Csr,
    incoming: Csr,
}

impl DirectedGraph {
    /// Build from parallel `sources` / `targets` arrays.
    ///
    /// Every id in either array becomes a node, including `0` if the caller
    /// passes it; use [`from_joins`](Self::from_joins) to drop the sentinel.
    pub fn new(sources: &[SegmentId], targets: &[SegmentId]) -> Result<Self> {
        if sources.len() != targets.len() {
            return Err(Error::LengthMismatch {
                what: "graph edges",
                left: sources.len(),
                right: targets.len(),
            });
        }
        let edges: Vec<(SegmentId, SegmentId)> = sources.iter().copied().zip(targets.iter().copied()).collect();
        Ok(Self::from_edges(&edges))
    }

    /// Build the upstream → downstream graph of a join table, skipping joins
    /// that touch the zero sentinel.
    pub fn from_joins(joins: &JoinTable) -> Self {
        let edges: Vec<(SegmentId, SegmentId)> = joins
            .iter()
            .filter(|j| j.upstream_id != NO_SEGMENT && j.downstream_id != NO_SEGMENT)
            .map(|j| (j.upstream_id, j.downstream_id))
            .collect();
        Self::from_edges(&edges)
    }

    fn from_edges(edges: &[(SegmentId, SegmentId)]) -> Self {
        let mut ids: Vec<SegmentId> = edges.iter().flat_map(|&(s, t)| [s, t]).collect();
        ids.sort_unstable();
        ids.dedup();

        let dense = |id: SegmentId| match ids.binary_search(&id) {
            Ok(i) | Err(i) => i as u32,
        };
        let (from, to): (Vec<u32>, Vec<u32>) = edges.iter().map(|&(s, t)| (dense(s), dense(t))).unzip();

        let outgoing = Csr::build(ids.len(), &from, &to);
        let incoming = Csr::build(ids.len(), &to, &from);

        Self {
            ids,
            outgoing,
            incoming,
        }
    }

    pub fn node_count(&self) -> usize {
        self.ids.len()
    }

    pub fn edge_count(&self) -> usize {
        self.outgoing.neighbors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// All node ids in ascending order.
    pub fn nodes(&self) -> &[SegmentId] {
        &self.ids
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.index_of(id).is_some()
    }

    /// Direct downstream neighbors of `id`.
    pub fn targets(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.index_of(id)
            .map(|i| self.outgoing.row(i))
            .unwrap_or(&[])
            .iter()
            .map(move |&t| self.ids[t as usize])
    }

    /// Direct upstream neighbors of `id`.
    pub fn sources(&self, id: SegmentId) -> impl Iterator<Item = SegmentId> + '_ {
        self.index_of(id)
            .map(|i| self.incoming.row(i))
            .unwrap_or(&[])
            .iter()
            .map(move |&s| self.ids[s as usize])
    }

    /// Nodes with outgoing edges and no incoming edges, ascending.
    pub fn roots(&self) -> Vec<SegmentId> {
        (0..self.ids.len() as u32)
            .filter(|&i| self.incoming.row(i).is_empty() && !self.outgoing.row(i).is_empty())
            .map(|i| self.ids[i as usize])
            .collect()
    }

    #[inline]
    pub(crate) fn index_of(&self, id: SegmentId) -> Option<u32> {
        self.ids.binary_search(&id).ok().map(|i| i as u32)
    }

    #[inline]
    pub(crate) fn id_of(&self, index: u32) -> SegmentId {
        self.ids[index as usize]
    }

    #[inline]
    pub(crate) fn out_neighbors(&self, index: u32) -> &[u32] {
        self.outgoing.row(index)
    }

    #[inline]
    pub(crate) fn in_neighbors(&self, index: u32) -> &[u32] {
        self.incoming.row(index)
    }
}
