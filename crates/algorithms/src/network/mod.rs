//! Functional networks
//!
//! A functional network is the set of segments reachable downstream from a
//! root without crossing a barrier. Networks are identified by the segment
//! id of their canonical root.
//!
//! Construction:
//! 1. Build a [`DirectedGraph`] from joins between live non-loop segments,
//!    leaving out zero-sentinel edges and edges crossed by a barrier.
//! 2. Walk downstream from every root (in-degree 0: headwaters, segments just
//!    below a barrier, segments fed only by an unresolved boundary join),
//!    claiming unclaimed segments.
//! 3. A walk that reaches a segment claimed by another walk merges with it;
//!    the merged network keeps the id of the walk that claimed the most
//!    segments (ties to the lowest root id).
//! 4. Segments no walk reached (closed cycles, isolated segments) become
//!    roots of their own.

mod merge;
mod stats;

pub use stats::{barrier_networks, network_stats, BarrierNetworks, NetworkStats};

use crate::graph::DirectedGraph;
use crate::validate::validate_networks;
use merge::UnionFind;
use rivernet_core::{
    Algorithm, BarrierJoinTable, Error, JoinTable, Result, SegmentId, SegmentTable, NO_SEGMENT,
};
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};

/// Parameters for network construction
#[derive(Debug, Clone)]
pub struct NetworkParams {
    /// Treat barrier joins as breaks; off yields natural networks
    pub break_at_barriers: bool,
}

impl Default for NetworkParams {
    fn default() -> Self {
        Self { break_at_barriers: true }
    }
}

/// Segment → network assignment, sorted by segment id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Networks {
    assignments: Vec<(SegmentId, SegmentId)>,
}

impl Networks {
    /// Build from (segment id, network id) pairs. Exact duplicates collapse;
    /// conflicting pairs are kept for [`validate_networks`] to report.
    pub fn from_assignments(mut assignments: Vec<(SegmentId, SegmentId)>) -> Self {
        assignments.sort_unstable();
        assignments.dedup();
        Self { assignments }
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Network containing `segment_id`.
    pub fn network_of(&self, segment_id: SegmentId) -> Option<SegmentId> {
        let i = self.assignments.partition_point(|&(s, _)| s < segment_id);
        self.assignments
            .get(i)
            .filter(|&&(s, _)| s == segment_id)
            .map(|&(_, n)| n)
    }

    /// (segment id, network id) pairs.
    pub fn iter(&self) -> impl Iterator<Item = (SegmentId, SegmentId)> + '_ {
        self.assignments.iter().copied()
    }

    /// Distinct network ids, ascending.
    pub fn network_ids(&self) -> Vec<SegmentId> {
        let mut ids: Vec<SegmentId> = self.assignments.iter().map(|&(_, n)| n).collect();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn members(&self, network_id: SegmentId) -> Vec<SegmentId> {
        self.assignments
            .iter()
            .filter(|&&(_, n)| n == network_id)
            .map(|&(s, _)| s)
            .collect()
    }
}

/// Input tables for [`NetworkBuilder`]
#[derive(Debug, Clone)]
pub struct NetworkInput {
    pub segments: SegmentTable,
    pub joins: JoinTable,
    pub barrier_joins: BarrierJoinTable,
}

/// Functional network builder
#[derive(Debug, Clone, Default)]
pub struct NetworkBuilder;

impl Algorithm for NetworkBuilder {
    type Input = NetworkInput;
    type Output = Networks;
    type Params = NetworkParams;
    type Error = Error;

    fn name(&self) -> &'static str {
        "NetworkBuilder"
    }

    fn description(&self) -> &'static str {
        "Assign every segment to one functional network bounded by barriers"
    }

    fn execute(&self, input: Self::Input, params: Self::Params) -> Result<Self::Output> {
        build_networks(&input.segments, &input.joins, &input.barrier_joins, params)
    }
}

const UNCLAIMED: usize = usize::MAX;

/// Downstream walks over the graph, one per root.
struct Claims<'g> {
    graph: &'g DirectedGraph,
    owner: Vec<usize>,
    roots: Vec<SegmentId>,
    claimed: Vec<usize>,
    sets: UnionFind,
}

impl<'g> Claims<'g> {
    fn new(graph: &'g DirectedGraph) -> Self {
        Self {
            graph,
            owner: vec![UNCLAIMED; graph.node_count()],
            roots: Vec::new(),
            claimed: Vec::new(),
            sets: UnionFind::new(),
        }
    }

    fn is_claimed(&self, node: u32) -> bool {
        self.owner[node as usize] != UNCLAIMED
    }

    fn walk_from(&mut self, start: u32) {
        let graph = self.graph;
        let walk = self.sets.push();
        self.roots.push(graph.id_of(start));
        self.owner[start as usize] = walk;
        let mut count = 1;

        let mut queue = vec![start];
        while let Some(node) = queue.pop() {
            for &next in graph.out_neighbors(node) {
                match self.owner[next as usize] {
                    UNCLAIMED => {
                        self.owner[next as usize] = walk;
                        count += 1;
                        queue.push(next);
                    }
                    other if other != walk => self.sets.union(other, walk),
                    _ => {}
                }
            }
        }
        self.claimed.push(count);
    }

    /// Canonical network id per node.
    fn resolve(mut self) -> Vec<(SegmentId, SegmentId)> {
        let mut best: HashMap<usize, usize> = HashMap::new();
        for walk in 0..self.sets.len() {
            let set = self.sets.find(walk);
            let entry = best.entry(set).or_insert(walk);
            let current = *entry;
            let better = self.claimed[walk] > self.claimed[current]
                || (self.claimed[walk] == self.claimed[current]
                    && self.roots[walk] < self.roots[current]);
            if better {
                *entry = walk;
            }
        }

        let mut out = Vec::with_capacity(self.owner.len());
        for (node, &walk) in self.owner.iter().enumerate() {
            let set = self.sets.find(walk);
            out.push((self.graph.id_of(node as u32), self.roots[best[&set]]));
        }
        out
    }
}

/// Assign every live non-loop segment to exactly one network.
pub fn build_networks(
    segments: &SegmentTable,
    joins: &JoinTable,
    barrier_joins: &BarrierJoinTable,
    params: NetworkParams,
) -> Result<Networks> {
    let active = |id: SegmentId| segments.get(id).is_some_and(|s| !s.is_loop);
    let breaks: HashSet<(SegmentId, SegmentId)> = if params.break_at_barriers {
        barrier_joins
            .iter()
            .filter(|b| b.upstream_id != NO_SEGMENT && b.downstream_id != NO_SEGMENT)
            .map(|b| (b.upstream_id, b.downstream_id))
            .collect()
    } else {
        HashSet::new()
    };

    let (sources, targets): (Vec<SegmentId>, Vec<SegmentId>) = joins
        .iter()
        .filter(|j| j.upstream_id != NO_SEGMENT && j.downstream_id != NO_SEGMENT)
        .filter(|j| active(j.upstream_id) && active(j.downstream_id))
        .filter(|j| !breaks.contains(&j.key()))
        .map(|j| j.key())
        .unzip();
    let graph = DirectedGraph::new(&sources, &targets)?;

    let mut claims = Claims::new(&graph);
    for root in graph.roots() {
        if let Some(node) = graph.index_of(root) {
            claims.walk_from(node);
        }
    }

    let mut cyclic = 0;
    for node in 0..graph.node_count() as u32 {
        if !claims.is_claimed(node) {
            cyclic += 1;
            claims.walk_from(node);
        }
    }
    if cyclic > 0 {
        debug!(cyclic, "artificial roots for segments on closed cycles");
    }

    let mut assignments = claims.resolve();
    let before = assignments.len();
    assignments.extend(
        segments
            .iter()
            .filter(|s| !s.is_loop && !graph.contains(s.id))
            .map(|s| (s.id, s.id)),
    );
    let isolated = assignments.len() - before;

    let networks = Networks::from_assignments(assignments);
    validate_networks(&networks, segments)?;

    info!(
        networks = networks.network_ids().len(),
        segments = networks.len(),
        isolated,
        edges = graph.edge_count(),
        "built networks"
    );
    Ok(networks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::LineString;
    use rivernet_core::{BarrierJoin, Join, JoinType, Segment};

    fn seg(id: SegmentId) -> Segment {
        Segment::new(id, id as u64, LineString::from(vec![(0.0, 0.0), (0.0, 10.0)]))
    }

    fn table(ids: &[SegmentId]) -> SegmentTable {
        SegmentTable::from_segments(ids.iter().map(|&id| seg(id)).collect()).unwrap()
    }

    /// 1 and 2 join into 3, which flows into 4.
    fn tree() -> JoinTable {
        JoinTable::from_joins(vec![
            Join::new(0, 1, JoinType::Origin),
            Join::new(0, 2, JoinType::Origin),
            Join::new(1, 3, JoinType::Internal),
            Join::new(2, 3, JoinType::Internal),
            Join::new(3, 4, JoinType::Internal),
            Join::new(4, 0, JoinType::Terminal),
        ])
    }

    #[test]
    fn test_converging_walks_merge() {
        let networks = build_networks(
            &table(&[1, 2, 3, 4]),
            &tree(),
            &BarrierJoinTable::new(),
            NetworkParams::default(),
        )
        .unwrap();
        // root 1 claims 1, 3, 4; root 2 claims only itself
        assert_eq!(networks.network_ids(), vec![1]);
        assert_eq!(networks.members(1), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_barrier_splits_network() {
        let barriers = BarrierJoinTable::from_rows(vec![BarrierJoin::new(9, 3, 4, JoinType::Internal)]);
        let networks = build_networks(
            &table(&[1, 2, 3, 4]),
            &tree(),
            &barriers,
            NetworkParams::default(),
        )
        .unwrap();
        assert_eq!(networks.network_ids(), vec![1, 4]);
        assert_eq!(networks.network_of(3), Some(1));
        assert_eq!(networks.network_of(4), Some(4));

        let natural = build_networks(
            &table(&[1, 2, 3, 4]),
            &tree(),
            &barriers,
            NetworkParams { break_at_barriers: false },
        )
        .unwrap();
        assert_eq!(natural.network_ids(), vec![1]);
    }

    #[test]
    fn test_canonical_id_prefers_larger_walk() {
        // 5 -> 7 and 6 -> 9 -> 10 -> 7; walk 5 claims {5, 7}, walk 6 claims {6, 9, 10}
        let joins = JoinTable::from_joins(vec![
            Join::new(5, 7, JoinType::Internal),
            Join::new(6, 9, JoinType::Internal),
            Join::new(9, 10, JoinType::Internal),
            Join::new(10, 7, JoinType::Internal),
        ]);
        let segments = table(&[5, 6, 7, 9, 10]);
        let networks =
            build_networks(&segments, &joins, &BarrierJoinTable::new(), NetworkParams::default()).unwrap();
        assert_eq!(networks.network_ids(), vec![6]);
    }

    #[test]
    fn test_tie_goes_to_lowest_root() {
        // walk 5 claims {5, 7}, walk 6 claims {6, 9}
        let joins = JoinTable::from_joins(vec![
            Join::new(5, 7, JoinType::Internal),
            Join::new(6, 9, JoinType::Internal),
            Join::new(9, 7, JoinType::Internal),
        ]);
        let segments = table(&[5, 6, 7, 9]);
        let networks =
            build_networks(&segments, &joins, &BarrierJoinTable::new(), NetworkParams::default()).unwrap();
        assert_eq!(networks.network_ids(), vec![5]);
        assert_eq!(networks.members(5), vec![5, 6, 7, 9]);
    }

    #[test]
    fn test_cycle_and_isolated_segments() {
        let joins = JoinTable::from_joins(vec![
            Join::new(10, 11, JoinType::Internal),
            Join::new(11, 10, JoinType::Internal),
        ]);
        let networks =
            build_networks(&table(&[10, 11, 12]), &joins, &BarrierJoinTable::new(), NetworkParams::default())
                .unwrap();
        assert_eq!(networks.network_of(10), Some(10));
        assert_eq!(networks.network_of(11), Some(10));
        assert_eq!(networks.network_of(12), Some(12));
    }

    #[test]
    fn test_loops_excluded() {
        let mut segments: Vec<Segment> = [1, 2, 3, 4].iter().map(|&id| seg(id)).collect();
        segments[1].is_loop = true;
        let networks = build_networks(
            &SegmentTable::from_segments(segments).unwrap(),
            &tree(),
            &BarrierJoinTable::new(),
            NetworkParams::default(),
        )
        .unwrap();
        assert_eq!(networks.network_of(2), None);
        assert_eq!(networks.members(1), vec![1, 3, 4]);
    }

    #[test]
    fn test_networks_lookup() {
        let n = Networks::from_assignments(vec![(3, 1), (1, 1), (2, 2), (3, 1)]);
        assert_eq!(n.len(), 3);
        assert_eq!(n.network_of(3), Some(1));
        assert_eq!(n.network_of(4), None);
        assert_eq!(n.iter().collect::<Vec<_>>(), vec![(1, 1), (2, 2), (3, 1)]);
    }
}
