//! Traversals over a [`DirectedGraph`]
//!
//! All traversals share one visited array per call, reset between start
//! nodes by bumping a generation counter instead of clearing it.

use super::DirectedGraph;
use rivernet_core::{Error, Result, SegmentId};
use std::collections::{HashSet, VecDeque};

/// Generation-stamped visited set over dense node indices.
pub(crate) struct VisitMarks {
    stamps: Vec<u32>,
    epoch: u32,
}

impl VisitMarks {
    pub(crate) fn new(node_count: usize) -> Self {
        Self {
            stamps: vec![0; node_count],
            epoch: 1,
        }
    }

    /// Forget all visits.
    pub(crate) fn reset(&mut self) {
        self.epoch = self.epoch.wrapping_add(1);
        if self.epoch == 0 {
            self.stamps.fill(0);
            self.epoch = 1;
        }
    }

    /// Mark `node`; returns false if it was already marked.
    #[inline]
    pub(crate) fn visit(&mut self, node: u32) -> bool {
        let stamp = &mut self.stamps[node as usize];
        if *stamp == self.epoch {
            false
        } else {
            *stamp = self.epoch;
            true
        }
    }
}

/// An edge found to re-enter an already visited node during [`DirectedGraph::find_loops`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LoopClosure {
    /// The node whose edge closes the loop
    pub predecessor: SegmentId,
    /// The node that was reached a second time
    pub revisited: SegmentId,
}

impl DirectedGraph {
    /// Breadth-first walk along outgoing edges from `start`, calling `f` for
    /// each newly reached node (not `start` itself unless a cycle leads back
    /// to it). Stops after `max_depth` hops.
    fn walk_downstream<F: FnMut(u32) -> bool>(
        &self,
        start: u32,
        max_depth: usize,
        marks: &mut VisitMarks,
        mut f: F,
    ) {
        marks.reset();
        let mut frontier = vec![start];
        let mut next = Vec::new();
        let mut depth = 0;

        while !frontier.is_empty() && depth < max_depth {
            for &node in &frontier {
                for &t in self.out_neighbors(node) {
                    if marks.visit(t) {
                        if !f(t) {
                            return;
                        }
                        next.push(t);
                    }
                }
            }
            std::mem::swap(&mut frontier, &mut next);
            next.clear();
            depth += 1;
        }
    }

    /// Weakly connected components.
    ///
    /// Breadth-first traversal (ignoring edge direction) is started from
    /// every node with outgoing edges that is not yet part of a component,
    /// so every node with at least one edge lands in exactly one component.
    /// Components are listed in order of their smallest start node; each is
    /// sorted ascending.
    pub fn components(&self) -> Vec<Vec<SegmentId>> {
        let n = self.node_count();
        let mut seen = vec![false; n];
        let mut queue = VecDeque::new();
        let mut groups = Vec::new();

        for start in 0..n as u32 {
            if seen[start as usize] || self.out_neighbors(start).is_empty() {
                continue;
            }
            seen[start as usize] = true;
            queue.push_back(start);
            let mut group = Vec::new();

            while let Some(node) = queue.pop_front() {
                group.push(self.id_of(node));
                for &next in self.out_neighbors(node).iter().chain(self.in_neighbors(node)) {
                    if !seen[next as usize] {
                        seen[next as usize] = true;
                        queue.push_back(next);
                    }
                }
            }
            group.sort_unstable();
            groups.push(group);
        }
        groups
    }

    /// All nodes reachable from each of `nodes`, sorted ascending.
    ///
    /// A node is part of its own descendants only if a cycle leads back to
    /// it. Unknown nodes and nodes without outgoing edges yield an empty set.
    pub fn descendants(&self, nodes: &[SegmentId]) -> Vec<Vec<SegmentId>> {
        let mut marks = VisitMarks::new(self.node_count());
        nodes
            .iter()
            .map(|&id| {
                let mut found = Vec::new();
                if let Some(start) = self.index_of(id) {
                    self.walk_downstream(start, usize::MAX, &mut marks, |t| {
                        found.push(self.id_of(t));
                        true
                    });
                }
                found.sort_unstable();
                found
            })
            .collect()
    }

    /// For each pair `(sources[i], targets[i])`, whether the target can be
    /// reached from the source in at most `max_depth` hops (default: node
    /// count).
    pub fn is_reachable(
        &self,
        sources: &[SegmentId],
        targets: &[SegmentId],
        max_depth: Option<usize>,
    ) -> Result<Vec<bool>> {
        if sources.len() != targets.len() {
            return Err(Error::LengthMismatch {
                what: "reachability pairs",
                left: sources.len(),
                right: targets.len(),
            });
        }
        let max_depth = max_depth.unwrap_or(self.node_count());
        let mut marks = VisitMarks::new(self.node_count());

        Ok(sources
            .iter()
            .zip(targets)
            .map(|(&source, &target)| {
                let (Some(s), Some(t)) = (self.index_of(source), self.index_of(target)) else {
                    return false;
                };
                let mut reached = false;
                self.walk_downstream(s, max_depth, &mut marks, |node| {
                    reached = node == t;
                    !reached
                });
                reached
            })
            .collect())
    }

    /// For each candidate set, the members reachable from another member of
    /// the same set, sorted ascending.
    ///
    /// Used to drop candidates that sit upstream of another candidate in
    /// the same group.
    pub fn find_all_parents(
        &self,
        node_sets: &[Vec<SegmentId>],
        max_depth: Option<usize>,
    ) -> Vec<Vec<SegmentId>> {
        let max_depth = max_depth.unwrap_or(self.node_count());
        let mut marks = VisitMarks::new(self.node_count());

        node_sets
            .iter()
            .map(|set| {
                let members: HashSet<SegmentId> = set.iter().copied().collect();
                let mut reached = HashSet::new();
                for &member in &members {
                    let Some(start) = self.index_of(member) else {
                        continue;
                    };
                    self.walk_downstream(start, max_depth, &mut marks, |node| {
                        let id = self.id_of(node);
                        if id != member && members.contains(&id) {
                            reached.insert(id);
                        }
                        true
                    });
                }
                let mut reached: Vec<_> = reached.into_iter().collect();
                reached.sort_unstable();
                reached
            })
            .collect()
    }

    /// Heuristic loop detection.
    ///
    /// Depth-first traversal from each start node; whenever an edge leads to
    /// a node already visited from the same start, the edge is recorded as
    /// loop-closing. This finds braids and divergences that rejoin, but it is
    /// not a full cycle enumeration: only the immediate predecessor of the
    /// revisited node is reported. Results are deduplicated and sorted.
    pub fn find_loops(&self, start_nodes: &[SegmentId], max_depth: Option<usize>) -> Vec<LoopClosure> {
        let max_depth = max_depth.unwrap_or(self.node_count());
        let mut marks = VisitMarks::new(self.node_count());
        let mut closures = HashSet::new();
        let mut stack = Vec::new();

        for &id in start_nodes {
            let Some(start) = self.index_of(id) else {
                continue;
            };
            marks.reset();
            marks.visit(start);
            stack.push((start, 0usize));

            while let Some((node, depth)) = stack.pop() {
                if depth >= max_depth {
                    continue;
                }
                for &next in self.out_neighbors(node) {
                    if marks.visit(next) {
                        stack.push((next, depth + 1));
                    } else {
                        closures.insert(LoopClosure {
                            predecessor: self.id_of(node),
                            revisited: self.id_of(next),
                        });
                    }
                }
            }
        }

        let mut closures: Vec<_> = closures.into_iter().collect();
        closures.sort_unstable();
        closures
    }
}
