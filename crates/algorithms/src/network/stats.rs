//! Per-network and per-barrier statistics

use super::Networks;
use rivernet_core::{BarrierId, BarrierJoinTable, JoinTable, SegmentId, SegmentTable, NO_SEGMENT};
use std::collections::{BTreeMap, HashMap, HashSet};

/// Summary of one functional network
#[derive(Debug, Clone, PartialEq)]
pub struct NetworkStats {
    pub network_id: SegmentId,
    pub segment_count: usize,
    pub total_length: f64,
    /// Length of segments not flagged off-network
    pub free_length: f64,
    pub max_stream_order: u8,
    /// Number of distinct size classes
    pub size_classes: usize,
    pub flows_to_ocean: bool,
    pub flows_to_great_lakes: bool,
}

/// Compute statistics for every network, ordered by network id.
///
/// A network flows to the ocean (or the Great Lakes) when one of its
/// segments has an outlet join carrying the marine (great_lakes) flag.
pub fn network_stats(networks: &Networks, segments: &SegmentTable, joins: &JoinTable) -> Vec<NetworkStats> {
    let mut marine = HashSet::new();
    let mut great_lakes = HashSet::new();
    for j in joins.iter().filter(|j| j.downstream_id == NO_SEGMENT && j.upstream_id != NO_SEGMENT) {
        if j.marine {
            marine.insert(j.upstream_id);
        }
        if j.great_lakes {
            great_lakes.insert(j.upstream_id);
        }
    }

    let mut acc: BTreeMap<SegmentId, (NetworkStats, HashSet<u8>)> = BTreeMap::new();
    for (segment_id, network_id) in networks.iter() {
        let Some(segment) = segments.get(segment_id) else {
            continue;
        };
        let (stats, classes) = acc.entry(network_id).or_insert_with(|| {
            (
                NetworkStats {
                    network_id,
                    segment_count: 0,
                    total_length: 0.0,
                    free_length: 0.0,
                    max_stream_order: 0,
                    size_classes: 0,
                    flows_to_ocean: false,
                    flows_to_great_lakes: false,
                },
                HashSet::new(),
            )
        });
        stats.segment_count += 1;
        stats.total_length += segment.length;
        if !segment.off_network {
            stats.free_length += segment.length;
        }
        stats.max_stream_order = stats.max_stream_order.max(segment.stream_order);
        classes.insert(segment.size_class);
        stats.flows_to_ocean |= marine.contains(&segment_id);
        stats.flows_to_great_lakes |= great_lakes.contains(&segment_id);
    }

    acc.into_values()
        .map(|(mut stats, classes)| {
            stats.size_classes = classes.len();
            stats
        })
        .collect()
}

/// Networks on either side of a barrier
#[derive(Debug, Clone, PartialEq)]
pub struct BarrierNetworks {
    pub barrier_id: BarrierId,
    /// Networks draining into the barrier, ascending
    pub upstream_networks: Vec<SegmentId>,
    /// Network below the barrier; `None` at an outlet
    pub downstream_network: Option<SegmentId>,
    pub upstream_length: f64,
    pub downstream_length: f64,
}

/// Upstream and downstream networks of every barrier, ordered by barrier id.
pub fn barrier_networks(
    networks: &Networks,
    barrier_joins: &BarrierJoinTable,
    stats: &[NetworkStats],
) -> Vec<BarrierNetworks> {
    let lengths: HashMap<SegmentId, f64> = stats.iter().map(|s| (s.network_id, s.total_length)).collect();
    let length_of = |id: SegmentId| lengths.get(&id).copied().unwrap_or(0.0);

    let mut out: Vec<BarrierNetworks> = Vec::new();
    for row in barrier_joins.iter() {
        if out.last().map(|b| b.barrier_id) != Some(row.barrier_id) {
            out.push(BarrierNetworks {
                barrier_id: row.barrier_id,
                upstream_networks: Vec::new(),
                downstream_network: None,
                upstream_length: 0.0,
                downstream_length: 0.0,
            });
        }
        let Some(entry) = out.last_mut() else {
            continue;
        };
        if let Some(up) = networks.network_of(row.upstream_id) {
            entry.upstream_networks.push(up);
        }
        if entry.downstream_network.is_none() {
            entry.downstream_network = networks.network_of(row.downstream_id);
        }
    }

    for b in &mut out {
        b.upstream_networks.sort_unstable();
        b.upstream_networks.dedup();
        b.upstream_length = b.upstream_networks.iter().map(|&n| length_of(n)).sum();
        b.downstream_length = b.downstream_network.map(length_of).unwrap_or(0.0);
    }
    out
}
