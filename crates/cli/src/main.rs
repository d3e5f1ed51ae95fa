//! rivernet CLI - river network topology for barrier prioritization

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use rivernet_algorithms::boundary::merge_partitions;
use rivernet_algorithms::cut::{cut_segments, CutParams};
use rivernet_algorithms::graph::DirectedGraph;
use rivernet_algorithms::joins::{find_downstream_terminals, index_joins, outlets};
use rivernet_algorithms::network::{
    barrier_networks, build_networks, network_stats, NetworkParams,
};
use rivernet_algorithms::pipelines::{remove_pipelines, PipelineParams};
use rivernet_algorithms::validate::validate_joins;
use rivernet_algorithms::vector::extent;
use rivernet_core::io::{read_barriers, read_stage, write_json, write_stage, PartitionTables};
use rivernet_core::{IdAllocator, JoinType, SegmentId};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "rivernet")]
#[command(author, version, about = "River network topology for barrier prioritization", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a stage directory
    Info {
        /// Stage directory
        input: PathBuf,
    },
    /// Cut flowlines at snapped barriers
    Cut {
        /// Input stage directory
        input: PathBuf,
        /// Snapped barriers (JSON)
        barriers: PathBuf,
        /// Output stage directory
        output: PathBuf,
        /// Endpoint tolerance in CRS units
        #[arg(short, long, default_value = "1.0")]
        tolerance: f64,
        /// Partition number, selects the id range for new segments
        #[arg(short, long, default_value = "0")]
        partition: u32,
    },
    /// Drop long and isolated pipelines
    RemovePipelines {
        /// Input stage directory
        input: PathBuf,
        /// Output stage directory
        output: PathBuf,
        /// Pipelines longer than this are dropped
        #[arg(short, long, default_value = "250.0")]
        max_length: f64,
    },
    /// Assign segments to functional networks
    Networks {
        /// Input stage directory
        input: PathBuf,
        /// Output report (JSON)
        output: PathBuf,
        /// Ignore barriers (natural networks)
        #[arg(long)]
        natural: bool,
    },
    /// Merge partitions and resolve their shared boundaries
    Merge {
        /// Output stage directory
        output: PathBuf,
        /// Input stage directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },
}

// ─── Reports ────────────────────────────────────────────────────────────

/// Network report written by `rivernet networks`
#[derive(Serialize)]
struct NetworkReport {
    segment_id: Vec<SegmentId>,
    network_id: Vec<SegmentId>,
    networks: Vec<NetworkRow>,
    barriers: Vec<BarrierRow>,
}

#[derive(Serialize)]
struct NetworkRow {
    network_id: SegmentId,
    segments: usize,
    total_length: f64,
    free_length: f64,
    max_stream_order: u8,
    size_classes: usize,
    flows_to_ocean: bool,
    flows_to_great_lakes: bool,
}

#[derive(Serialize)]
struct BarrierRow {
    barrier_id: u64,
    upstream_networks: Vec<SegmentId>,
    downstream_network: Option<SegmentId>,
    upstream_length: f64,
    downstream_length: f64,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap(),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_tables(path: &Path) -> Result<PartitionTables> {
    let pb = spinner("Reading stage...");
    let tables = read_stage(path).with_context(|| format!("Failed to read stage {}", path.display()))?;
    pb.finish_and_clear();
    info!(
        "Input: {} segments, {} joins",
        tables.segments.len(),
        tables.joins.len()
    );
    Ok(tables)
}

fn write_tables(tables: &PartitionTables, path: &Path) -> Result<()> {
    let pb = spinner("Writing stage...");
    write_stage(path, tables).with_context(|| format!("Failed to write stage {}", path.display()))?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

/// Exit code for a failure: 2 for bad input data, 3 for integrity bugs.
fn exit_code(err: &anyhow::Error) -> u8 {
    match err.chain().find_map(|e| e.downcast_ref::<rivernet_core::Error>()) {
        Some(e) if e.is_data_quality() => 2,
        Some(e) if e.is_integrity() => 3,
        _ => 1,
    }
}

// ─── Commands ───────────────────────────────────────────────────────────

fn info_cmd(input: &Path) -> Result<()> {
    let tables = read_tables(input)?;
    let segments = &tables.segments;
    let joins = &tables.joins;

    let mut kinds: BTreeMap<JoinType, usize> = BTreeMap::new();
    for j in joins.iter() {
        *kinds.entry(j.kind).or_default() += 1;
    }
    let bounds = extent(segments.iter().map(|s| &s.geometry));

    let graph = DirectedGraph::from_joins(joins);
    let roots = graph.roots();
    let loops = graph.find_loops(&roots, None);
    let isolated = index_joins(joins).iter().filter(|r| r.is_isolated()).count();

    println!("Stage: {}", input.display());
    println!(
        "Segments: {} ({:.1} total length), retired: {}",
        segments.len(),
        segments.total_length(),
        tables.retired.len()
    );
    if let Some(max_id) = segments.max_id() {
        println!("Max segment id: {}", max_id);
    }
    if let Some(b) = bounds {
        println!(
            "Bounds: ({:.3}, {:.3}) - ({:.3}, {:.3})",
            b.min().x,
            b.min().y,
            b.max().x,
            b.max().y
        );
    }
    println!("\nJoins: {}", joins.len());
    for (kind, count) in &kinds {
        println!("  {:?}: {}", kind, count);
    }
    println!("Barrier joins: {}", tables.barrier_joins.len());

    println!("\nGraph:");
    println!("  Nodes: {}, edges: {}", graph.node_count(), graph.edge_count());
    println!("  Components: {}", graph.components().len());
    println!("  Headwaters: {}", roots.len());
    println!("  Outlets: {}", outlets(joins).len());
    println!("  Downstream terminals: {}", find_downstream_terminals(joins).len());
    println!("  Loop-closing edges: {}", loops.len());
    println!("  Isolated segments: {}", isolated);

    match validate_joins(segments, joins) {
        Ok(()) => println!("\nJoins valid"),
        Err(e) => println!("\nJoins invalid: {}", e),
    }
    Ok(())
}

fn cut_cmd(input: &Path, barriers: &Path, output: &Path, params: CutParams, partition: u32) -> Result<()> {
    let tables = read_tables(input)?;
    let barriers = read_barriers(barriers)
        .with_context(|| format!("Failed to read barriers {}", barriers.display()))?;
    info!("Barriers: {}", barriers.len());

    let mut allocator = IdAllocator::for_partition(partition)?;
    if let Some(max) = tables.segments.max_id().max(tables.retired.max_id()) {
        allocator.advance_past(max);
    }

    let start = Instant::now();
    let result = cut_segments(
        &tables.segments,
        &tables.joins,
        &tables.barrier_joins,
        &barriers,
        &mut allocator,
        params,
    )
    .context("Failed to cut segments")?;
    let elapsed = start.elapsed();

    let out = PartitionTables {
        segments: result.segments,
        retired: tables.retired.concat(result.retired)?,
        joins: result.joins,
        barrier_joins: result.barrier_joins,
    };
    write_tables(&out, output)?;
    done("Cut", output, elapsed);
    Ok(())
}

fn remove_pipelines_cmd(input: &Path, output: &Path, params: PipelineParams) -> Result<()> {
    let tables = read_tables(input)?;
    let start = Instant::now();
    let removal = remove_pipelines(&tables.segments, &tables.joins, params)
        .context("Failed to remove pipelines")?;
    let elapsed = start.elapsed();
    println!("Removed {} pipelines", removal.removed.len());

    let out = PartitionTables {
        barrier_joins: removal.prune_barrier_joins(&tables.barrier_joins),
        segments: removal.segments,
        joins: removal.joins,
        retired: tables.retired,
    };
    write_tables(&out, output)?;
    done("Pipeline removal", output, elapsed);
    Ok(())
}

fn networks_cmd(input: &Path, output: &Path, params: NetworkParams) -> Result<()> {
    let tables = read_tables(input)?;
    let start = Instant::now();
    let networks = build_networks(&tables.segments, &tables.joins, &tables.barrier_joins, params)
        .context("Failed to build networks")?;
    let stats = network_stats(&networks, &tables.segments, &tables.joins);
    let sides = barrier_networks(&networks, &tables.barrier_joins, &stats);
    let elapsed = start.elapsed();

    let (segment_id, network_id) = networks.iter().unzip();
    let report = NetworkReport {
        segment_id,
        network_id,
        networks: stats
            .into_iter()
            .map(|s| NetworkRow {
                network_id: s.network_id,
                segments: s.segment_count,
                total_length: s.total_length,
                free_length: s.free_length,
                max_stream_order: s.max_stream_order,
                size_classes: s.size_classes,
                flows_to_ocean: s.flows_to_ocean,
                flows_to_great_lakes: s.flows_to_great_lakes,
            })
            .collect(),
        barriers: sides
            .into_iter()
            .map(|b| BarrierRow {
                barrier_id: b.barrier_id,
                upstream_networks: b.upstream_networks,
                downstream_network: b.downstream_network,
                upstream_length: b.upstream_length,
                downstream_length: b.downstream_length,
            })
            .collect(),
    };
    println!("Networks: {}", report.networks.len());

    let pb = spinner("Writing report...");
    write_json(output, &report).context("Failed to write report")?;
    pb.finish_and_clear();
    done("Networks", output, elapsed);
    Ok(())
}

fn merge_cmd(inputs: &[PathBuf], output: &Path) -> Result<()> {
    let parts = inputs
        .iter()
        .map(|p| read_tables(p))
        .collect::<Result<Vec<_>>>()?;
    let start = Instant::now();
    let merged = merge_partitions(parts).context("Failed to merge partitions")?;
    let elapsed = start.elapsed();
    write_tables(&merged, output)?;
    done("Merge", output, elapsed);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Info { input } => info_cmd(&input),
        Commands::Cut {
            input,
            barriers,
            output,
            tolerance,
            partition,
        } => cut_cmd(&input, &barriers, &output, CutParams { tolerance }, partition),
        Commands::RemovePipelines {
            input,
            output,
            max_length,
        } => remove_pipelines_cmd(&input, &output, PipelineParams { max_length }),
        Commands::Networks {
            input,
            output,
            natural,
        } => networks_cmd(
            &input,
            &output,
            NetworkParams {
                break_at_barriers: !natural,
            },
        ),
        Commands::Merge { output, inputs } => merge_cmd(&inputs, &output),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(exit_code(&err))
        }
    }
}
