//! kcpjoin - Partition a road network and query its K closest pairs
//!
//! A command line tool that builds a partition tree from an edge list and
//! node coordinates, saves it next to a path prefix, and answers top-K
//! closest-pairs queries against a saved tree.

use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Args, Parser, Subcommand};
use kcpjoin_core::graph::io::{load_coordinates, load_edge_list};
use kcpjoin_core::partition::persist;
use kcpjoin_core::{
    AdjacencyGraph, CombineMode, JoinParams, NodeId, ReferenceGraph, build_partition_tree,
    closest_pairs_with,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "kcpjoin")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Use debug logging level
    #[arg(short = 'd', long, global = true, action = ArgAction::SetTrue)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a partition tree and save it under a path prefix
    Partition(PartitionArgs),
    /// Load a saved tree and print the K closest pairs between two node sets
    Query(QueryArgs),
    /// Print the shape of a saved tree
    Info(InfoArgs),
    /// Print the node nearest to a coordinate
    Locate(LocateArgs),
}

/// Edge list input shared by every subcommand that needs the graph.
#[derive(Args, Debug)]
struct GraphArgs {
    /// Edge list: `from to weight` per line
    #[arg(short = 'g', long)]
    graph: PathBuf,

    /// Store every edge in both directions
    #[arg(short = 'u', long, action = ArgAction::SetTrue)]
    undirected: bool,
}

#[derive(Args, Debug)]
struct PartitionArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Node coordinates: `id x y` per line
    #[arg(short = 'c', long)]
    coords: PathBuf,

    /// Target number of leaves
    #[arg(short = 'l', long, default_value = "16")]
    leaves: usize,

    /// Size-balance smoothing in [0, 1]
    #[arg(short = 'a', long, default_value = "0.5")]
    alpha: f64,

    /// Output path prefix (`<prefix>.vert`, `<prefix>0.vert`, ...)
    #[arg(short = 'o', long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct QueryArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Path prefix of a saved tree
    #[arg(short = 't', long)]
    tree: PathBuf,

    /// Comma-separated source node ids
    #[arg(short = 'r', long = "sources", value_delimiter = ',', required = true)]
    r: Vec<NodeId>,

    /// Comma-separated target node ids
    #[arg(short = 's', long = "targets", value_delimiter = ',', required = true)]
    s: Vec<NodeId>,

    /// Number of pairs to return
    #[arg(short = 'k', long, default_value = "10")]
    k: usize,

    /// Only report pairs closer than this distance
    #[arg(long)]
    threshold: Option<f32>,

    /// Worker threads (0 = all cores)
    #[arg(short = 'p', long, default_value = "0")]
    parallelism: usize,

    /// Merge results bottom-up instead of through one shared set
    #[arg(long, action = ArgAction::SetTrue)]
    hierarchical: bool,

    /// Stop exploring after this many milliseconds
    #[arg(long = "deadline-ms")]
    deadline_ms: Option<u64>,
}

#[derive(Args, Debug)]
struct InfoArgs {
    #[command(flatten)]
    graph: GraphArgs,

    /// Path prefix of a saved tree
    #[arg(short = 't', long)]
    tree: PathBuf,
}

#[derive(Args, Debug)]
struct LocateArgs {
    /// Node coordinates: `id x y` per line
    #[arg(short = 'c', long)]
    coords: PathBuf,

    #[arg(allow_negative_numbers = true)]
    x: f64,

    #[arg(allow_negative_numbers = true)]
    y: f64,
}

fn init_logging(debug: bool) {
    let default = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn load_graph(args: &GraphArgs) -> Result<Arc<AdjacencyGraph>> {
    let graph = load_edge_list(&args.graph, !args.undirected)
        .with_context(|| format!("failed to load graph {}", args.graph.display()))?;
    Ok(Arc::new(graph))
}

fn load_tree(
    graph: Arc<AdjacencyGraph>,
    prefix: &Path,
) -> Result<kcpjoin_core::PartitionTree<AdjacencyGraph>> {
    persist::load(graph, prefix)
        .with_context(|| format!("failed to load partition tree {}", prefix.display()))
}

fn run_partition(args: &PartitionArgs) -> Result<()> {
    let graph = load_graph(&args.graph)?;
    let coords = load_coordinates(&args.coords)
        .with_context(|| format!("failed to load coordinates {}", args.coords.display()))?;
    let tree = build_partition_tree(graph, &coords, args.leaves, args.alpha)?;
    persist::save(tree.root(), &args.out)
        .with_context(|| format!("failed to save partition tree {}", args.out.display()))?;
    println!(
        "{} leaves, {} nodes, depth {}",
        tree.leaf_count(),
        tree.partition_size(),
        tree.depth()
    );
    Ok(())
}

fn run_query(args: &QueryArgs) -> Result<()> {
    let graph = load_graph(&args.graph)?;
    let tree = load_tree(graph, &args.tree)?;

    let mut params = JoinParams::new(
        args.k,
        args.threshold.unwrap_or(f32::INFINITY),
        args.parallelism,
    );
    if args.hierarchical {
        params = params.with_mode(CombineMode::Hierarchical);
    }
    if let Some(ms) = args.deadline_ms {
        params = params.with_deadline(Duration::from_millis(ms));
    }

    tracing::debug!(
        "Query {} sources x {} targets with {:?}",
        args.r.len(),
        args.s.len(),
        params
    );
    let outcome = closest_pairs_with(&tree, &args.r, &args.s, params)?;
    let mut out = BufWriter::new(io::stdout().lock());
    for pair in &outcome.pairs {
        writeln!(out, "{}\t{}\t{}", pair.from, pair.to, pair.weight)?;
    }
    out.flush()?;

    if !outcome.complete {
        bail!(
            "deadline expired: {} of {} pairs found, result may be incomplete",
            outcome.pairs.len(),
            args.k
        );
    }
    Ok(())
}

fn run_info(args: &InfoArgs) -> Result<()> {
    let graph = load_graph(&args.graph)?;
    let tree = load_tree(graph, &args.tree)?;
    println!("nodes\t{}", tree.graph().node_count());
    println!("partitions\t{}", tree.partition_size());
    println!("leaves\t{}", tree.leaf_count());
    println!("depth\t{}", tree.depth());
    for (i, leaf) in tree.root().leaves().iter().enumerate() {
        println!(
            "leaf {i}\t{} vertices\t{} cross-edges\tseparation {}",
            leaf.vertices().len(),
            leaf.crossedges().len(),
            leaf.separation_degree()
        );
    }
    Ok(())
}

fn run_locate(args: &LocateArgs) -> Result<()> {
    let coords = load_coordinates(&args.coords)
        .with_context(|| format!("failed to load coordinates {}", args.coords.display()))?;
    match coords.nearest(args.x, args.y) {
        Some(node) => {
            println!("{node}");
            Ok(())
        }
        None => bail!("no coordinates in {}", args.coords.display()),
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug);

    match &cli.command {
        Command::Partition(args) => run_partition(args),
        Command::Query(args) => run_query(args),
        Command::Info(args) => run_info(args),
        Command::Locate(args) => run_locate(args),
    }
}
