//! partcost CLI: estimate workload cost under a partitioning design and score
//! execution-path predictions.

use clap::{Parser, Subcommand};
use partcost_core::prelude::{Catalog, CatalogKey, CostModelConfig, Workload};
use partcost_markov::{verify_graph, MarkovGraphsContainer, TransactionPathState};
use partcost_model::{MarkovCostModel, SingleSitedCostModel};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "partcost")]
#[command(about = "Workload cost estimation for partitioned OLTP designs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Estimate the coordination cost of a workload
    Estimate {
        /// Catalog YAML file
        #[arg(short, long)]
        catalog: PathBuf,

        /// Workload JSON file
        #[arg(short, long)]
        workload: PathBuf,

        /// Invalidate an entity (`table:NAME`, `procedure:NAME`,
        /// `statement:PROC.STMT`) and re-estimate from the warm cache
        #[arg(long)]
        invalidate: Vec<String>,

        /// Write a JSON cost report to this path
        #[arg(long)]
        report: Option<PathBuf>,
    },

    /// Show per-entity and per-partition cost breakdown
    Explain {
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(short, long)]
        workload: PathBuf,

        /// Only list the N most expensive entities
        #[arg(long, default_value = "20")]
        top: usize,
    },

    /// Score estimated vs. actual execution paths
    Paths {
        /// Markov graphs JSON file
        #[arg(short, long)]
        graphs: PathBuf,

        /// Transaction path states JSON file
        #[arg(short, long)]
        states: PathBuf,
    },

    /// Load and cross-check input documents
    Validate {
        #[arg(short, long)]
        catalog: PathBuf,

        #[arg(short, long)]
        workload: Option<PathBuf>,

        #[arg(short, long)]
        graphs: Option<PathBuf>,
    },
}

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Estimate {
            catalog,
            workload,
            invalidate,
            report,
        } => estimate(&catalog, &workload, &invalidate, report.as_deref()),
        Commands::Explain {
            catalog,
            workload,
            top,
        } => explain(&catalog, &workload, top),
        Commands::Paths { graphs, states } => score_paths(&graphs, &states),
        Commands::Validate {
            catalog,
            workload,
            graphs,
        } => validate(&catalog, workload.as_deref(), graphs.as_deref()),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn load_catalog(path: &Path) -> Result<Catalog, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

fn load_workload(path: &Path) -> Result<Workload, Box<dyn std::error::Error>> {
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

fn parse_keys(raw: &[String]) -> Result<Vec<CatalogKey>, Box<dyn std::error::Error>> {
    let mut keys = Vec::with_capacity(raw.len());
    for s in raw {
        let key = s
            .parse::<CatalogKey>()
            .map_err(|e| format!("bad --invalidate '{s}': {e}"))?;
        keys.push(key);
    }
    Ok(keys)
}

fn estimate(
    catalog_path: &Path,
    workload_path: &Path,
    invalidate: &[String],
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let started_ms = now_ms();
    let catalog = load_catalog(catalog_path)?;
    let workload = load_workload(workload_path)?;
    let keys = parse_keys(invalidate)?;

    let config = CostModelConfig::from_env();
    let mut model = SingleSitedCostModel::new(&catalog, &config)?;
    let mut total = model.estimate_workload_cost(&catalog, &workload)?;
    tracing::info!(txns = workload.len(), total, "cold estimate");

    if !keys.is_empty() {
        for key in &keys {
            model.invalidate_cache(key)?;
        }
        let replays_before = model.stats().txn_replays;
        total = model.estimate_workload_cost(&catalog, &workload)?;
        println!(
            "Re-estimated after invalidating {} entities ({} transactions replayed)",
            keys.len(),
            model.stats().txn_replays - replays_before
        );
    }

    println!("✓ Workload estimated");
    println!("  Transactions: {}", workload.len());
    println!("  Single-sited: {}", model.single_sited_count());
    println!("  Multi-partition: {}", model.multi_partition_count());
    println!("  Total cost: {:.4}", total);

    if let Some(path) = report_path {
        let report = model.report(&catalog, &workload, started_ms, now_ms())?;
        fs::write(path, serde_json::to_string_pretty(&report)?)?;
        println!("  Report: {} ({})", path.display(), report.id.0);
    }

    Ok(())
}

fn explain(
    catalog_path: &Path,
    workload_path: &Path,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(catalog_path)?;
    let workload = load_workload(workload_path)?;
    let mut model = SingleSitedCostModel::new(&catalog, &CostModelConfig::from_env())?;
    let total = model.estimate_workload_cost(&catalog, &workload)?;

    println!("Workload Cost Breakdown");
    println!("=======================");
    println!();
    println!("Partitions: {}", catalog.num_partitions);
    println!("Transactions: {}", workload.len());
    println!("Total cost: {:.4}", total);
    println!();

    let mut entities: Vec<_> = model.entity_costs().into_iter().collect();
    entities.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    println!("Entity contributions (overlapping):");
    for (key, cost) in entities.iter().take(top) {
        println!("  {:<40} {:>12.4}", key.to_string(), cost);
    }
    println!();

    println!("Transactions per partition:");
    for (partition, count) in model.partition_histogram() {
        println!("  {:>4}  {}", partition.get(), count);
    }

    Ok(())
}

fn score_paths(graphs_path: &Path, states_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let graphs: MarkovGraphsContainer = serde_json::from_str(&fs::read_to_string(graphs_path)?)?;
    let states: Vec<TransactionPathState> =
        serde_json::from_str(&fs::read_to_string(states_path)?)?;

    let mut model = MarkovCostModel::new(&CostModelConfig::from_env())?;
    let total = model.estimate_workload_cost(&graphs, &states)?;

    println!("✓ Scored {} transactions against {} graphs", states.len(), graphs.len());
    println!("  Total penalty cost: {:.4}", total);
    if model.histogram().total() > 0 {
        println!("  Penalties:");
        for (penalty, count) in model.histogram().iter() {
            println!("    {:<24} {}", penalty, count);
        }
    }
    Ok(())
}

/// Statements must only reference tables the catalog declares.
fn check_catalog(catalog: &Catalog) -> Result<(), String> {
    if catalog.num_partitions == 0 {
        return Err("catalog declares zero partitions".into());
    }
    for proc_ in catalog.procedures.values() {
        for stmt in &proc_.statements {
            for table in stmt.tables_read.iter().chain(&stmt.tables_written) {
                if catalog.table(table).is_none() {
                    return Err(format!(
                        "statement {}.{} references unknown table '{}'",
                        proc_.name, stmt.name, table
                    ));
                }
            }
        }
    }
    Ok(())
}

fn validate(
    catalog_path: &Path,
    workload_path: Option<&Path>,
    graphs_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = load_catalog(catalog_path)?;
    check_catalog(&catalog)?;
    println!(
        "✓ Catalog is valid ({} tables, {} procedures)",
        catalog.tables.len(),
        catalog.procedures.len()
    );

    if let Some(path) = workload_path {
        let workload = load_workload(path)?;
        // Replaying every transaction resolves every procedure, statement and table.
        let mut model = SingleSitedCostModel::new(&catalog, &CostModelConfig::default())?;
        model.estimate_workload_cost(&catalog, &workload)?;
        println!("✓ Workload is valid ({} transactions)", workload.len());
    }

    if let Some(path) = graphs_path {
        let graphs: MarkovGraphsContainer = serde_json::from_str(&fs::read_to_string(path)?)?;
        for graph in graphs.iter() {
            verify_graph(graph)?;
            if catalog.procedure(graph.procedure()).is_none() {
                return Err(format!("graph for unknown procedure '{}'", graph.procedure()).into());
            }
        }
        println!("✓ Graphs are valid ({} graphs)", graphs.len());
    }

    Ok(())
}
