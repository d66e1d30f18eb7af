//! Vantage CLI binary.
//!
//! Evaluates metric catalogs against calculation contexts, one at a time or
//! in bounded-concurrency batches, and inspects catalogs before use.

mod batch;
mod config;
mod report;

use batch::{BatchRunner, cancel_on_ctrl_c, load_contexts};
use clap::{Parser, Subcommand, ValueEnum};
use config::CliConfig;
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::process;
use tracing::info;
use tracing_subscriber::EnvFilter;
use vantage::data::CalculationContext;
use vantage::metrics::{MetricCatalog, MetricEngine};
use vantage::output::{ExportFormat, Exporter, MetricRow, ValuationRow};
use vantage::valuation::{SectorAverages, ValuationDeriver};
use vantage::{ValuationInputs, assess};

#[derive(Parser)]
#[command(name = "vantage")]
#[command(about = "Vantage: catalog-driven fundamental metrics", long_about = None)]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/vantage/config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Format {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate one context
    Evaluate {
        /// Metric catalog JSON
        #[arg(long)]
        catalog: PathBuf,

        /// Calculation context JSON
        #[arg(long)]
        context: PathBuf,

        /// Sector average multiples JSON
        #[arg(long)]
        sector: Option<PathBuf>,

        /// Current price (default: the context's `currentPrice` custom value)
        #[arg(long)]
        price: Option<f64>,

        /// Consensus target (default: the context's `consensusTarget` custom value)
        #[arg(long)]
        target: Option<f64>,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Evaluate many contexts concurrently
    Batch {
        /// Metric catalog JSON
        #[arg(long)]
        catalog: PathBuf,

        /// Context file (object or array) or directory of context files
        #[arg(long)]
        contexts: PathBuf,

        /// Sector average multiples JSON
        #[arg(long)]
        sector: Option<PathBuf>,

        /// Contexts evaluated concurrently
        #[arg(long)]
        concurrency: Option<usize>,

        /// Per-context time limit in milliseconds
        #[arg(long)]
        timeout_ms: Option<u64>,

        /// Metric rows output (.csv or .json)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Valuation rows output (.csv or .json)
        #[arg(long)]
        valuations: Option<PathBuf>,

        /// Hide the progress bar
        #[arg(long)]
        no_progress: bool,
    },

    /// Print the evaluation order and dependencies of a catalog
    Graph {
        /// Metric catalog JSON
        #[arg(long)]
        catalog: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "text")]
        format: Format,
    },

    /// Validate a catalog
    Check {
        /// Metric catalog JSON
        #[arg(long)]
        catalog: PathBuf,

        /// Fail on parse errors, rejected transforms and dependency drift too
        #[arg(long)]
        strict: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.json);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Evaluate {
            catalog,
            context,
            sector,
            price,
            target,
            format,
        } => {
            let engine = load_engine(&catalog, &config)?;
            let context = CalculationContext::from_path(&context)?;
            let mut inputs = ValuationInputs::new(load_sector(sector.as_deref())?);
            if let Some(price) = price {
                inputs = inputs.with_price(price);
            }
            if let Some(target) = target {
                inputs = inputs.with_target(target);
            }
            let inputs = inputs.or_from_context(&context);

            let deriver = ValuationDeriver::with_config(config.valuation);
            let assessment = assess(&engine, &deriver, &context, &inputs);
            match format {
                Format::Text => print!("{}", report::render_assessment(&assessment)),
                Format::Json => println!("{}", serde_json::to_string_pretty(&assessment)?),
            }
        }
        Commands::Batch {
            catalog,
            contexts,
            sector,
            concurrency,
            timeout_ms,
            output,
            valuations,
            no_progress,
        } => {
            let mut batch_config = config.batch;
            if let Some(concurrency) = concurrency {
                batch_config.concurrency = concurrency;
            }
            if let Some(timeout_ms) = timeout_ms {
                batch_config.timeout_ms = timeout_ms;
            }

            let engine = load_engine(&catalog, &config)?;
            let contexts = load_contexts(&contexts)?;
            info!(contexts = contexts.len(), "contexts loaded");
            let runner = BatchRunner::new(
                engine,
                ValuationDeriver::with_config(config.valuation),
                ValuationInputs::new(load_sector(sector.as_deref())?),
                batch_config,
            );
            cancel_on_ctrl_c(runner.cancel_flag());

            let pb = (!no_progress).then(|| progress_bar(contexts.len()));
            let batch = runner.run(contexts, pb.as_ref()).await;
            if let Some(pb) = &pb {
                pb.finish_with_message("done");
            }

            if let Some(path) = output {
                let rows: Vec<MetricRow> = batch
                    .assessments
                    .iter()
                    .flat_map(|a| MetricRow::from_evaluation(&a.evaluation))
                    .collect();
                rows.export_to_file(&path, ExportFormat::from_path(&path))?;
                info!(rows = rows.len(), path = %path.display(), "metric rows written");
            }
            if let Some(path) = valuations {
                let rows: Vec<ValuationRow> = batch
                    .assessments
                    .iter()
                    .map(|a| {
                        ValuationRow::new(
                            a.evaluation.ticker.clone(),
                            a.evaluation.as_of,
                            &a.quantitative,
                            &a.qualitative,
                        )
                    })
                    .collect();
                rows.export_to_file(&path, ExportFormat::from_path(&path))?;
                info!(rows = rows.len(), path = %path.display(), "valuation rows written");
            }

            print!("{}", batch.summary.to_ascii_table());
        }
        Commands::Graph { catalog, format } => {
            let compiled = MetricCatalog::from_path(&catalog)?.compile()?;
            match format {
                Format::Text => print!("{}", report::render_graph(&compiled)),
                Format::Json => {
                    let graph = compiled.graph();
                    let value = json!({
                        "order": graph.order(),
                        "edges": graph.edges(),
                    });
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
            }
        }
        Commands::Check { catalog, strict } => {
            let compiled = MetricCatalog::from_path(&catalog)?.compile()?;
            let (text, issues) = report::render_check(&compiled);
            print!("{text}");
            if strict && issues > 0 {
                return Err(format!("{issues} catalog issue(s)").into());
            }
        }
    }

    Ok(())
}

fn load_engine(catalog: &Path, config: &CliConfig) -> Result<MetricEngine, Box<dyn std::error::Error>> {
    let compiled = MetricCatalog::from_path(catalog)?.compile()?;
    info!(
        metrics = compiled.metrics().len(),
        transforms = compiled.transforms().len(),
        "catalog compiled"
    );
    Ok(MetricEngine::with_config(compiled, config.engine.clone()))
}

fn load_sector(path: Option<&Path>) -> Result<SectorAverages, Box<dyn std::error::Error>> {
    Ok(match path {
        Some(path) => SectorAverages::from_path(path)?,
        None => SectorAverages::default(),
    })
}

fn progress_bar(len: usize) -> ProgressBar {
    let pb = ProgressBar::new(len as u64);
    if let Ok(style) = ProgressStyle::default_bar().template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}") {
        pb.set_style(style.progress_chars("█▓░"));
    }
    pb
}
