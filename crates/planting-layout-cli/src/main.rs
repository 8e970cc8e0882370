use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use planting_layout_core::{
    resolve_bounds, JsonFileSuitability, OptimizationController, OptimizationRequest, RunBudget,
    RunOptions, SoilClimateProfile, StaticSuitability, SuitabilitySource, SuitabilityTable,
};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "planting-layout")]
#[command(about = "Optimize row and plant spacing for a field")]
#[command(version)]
struct Cli {
    /// Log search progress (debug level) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the spacing search for a JSON request
    Optimize {
        /// Request file (field, soil_type, climate_zone, ...)
        request: PathBuf,

        /// Suitability table JSON; the built-in table is used when omitted
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Seed for the search RNG
        #[arg(short, long, default_value = "0")]
        seed: u64,

        /// Omit fitness and generation history
        #[arg(long)]
        compact: bool,

        /// Stop after this many generations and return the best so far
        #[arg(long)]
        generations: Option<u32>,

        /// Wall-clock limit in seconds
        #[arg(long)]
        time_limit: Option<f64>,

        /// Number of plant positions to include
        #[arg(long, default_value = "0")]
        positions: usize,

        /// Write the response here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show the spacing bounds resolved for a soil/climate pair
    Bounds {
        #[arg(long)]
        soil: String,

        #[arg(long)]
        climate: String,

        #[arg(long)]
        ph: Option<f64>,

        #[arg(short, long)]
        table: Option<PathBuf>,
    },

    /// Print the built-in suitability table as JSON
    Table,
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn source_for(table: Option<&Path>) -> Box<dyn SuitabilitySource> {
    match table {
        Some(path) => Box::new(JsonFileSuitability::new(path)),
        None => Box::new(StaticSuitability::new(SuitabilityTable::builtin())),
    }
}

fn emit<T: Serialize>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Optimize {
            request,
            table,
            seed,
            compact,
            generations,
            time_limit,
            positions,
            output,
        } => {
            let raw = std::fs::read_to_string(&request)
                .with_context(|| format!("failed to read request {}", request.display()))?;
            let parsed: OptimizationRequest = serde_json::from_str(&raw)
                .with_context(|| format!("failed to parse request {}", request.display()))?;
            tracing::info!(request = %request.display(), seed, "loaded request");
            let time_limit = time_limit
                .map(Duration::try_from_secs_f64)
                .transpose()
                .context("time limit must be a non-negative number of seconds")?;

            let options = RunOptions {
                seed,
                compact,
                budget: RunBudget {
                    max_generations: generations,
                    time_limit,
                },
                cancel: None,
                max_positions: positions,
            };
            let source = source_for(table.as_deref());
            let result = OptimizationController::default()
                .optimize(&parsed, source.as_ref(), &options)
                .context("optimization failed")?;
            emit(&result.to_response(), output.as_deref())?;
        }
        Commands::Bounds {
            soil,
            climate,
            ph,
            table,
        } => {
            let snapshot = source_for(table.as_deref())
                .snapshot()
                .context("failed to load suitability table")?;
            let mut profile = SoilClimateProfile::new(soil, climate);
            profile.ph = ph;
            emit(&resolve_bounds(&snapshot, &profile), None)?;
        }
        Commands::Table => emit(&SuitabilityTable::builtin(), None)?,
    }
    Ok(())
}
