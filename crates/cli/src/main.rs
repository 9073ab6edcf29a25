//! Terra-Valuation CLI - ecological liability audit of a hill region

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

use terraval_audit::catalog::ManifestCatalog;
use terraval_audit::config::AuditConfig;
use terraval_audit::dashboard::DashboardMetrics;
use terraval_audit::export::{ExportQueue, ExportRecord};
use terraval_audit::layers::{load_dem, StaticLayers};
use terraval_audit::pipeline::{run_forensic, run_valuation};
use terraval_audit::report::AuditReport;

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "terraval")]
#[command(author, version, about = "Ecological liability audit of a hill region", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Audit configuration (TOML). Built-in defaults are used when omitted.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Relief zoning, Zone B area and carbon, historical loss and priced scenarios
    Valuate {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Vegetation loss between the baseline and current years, exported as polygons
    Forensic {
        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },
    /// Summary figures from exported vector layers
    Dashboard {
        /// Risk zone layer (GeoJSON)
        #[arg(long)]
        risk: PathBuf,
        /// Verified loss layer (GeoJSON)
        #[arg(long)]
        loss: Option<PathBuf>,
        /// Land rate in ₹ Crore per acre
        #[arg(long)]
        land_rate: Option<f64>,
    },
    /// Validate the configuration without running anything
    CheckConfig,
    /// Print the effective configuration as TOML
    PrintConfig,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("setting default subscriber failed")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load_config(path: Option<&Path>) -> Result<AuditConfig> {
    match path {
        Some(path) => AuditConfig::from_file(path)
            .with_context(|| format!("Invalid configuration {}", path.display())),
        None => {
            info!("No --config given, using built-in defaults");
            let config = AuditConfig::default();
            config.validate().context("Invalid built-in configuration")?;
            Ok(config)
        }
    }
}

fn open_scenes(config: &AuditConfig) -> Result<ManifestCatalog> {
    let pb = spinner("Reading scene manifest...")?;
    let catalog = ManifestCatalog::open(&config.data.scenes)
        .with_context(|| format!("Failed to open scene manifest {}", config.data.scenes.display()))?;
    pb.finish_and_clear();
    info!("Scene manifest: {} items", catalog.len());
    Ok(catalog)
}

/// Wait for the writer thread and report every written file
fn drain_exports(exports: ExportQueue) -> Result<()> {
    let pb = spinner("Writing exports...")?;
    let records = exports.finish().context("Export queue failed")?;
    pb.finish_and_clear();

    let failed: Vec<&ExportRecord> = records.iter().filter(|r| !r.succeeded()).collect();
    for record in &records {
        match &record.error {
            None => eprintln!(
                "Export #{} saved to: {} ({} features)",
                record.id,
                record.path.display(),
                record.features
            ),
            Some(e) => eprintln!("Export #{} ({}) failed: {}", record.id, record.description, e),
        }
    }
    if !failed.is_empty() {
        bail!("{} of {} exports failed", failed.len(), records.len());
    }
    Ok(())
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{line}");
    }
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Valuate { json } => {
            let config = load_config(cli.config.as_deref())?;
            let roi = config.region.roi()?;

            let pb = spinner("Reading elevation and landcover...")?;
            let layers = StaticLayers::load(&config.data, &roi, config.relief.radius_m)
                .context("Failed to read layers")?;
            pb.finish_and_clear();
            info!(
                "DEM: {} x {}, landcover: {} x {}",
                layers.dem.cols(),
                layers.dem.rows(),
                layers.landcover.cols(),
                layers.landcover.rows()
            );
            let scenes = open_scenes(&config)?;
            let exports = ExportQueue::start(&config.exports.output_dir)?;

            let start = Instant::now();
            let pb = spinner("Running valuation...")?;
            let run = run_valuation(&config, &layers, &scenes, &exports);
            pb.finish_and_clear();
            let run = run.context("Valuation failed")?;
            info!("Processing time: {:.2?}", start.elapsed());

            let report = AuditReport::new(&config, run);
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_lines(&report.lines());
            }
            drain_exports(exports)?;
        }

        Commands::Forensic { json } => {
            let config = load_config(cli.config.as_deref())?;
            let roi = config.region.roi()?;

            let dem = if config.loss.forensic()?.zone.is_some() {
                let pb = spinner("Reading elevation...")?;
                let dem = load_dem(&config.data.dem, &roi, config.relief.radius_m)
                    .context("Failed to read DEM")?;
                pb.finish_and_clear();
                Some(dem)
            } else {
                None
            };
            let scenes = open_scenes(&config)?;
            let exports = ExportQueue::start(&config.exports.output_dir)?;

            let start = Instant::now();
            let pb = spinner("Running forensic loss analysis...")?;
            let run = run_forensic(&config, &scenes, dem.as_ref(), &exports);
            pb.finish_and_clear();
            let run = run.context("Forensic analysis failed")?;
            info!("Processing time: {:.2?}", start.elapsed());

            if json {
                println!("{}", run.to_json()?);
            } else {
                print_lines(&run.lines());
            }
            drain_exports(exports)?;
        }

        Commands::Dashboard {
            risk,
            loss,
            land_rate,
        } => {
            let config = load_config(cli.config.as_deref())?;
            let Some(rate) = land_rate.or(config.dashboard.land_rate_cr_per_acre) else {
                bail!("No land rate: pass --land-rate or set dashboard.land_rate_cr_per_acre");
            };
            if !(rate.is_finite() && rate >= 0.0) {
                bail!("Land rate must be a non-negative number, got {rate}");
            }
            let metrics = DashboardMetrics::from_files(&risk, loss.as_deref(), rate)
                .context("Failed to read exported layers")?;
            print_lines(&metrics.lines());
        }

        Commands::CheckConfig => {
            let config = load_config(cli.config.as_deref())?;
            if !config.data.scenes.exists() {
                warn!("Scene manifest {} does not exist yet", config.data.scenes.display());
            }
            println!(
                "Configuration OK: {} ({}-{}), {} scenarios",
                config.region.name,
                config.years.baseline,
                config.years.current,
                config.scenarios.len()
            );
        }

        Commands::PrintConfig => {
            let config = load_config(cli.config.as_deref())?;
            print!("{}", config.to_toml_string()?);
        }
    }

    Ok(())
}
