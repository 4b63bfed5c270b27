// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use hexzip_builder::{
    load_geometries, load_index, load_regions, load_zip_crosswalk, save_index, BuildError,
    BuildInput, BuildOptions, BuildPipeline, ExportBundle, HierarchyIndex, LonLat, ScoreWeights,
    ZipCode,
};
use hexzip_config::{load_config_or_default, validate_config, HexzipConfig};
use hexzip_observability::{debug_flags_help, init_logging, parse_debug_flags, LoggingSettings};

const LOG_TARGET: &str = "hexzip-cli";

/// hexzip - HRR / HSA / ZCTA / H3 cell hierarchy builder
#[derive(Parser, Debug)]
#[command(name = "hexzip", version, author, long_about = None)]
struct Args {
    /// Path to hexzip.toml (searched for when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging for a crate (repeatable)
    #[arg(long = "debug", global = true, help = debug_flags_help())]
    debug: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build the hierarchy from ZCTA boundaries, the ZIP crosswalk and the region table
    Build {
        /// GeoJSON FeatureCollection of ZCTA boundaries
        #[arg(long)]
        geometries: PathBuf,

        /// ZIP to ZCTA crosswalk (JSON array)
        #[arg(long)]
        crosswalk: PathBuf,

        /// ZCTA to HSA / HRR table (JSON array)
        #[arg(long)]
        regions: PathBuf,

        /// Output directory for export tables (overrides output.output_dir)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Existing index to build into
        #[arg(long)]
        index: Option<PathBuf>,

        #[arg(long)]
        batch_size: Option<usize>,

        #[arg(long)]
        workers: Option<usize>,
    },

    /// Check a saved index for consistency violations
    Validate {
        #[arg(long)]
        index: PathBuf,
    },

    /// Resolve a ZIP code or a coordinate to its hierarchy path
    Lookup {
        #[arg(long)]
        index: PathBuf,

        #[arg(long, conflicts_with_all = ["lat", "lng"])]
        zip: Option<String>,

        #[arg(long, requires = "lng")]
        lat: Option<f64>,

        #[arg(long, requires = "lat")]
        lng: Option<f64>,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut overrides = HashMap::new();
    if let Command::Build {
        batch_size,
        workers,
        out,
        ..
    } = &args.command
    {
        if let Some(size) = batch_size {
            overrides.insert("batch_size".to_string(), size.to_string());
        }
        if let Some(workers) = workers {
            overrides.insert("workers".to_string(), workers.to_string());
        }
        if let Some(out) = out {
            overrides.insert("output_dir".to_string(), out.display().to_string());
        }
    }

    let config = load_config_or_default(args.config.as_deref(), Some(&overrides))
        .context("failed to load configuration")?;
    validate_config(&config).context("invalid configuration")?;

    let debug_flags = parse_debug_flags(&args.debug);
    let _logging = init_logging(&debug_flags, &logging_settings(&config))?;

    print_banner();

    match args.command {
        Command::Build {
            geometries,
            crosswalk,
            regions,
            index,
            ..
        } => run_build(&config, &geometries, &crosswalk, &regions, index.as_deref()),
        Command::Validate { index } => run_validate(&index),
        Command::Lookup {
            index,
            zip,
            lat,
            lng,
        } => run_lookup(&index, zip, lat.zip(lng)),
    }
}

fn logging_settings(config: &HexzipConfig) -> LoggingSettings {
    LoggingSettings {
        level: config.logging.level.clone(),
        file_logging: config.logging.file_logging,
        log_dir: config.logging.log_dir.clone(),
        retention_days: config.logging.retention_days,
        retention_runs: config.logging.retention_runs,
    }
}

fn build_options(config: &HexzipConfig) -> BuildOptions {
    BuildOptions {
        batch_size: config.build.batch_size,
        workers: config.build.workers,
        max_repair_iterations: config.build.max_repair_iterations,
        weights: ScoreWeights {
            area: config.scoring.area_weight,
            population: config.scoring.population_weight,
            proximity: config.scoring.proximity_weight,
        },
        top_k: config.orphans.top_k,
        radius_schedule_km: config.orphans.radius_schedule_km.clone(),
        progress_every_batches: config.build.progress_every_batches,
        eta_window_batches: config.build.eta_window_batches,
    }
}

fn run_build(
    config: &HexzipConfig,
    geometries: &Path,
    crosswalk: &Path,
    regions: &Path,
    index_path: Option<&Path>,
) -> Result<()> {
    let out_dir = config.output.output_dir.clone();
    let pretty = config.output.pretty;

    info!(target: LOG_TARGET, "Loading inputs...");
    let loaded = load_geometries(geometries)
        .with_context(|| format!("failed to read geometries from {}", geometries.display()))?;
    let input = BuildInput {
        geometries: loaded.geometries,
        zip_crosswalk: load_zip_crosswalk(crosswalk)
            .with_context(|| format!("failed to read crosswalk from {}", crosswalk.display()))?,
        regions: load_regions(regions)
            .with_context(|| format!("failed to read regions from {}", regions.display()))?,
        rejected: loaded.rejected,
    };
    info!(
        target: LOG_TARGET,
        "✓ {} geometries, {} crosswalk rows, {} region rows ({} features rejected)",
        input.geometries.len(),
        input.zip_crosswalk.len(),
        input.regions.len(),
        input.rejected.len()
    );

    let mut index = match index_path {
        Some(path) if path.exists() => {
            info!(target: LOG_TARGET, "Building into existing index {}", path.display());
            load_index(path)?
        }
        _ => HierarchyIndex::new(),
    };

    let mut pipeline = BuildPipeline::new(build_options(config))?;
    let audit_path = out_dir.join("audit.json");

    match pipeline.run(&mut index, input) {
        Ok(audit) => {
            let bundle = ExportBundle::from_index(&index)?;
            let written = bundle.write_to_dir(&out_dir, pretty)?;
            let index_out = index_path
                .map(Path::to_path_buf)
                .unwrap_or_else(|| out_dir.join("index.json"));
            save_index(&index, &index_out, pretty)?;
            audit.write_json(&audit_path)?;

            info!(target: LOG_TARGET, "✓ Wrote {} export tables to {}", written.len(), out_dir.display());
            info!(target: LOG_TARGET, "✓ Index saved to {}", index_out.display());
            if !audit.unresolved_zctas.is_empty() {
                warn!(
                    target: LOG_TARGET,
                    "⚠️ {} ZCTAs left unresolved (see {})",
                    audit.unresolved_zctas.len(),
                    audit_path.display()
                );
            }
            Ok(())
        }
        Err(err) => {
            if let Some(audit) = err.audit() {
                match audit.write_json(&audit_path) {
                    Ok(()) => info!(target: LOG_TARGET, "Audit written to {}", audit_path.display()),
                    Err(e) => error!(target: LOG_TARGET, "Failed to write audit: {}", e),
                }
            }
            error!(target: LOG_TARGET, "❌ Build failed: {}", err);
            Err(root_cause(err).into())
        }
    }
}

/// Unwraps the audit carrier so the reported error is the one that stopped the build
fn root_cause(err: BuildError) -> BuildError {
    match err {
        BuildError::BuildFailed { source, .. } => *source,
        other => other,
    }
}

fn run_validate(index_path: &Path) -> Result<()> {
    let index = load_index(index_path)?;
    let (covered, empty) = index.coverage();
    let total = index.zcta_count();
    info!(
        target: LOG_TARGET,
        "Index: {} ZCTAs ({} with cells, {} without), {} cells",
        total,
        covered,
        empty,
        index.cell_count()
    );

    let violations = index.validate();
    if violations.is_empty() {
        info!(target: LOG_TARGET, "✓ Index is consistent");
        return Ok(());
    }
    for violation in &violations {
        error!(target: LOG_TARGET, "  {}", violation);
    }
    bail!("{} consistency violations in {} (of {} ZCTAs)", violations.len(), index_path.display(), total)
}

fn run_lookup(index_path: &Path, zip: Option<String>, point: Option<(f64, f64)>) -> Result<()> {
    let index = load_index(index_path)?;

    let path = match (zip, point) {
        (Some(zip), _) => index.resolve_zip(&ZipCode::new(zip.as_str())),
        (None, Some((lat, lng))) => index.resolve_point(LonLat::new(lng, lat))?,
        (None, None) => bail!("lookup needs --zip or --lat/--lng"),
    };

    match path {
        Some(path) => {
            println!("{}", serde_json::to_string_pretty(&path)?);
            Ok(())
        }
        None => bail!("no hierarchy path found"),
    }
}

fn print_banner() {
    info!(target: LOG_TARGET, "╔══════════════════════════════════════════════════════════╗");
    info!(target: LOG_TARGET, "║ hexzip v{:<48} ║", env!("CARGO_PKG_VERSION"));
    info!(target: LOG_TARGET, "║ HRR ⊃ HSA ⊃ ZCTA ⊃ H3 res-7 hierarchy builder            ║");
    info!(target: LOG_TARGET, "╚══════════════════════════════════════════════════════════╝");
}
