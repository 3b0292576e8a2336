//! Définition et implémentation des commandes CLI
//!
//! - `build`: deux millésimes → table de passage (CSV/JSON) + rapport
//! - `inspect`: résumé d'un jeu de données avant calcul

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use crosswalk::{build_crosswalk, CrosswalkConfig, Crs, WeightMode};
use tracing::{info, warn};

use jpn_crosswalk::config::Config;
use jpn_crosswalk::export::{self, OutputFormat};
use jpn_crosswalk::io;
use jpn_crosswalk::report::{CrosswalkReport, RunStatus};

#[derive(Subcommand)]
pub enum Commands {
    /// Build the area-weighted crosswalk between two years
    Build(BuildArgs),

    /// Print a summary of a dataset (records, codes, CRS)
    Inspect {
        /// Year of the dataset
        #[arg(short, long, default_value_t = 2000)]
        year: u16,

        /// Path to the dataset (défaut : {data}/jpn{year}/jpn{year}geo.shp)
        #[arg(short, long)]
        path: Option<PathBuf>,

        /// Source EPSG code (défaut : lu dans le .prj)
        #[arg(long)]
        epsg: Option<u32>,

        /// Config preset name (jpn/n03) or path to a JSON config
        #[arg(long, default_value = "jpn")]
        config: String,
    },
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    /// Reference year (unités standardisées)
    #[arg(short = 'r', long, default_value_t = 2000)]
    pub reference_year: u16,

    /// Target year (unités historiques)
    #[arg(short = 't', long, default_value_t = 1980)]
    pub target_year: u16,

    /// Path to the reference dataset (.shp, .geojson)
    #[arg(long)]
    pub reference_path: Option<PathBuf>,

    /// Path to the target dataset (.shp, .geojson)
    #[arg(long)]
    pub target_path: Option<PathBuf>,

    /// EPSG code of the reference dataset (défaut : lu dans le .prj)
    #[arg(long)]
    pub reference_epsg: Option<u32>,

    /// EPSG code of the target dataset (défaut : lu dans le .prj)
    #[arg(long)]
    pub target_epsg: Option<u32>,

    /// Output file (défaut : Crosswalk/Crosswalk_{reference}_{target}.csv)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format (csv/json), déduit de l'extension sinon
    #[arg(long)]
    pub format: Option<OutputFormat>,

    /// Minimum overlap share kept (0 ≤ θ < 1)
    #[arg(long, alias = "min-share")]
    pub threshold: Option<f64>,

    /// Weight denominator (reference/target)
    #[arg(long)]
    pub mode: Option<WeightMode>,

    /// Equal-area CRS code used for areas
    #[arg(long)]
    pub target_crs: Option<u32>,

    /// Config preset name (jpn/n03) or path to a JSON config
    #[arg(long, default_value = "jpn")]
    pub config: String,

    /// Write the JSON report to this file
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Write the non-empty intersections to a GeoJSON file
    #[arg(long)]
    pub dump_overlaps: Option<PathBuf>,

    /// Number of worker threads
    #[arg(long, alias = "threads")]
    pub jobs: Option<usize>,

    /// Fail when a unit has no correspondence
    #[arg(long)]
    pub strict: bool,
}

impl BuildArgs {
    /// Applique les options de ligne de commande sur la configuration
    pub fn apply_overrides(&self, config: &mut CrosswalkConfig) {
        if let Some(threshold) = self.threshold {
            config.min_share = threshold;
        }
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if let Some(crs) = self.target_crs {
            config.target_crs = crs;
        }
        if self.strict {
            config.fail_on_degenerate = true;
        }
        if self.jobs == Some(1) {
            config.parallel = false;
        }
        if self.dump_overlaps.is_some() {
            config.keep_overlaps = true;
        }
    }
}

/// Exécute la commande build
pub fn cmd_build(args: &BuildArgs) -> Result<()> {
    let start = Instant::now();

    let config = Config::resolve(&args.config)?;
    let mut settings = config.crosswalk.clone();
    args.apply_overrides(&mut settings);
    settings.validate()?;

    if let Some(jobs) = args.jobs {
        rayon::ThreadPoolBuilder::new()
            .num_threads(jobs)
            .build_global()
            .context("Failed to configure the thread pool")?;
    }

    let data_dir = io::data_dir();
    let reference_path = dataset_path(
        &data_dir,
        args.reference_path.as_deref(),
        args.reference_year,
    )?;
    let target_path = dataset_path(&data_dir, args.target_path.as_deref(), args.target_year)?;

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| export::default_output_path(args.reference_year, args.target_year));
    let format = args
        .format
        .unwrap_or_else(|| OutputFormat::from_path(&output));

    println!("=== Crosswalk {} → {} ===", args.reference_year, args.target_year);
    println!("Reference: {}", reference_path.display());
    println!("Target: {}", target_path.display());
    println!("Config: {}", args.config);
    println!("Mode: {}", settings.mode);
    println!("Min share: {}", settings.min_share);
    println!("Equal-area CRS: {}", Crs::new(settings.target_crs));
    println!("Output: {} ({})", output.display(), format);

    let reference = io::load_dataset(
        &reference_path,
        args.reference_year,
        args.reference_epsg,
        &config.fields,
    )?;
    let target = io::load_dataset(
        &target_path,
        args.target_year,
        args.target_epsg,
        &config.fields,
    )?;

    let crosswalk = build_crosswalk(&reference, &target, &settings).with_context(|| {
        format!(
            "Failed to build crosswalk {} → {}",
            args.reference_year, args.target_year
        )
    })?;

    let mut report = CrosswalkReport::from_crosswalk(&crosswalk, &settings);

    if report.status == RunStatus::Failed {
        warn!("No correspondence produced, nothing to export");
    } else {
        export::export(&crosswalk, &output, format)?;
        report.record_output(&output);
    }

    if let Some(path) = &args.dump_overlaps {
        export::geojson::export_overlaps(&crosswalk.overlaps, Crs::new(settings.target_crs), path)?;
        report.record_output(path);
    }

    report.set_duration(start.elapsed());
    report.display();

    if let Some(path) = &args.report {
        report.save_to_file(path)?;
        info!(path = %path.display(), "Report saved");
    }

    info!("{}", report.summary());

    if report.status == RunStatus::Failed {
        anyhow::bail!(
            "Crosswalk {} → {} has no rows",
            args.reference_year,
            args.target_year
        );
    }
    Ok(())
}

/// Exécute la commande inspect
pub fn cmd_inspect(
    year: u16,
    path: Option<&Path>,
    epsg: Option<u32>,
    config_spec: &str,
) -> Result<()> {
    let config = Config::resolve(config_spec)?;
    let path = dataset_path(&io::data_dir(), path, year)?;

    let dataset = io::load_dataset(&path, year, epsg, &config.fields)?;
    let summary = io::summarize(&dataset);

    println!("=== Dataset {} ===", year);
    println!("Path: {}", path.display());
    summary.display();

    if summary.missing_codes > 0 {
        warn!(
            missing = summary.missing_codes,
            "Some records have no usable code, build will fail"
        );
    }
    Ok(())
}

/// Chemin explicite, sinon chemin conventionnel dans le répertoire des données
fn dataset_path(data_dir: &Path, explicit: Option<&Path>, year: u16) -> Result<PathBuf> {
    let path = explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(|| io::default_dataset_path(data_dir, year));

    if !path.exists() {
        anyhow::bail!(
            "Dataset for {} not found: {}. Download it into {} (or set {}) or pass the path explicitly",
            year,
            path.display(),
            data_dir.display(),
            io::DATA_DIR_ENV
        );
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(subcommand)]
        command: Commands,
    }

    fn parse_build(args: &[&str]) -> BuildArgs {
        let mut argv = vec!["jpn-crosswalk", "build"];
        argv.extend_from_slice(args);
        match TestCli::parse_from(argv).command {
            Commands::Build(args) => args,
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn test_build_defaults() {
        let args = parse_build(&[]);
        assert_eq!(args.reference_year, 2000);
        assert_eq!(args.target_year, 1980);
        assert_eq!(args.config, "jpn");
        assert!(args.threshold.is_none());
        assert!(!args.strict);
    }

    #[test]
    fn test_overrides() {
        let args = parse_build(&[
            "--threshold",
            "0.01",
            "--mode",
            "target",
            "--target-crs",
            "102025",
            "--strict",
            "--jobs",
            "1",
            "--dump-overlaps",
            "overlaps.geojson",
        ]);
        let mut config = CrosswalkConfig::default();
        args.apply_overrides(&mut config);

        assert_eq!(config.min_share, 0.01);
        assert_eq!(config.mode, WeightMode::Target);
        assert_eq!(config.target_crs, 102025);
        assert!(config.fail_on_degenerate);
        assert!(!config.parallel);
        assert!(config.keep_overlaps);
    }

    #[test]
    fn test_overrides_keep_config_values() {
        let args = parse_build(&[]);
        let mut config = CrosswalkConfig::default().with_min_share(0.2);
        args.apply_overrides(&mut config);
        assert_eq!(config.min_share, 0.2);
        assert_eq!(config.mode, WeightMode::Reference);
        assert!(!config.keep_overlaps);
    }

    #[test]
    fn test_overrides_keep_config_overlaps() {
        let args = parse_build(&[]);
        let mut config = CrosswalkConfig {
            keep_overlaps: true,
            ..CrosswalkConfig::default()
        };
        args.apply_overrides(&mut config);
        assert!(config.keep_overlaps);
    }

    #[test]
    fn test_invalid_mode_rejected() {
        let argv = ["jpn-crosswalk", "build", "--mode", "area"];
        assert!(TestCli::try_parse_from(argv).is_err());
    }

    #[test]
    fn test_missing_dataset_hint() {
        let dir = std::env::temp_dir().join("jpn_crosswalk_test_no_data");
        let err = dataset_path(&dir, None, 1975).unwrap_err().to_string();
        assert!(err.contains("jpn1975geo.shp"));
        assert!(err.contains(io::DATA_DIR_ENV));
    }
}
