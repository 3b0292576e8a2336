//! Modules d'export (CSV, JSON, GeoJSON de diagnostic)

pub mod csv;
pub mod geojson;
pub mod json;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use crosswalk::Crosswalk;
use tracing::info;

/// Répertoire de sortie par défaut
pub const DEFAULT_OUTPUT_DIR: &str = "Crosswalk";

/// Format de la table exportée
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    /// Déduit le format de l'extension (CSV par défaut)
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Csv,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown output format: {}. Use: csv, json", other)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Json => f.write_str("json"),
        }
    }
}

/// `Crosswalk/Crosswalk_{reference}_{target}.csv`
pub fn default_output_path(reference_year: u16, target_year: u16) -> PathBuf {
    Path::new(DEFAULT_OUTPUT_DIR).join(format!(
        "Crosswalk_{}_{}.csv",
        reference_year, target_year
    ))
}

/// Écrit la table de passage, en créant le répertoire parent si besoin
pub fn export(crosswalk: &Crosswalk, path: &Path, format: OutputFormat) -> Result<()> {
    ensure_parent_dir(path)?;

    match format {
        OutputFormat::Csv => csv::export_csv(crosswalk, path)?,
        OutputFormat::Json => json::export_json(crosswalk, path)?,
    }

    info!(
        path = %path.display(),
        format = %format,
        rows = crosswalk.rows.len(),
        "Saved crosswalk"
    );
    Ok(())
}

pub(crate) fn ensure_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    Ok(())
}
