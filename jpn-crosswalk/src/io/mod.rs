//! Chargement des jeux de données (Shapefile, GeoJSON)

pub mod geojson;
pub mod shapefile;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use crosswalk::{Crs, Dataset, UnitCode};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::FieldMapping;

/// Répertoire des données par défaut
pub const DEFAULT_DATA_DIR: &str = "Data";

/// Variable d'environnement pour le répertoire des données
pub const DATA_DIR_ENV: &str = "CROSSWALK_DATA_DIR";

/// Répertoire des données (env `CROSSWALK_DATA_DIR`, sinon `Data`)
pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

/// Chemin conventionnel d'un millésime : `{data}/jpn{year}/jpn{year}geo.shp`
pub fn default_dataset_path(data_dir: &Path, year: u16) -> PathBuf {
    data_dir
        .join(format!("jpn{}", year))
        .join(format!("jpn{}geo.shp", year))
}

/// Format de fichier source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Shapefile,
    GeoJson,
}

impl SourceFormat {
    /// Déduit le format de l'extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("shp") => Ok(Self::Shapefile),
            Some("geojson") | Some("json") => Ok(Self::GeoJson),
            _ => anyhow::bail!(
                "Unsupported dataset format: {}. Use .shp, .geojson or .json",
                path.display()
            ),
        }
    }
}

/// Charge un jeu de données complet.
///
/// Sans `epsg`, le système est lu dans le `.prj` du Shapefile ; un GeoJSON
/// est supposé en WGS84 (RFC 7946).
pub fn load_dataset(
    path: &Path,
    year: u16,
    epsg: Option<u32>,
    fields: &FieldMapping,
) -> Result<Dataset> {
    if !path.exists() {
        anyhow::bail!("Dataset not found: {}", path.display());
    }

    let format = SourceFormat::from_path(path)?;
    let crs = match epsg {
        Some(code) => Crs::new(code),
        None => detect_crs(path, format)?,
    };

    let records = match format {
        SourceFormat::Shapefile => shapefile::read_records(path, fields)?,
        SourceFormat::GeoJson => geojson::read_records(path, fields)?,
    };

    info!(
        path = %path.display(),
        year = year,
        crs = %crs,
        records = records.len(),
        "Loaded dataset"
    );

    Ok(Dataset::new(year, crs, records))
}

/// Détermine le système de coordonnées d'un fichier source
pub fn detect_crs(path: &Path, format: SourceFormat) -> Result<Crs> {
    match format {
        SourceFormat::GeoJson => Ok(Crs::new(4326)),
        SourceFormat::Shapefile => {
            let prj = path.with_extension("prj");
            let wkt = std::fs::read_to_string(&prj).context(format!(
                "Cannot read {} to detect the CRS; pass --epsg explicitly",
                prj.display()
            ))?;
            let crs = crs_from_wkt(&wkt).with_context(|| {
                format!(
                    "Unrecognized CRS in {}; pass --epsg explicitly",
                    prj.display()
                )
            })?;
            debug!(prj = %prj.display(), crs = %crs, "Detected CRS");
            Ok(crs)
        }
    }
}

/// Reconnaît les systèmes japonais usuels dans un WKT ESRI/OGC
pub fn crs_from_wkt(wkt: &str) -> Option<Crs> {
    let upper = wkt.to_ascii_uppercase().replace(' ', "_");

    let datum = if upper.contains("JGD_2011") || upper.contains("JGD2011") {
        "jgd2011"
    } else if upper.contains("JGD_2000") || upper.contains("JGD2000") {
        "jgd2000"
    } else if upper.contains("WGS_1984") || upper.contains("WGS_84") {
        "wgs84"
    } else if upper.contains("TOKYO") {
        "tokyo"
    } else {
        return None;
    };

    if upper.starts_with("PROJCS") {
        let zone = utm_zone(&upper)?;
        let code = match datum {
            "jgd2011" if (51..=55).contains(&zone) => 6688 + zone - 51,
            "jgd2000" if (51..=55).contains(&zone) => 3097 + zone - 51,
            "wgs84" if (1..=60).contains(&zone) => 32600 + zone,
            _ => return None,
        };
        return Some(Crs::new(code));
    }

    match datum {
        "jgd2011" => Some(Crs::new(6668)),
        "jgd2000" => Some(Crs::new(4612)),
        "wgs84" => Some(Crs::new(4326)),
        _ => Some(Crs::new(4301)),
    }
}

fn utm_zone(upper_wkt: &str) -> Option<u32> {
    let start = upper_wkt.find("UTM_ZONE_")? + "UTM_ZONE_".len();
    let digits: String = upper_wkt[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

/// Résumé d'un jeu de données (commande `inspect`)
#[derive(Debug, Clone, Serialize)]
pub struct DatasetSummary {
    pub year: u16,
    pub crs: String,
    pub records: usize,
    pub distinct_codes: usize,
    /// Codes portés par plusieurs enregistrements
    pub multi_part_codes: usize,
    /// Enregistrements sans code exploitable
    pub missing_codes: usize,
    pub empty_geometries: usize,
}

pub fn summarize(dataset: &Dataset) -> DatasetSummary {
    let mut parts: BTreeMap<UnitCode, usize> = BTreeMap::new();
    let mut missing_codes = 0;

    for record in &dataset.records {
        match record.code.as_deref().map(UnitCode::parse) {
            Some(Ok(code)) => *parts.entry(code).or_default() += 1,
            _ => missing_codes += 1,
        }
    }

    DatasetSummary {
        year: dataset.year,
        crs: dataset.crs.to_string(),
        records: dataset.records.len(),
        distinct_codes: parts.len(),
        multi_part_codes: parts.values().filter(|&&n| n > 1).count(),
        missing_codes,
        empty_geometries: dataset
            .records
            .iter()
            .filter(|r| r.geometry.0.is_empty())
            .count(),
    }
}

impl DatasetSummary {
    /// Affiche le résumé sur la console
    pub fn display(&self) {
        println!("CRS: {}", self.crs);
        println!("Records: {}", self.records);
        println!("Distinct codes: {}", self.distinct_codes);
        println!("Multi-part codes: {}", self.multi_part_codes);
        println!("Records without code: {}", self.missing_codes);
        println!("Empty geometries: {}", self.empty_geometries);
    }
}
