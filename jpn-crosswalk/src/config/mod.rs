//! Configuration de l'outil : colonnes sources et paramètres de calcul

use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::CrosswalkConfig;
use serde::{Deserialize, Serialize};

/// Presets embarqués
pub const PRESETS: [&str; 2] = ["jpn", "n03"];

/// Configuration principale
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Colonnes des jeux de données
    pub fields: FieldMapping,

    /// Paramètres du calcul
    #[serde(default)]
    pub crosswalk: CrosswalkConfig,
}

/// Noms des colonnes attributaires
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FieldMapping {
    /// Code à 5 chiffres de l'unité
    pub code: String,

    pub prefecture: String,

    pub city: String,

    /// District (gun), absent dans certains millésimes
    #[serde(default)]
    pub district: Option<String>,
}

impl Config {
    /// Charge une configuration depuis un fichier
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config JSON")
    }

    /// Charge une configuration depuis un preset embarqué
    pub fn from_preset(preset: &str) -> Result<Self> {
        match preset {
            "jpn" => Self::load_embedded(include_str!("presets/jpn.json")),
            "n03" => Self::load_embedded(include_str!("presets/n03.json")),
            _ => anyhow::bail!("Unknown preset: {}. Use: {}", preset, PRESETS.join(", ")),
        }
    }

    /// Nom de preset ou chemin vers un fichier JSON
    pub fn resolve(spec: &str) -> Result<Self> {
        if PRESETS.contains(&spec) {
            Self::from_preset(spec)
        } else {
            Self::load(Path::new(spec))
        }
    }

    fn load_embedded(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse embedded config")
    }
}
