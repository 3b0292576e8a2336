//! Paramètres de calcul de la table de passage

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CrosswalkError;

/// Seuil de part minimale par défaut (fraction de la surface de l'unité)
pub const DEFAULT_MIN_SHARE: f64 = 1e-4;

/// Système cible par défaut : WGS 84 / NSIDC EASE-Grid 2.0 Global
pub const DEFAULT_TARGET_CRS: u32 = 6933;

/// Marqueur d'absence de district
pub const DEFAULT_DISTRICT_PLACEHOLDER: &str = "-";

/// Dénominateur utilisé pour normaliser les poids
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightMode {
    /// w_ij = A_ij / Σ_k A_ik, somme à 1 par unité de référence
    #[default]
    Reference,
    /// w_ij = A_ij / A_j, part de la surface de l'unité cible
    Target,
}

impl FromStr for WeightMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reference" | "ref" => Ok(Self::Reference),
            "target" => Ok(Self::Target),
            other => Err(format!(
                "Unknown weighting mode: {}. Use: reference, target",
                other
            )),
        }
    }
}

impl fmt::Display for WeightMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str("reference"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Configuration passée explicitement à chaque étape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrosswalkConfig {
    /// Part minimale θ d'un recouvrement pour être conservé
    pub min_share: f64,

    /// Mode de normalisation des poids
    pub mode: WeightMode,

    /// Code du système équivalent commun aux deux années
    pub target_crs: u32,

    /// Valeur affichée quand une unité n'a pas de district
    pub district_placeholder: String,

    /// Calcul des intersections et réparations avec rayon
    pub parallel: bool,

    /// Conserver les géométries d'intersection (diagnostic)
    pub keep_overlaps: bool,

    /// Échouer au lieu de signaler les unités dégénérées
    pub fail_on_degenerate: bool,
}

impl Default for CrosswalkConfig {
    fn default() -> Self {
        Self {
            min_share: DEFAULT_MIN_SHARE,
            mode: WeightMode::Reference,
            target_crs: DEFAULT_TARGET_CRS,
            district_placeholder: DEFAULT_DISTRICT_PLACEHOLDER.to_string(),
            parallel: true,
            keep_overlaps: false,
            fail_on_degenerate: false,
        }
    }
}

impl CrosswalkConfig {
    /// Vérifie les bornes des paramètres numériques
    pub fn validate(&self) -> Result<(), CrosswalkError> {
        if !self.min_share.is_finite() || !(0.0..1.0).contains(&self.min_share) {
            return Err(CrosswalkError::InvalidConfig(format!(
                "min_share must be in [0, 1), got {}",
                self.min_share
            )));
        }
        Ok(())
    }

    pub fn with_min_share(mut self, min_share: f64) -> Self {
        self.min_share = min_share;
        self
    }

    pub fn with_mode(mut self, mode: WeightMode) -> Self {
        self.mode = mode;
        self
    }
}
