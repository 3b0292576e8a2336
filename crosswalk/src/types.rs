//! Types de données pour le crate crosswalk

use std::fmt;

use geo::{Area, MultiPolygon};
use serde::Serialize;

use crate::projection::Crs;

/// Code d'unité administrative à 5 chiffres (2 préfecture + 3 municipalité)
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct UnitCode(String);

impl UnitCode {
    /// Parse un code brut.
    ///
    /// Accepte exactement 5 chiffres ASCII. Un code à 4 chiffres est complété
    /// à gauche : c'est un code de préfecture 01-09 lu depuis une colonne
    /// numérique qui a perdu son zéro initial.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err("empty code".to_string());
        }
        if !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format!("code '{}' is not numeric", trimmed));
        }
        match trimmed.len() {
            5 => Ok(Self(trimmed.to_string())),
            4 => Ok(Self(format!("0{}", trimmed))),
            n => Err(format!("code '{}' has {} digits, expected 5", trimmed, n)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Code préfecture (2 premiers chiffres)
    pub fn prefecture(&self) -> &str {
        &self.0[..2]
    }

    /// Code municipalité / arrondissement (3 derniers chiffres)
    pub fn municipality(&self) -> &str {
        &self.0[2..]
    }
}

impl fmt::Display for UnitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Côté d'une unité dans la table de passage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitRole {
    /// Découpage de référence (cible de la standardisation)
    Reference,
    /// Découpage historique à traduire
    Target,
}

impl fmt::Display for UnitRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reference => f.write_str("reference"),
            Self::Target => f.write_str("target"),
        }
    }
}

/// Enregistrement brut tel que fourni par le chargeur
#[derive(Debug, Clone)]
pub struct RawRecord {
    /// Code tel que lu (absent si la colonne est vide)
    pub code: Option<String>,
    pub prefecture: String,
    pub city: String,
    /// District (gun) si l'unité en dépend
    pub district: Option<String>,
    pub geometry: MultiPolygon,
}

/// Jeu de données d'une année, dans son système de coordonnées natif
#[derive(Debug, Clone)]
pub struct Dataset {
    pub year: u16,
    pub crs: Crs,
    pub records: Vec<RawRecord>,
}

impl Dataset {
    pub fn new(year: u16, crs: Crs, records: Vec<RawRecord>) -> Self {
        Self { year, crs, records }
    }
}

/// Mètres carrés par kilomètre carré
pub const M2_PER_KM2: f64 = 1e6;

/// Une unité administrative agrégée (un code = une géométrie)
#[derive(Debug, Clone)]
pub struct AdministrativeUnit {
    pub code: UnitCode,
    pub geometry: MultiPolygon,
    /// Surface en km², significative une fois la géométrie en projection équivalente
    pub area_km2: f64,
}

impl AdministrativeUnit {
    /// Crée une unité ; la surface est calculée depuis la géométrie
    pub fn new(code: UnitCode, geometry: MultiPolygon) -> Self {
        let area_km2 = geometry.unsigned_area() / M2_PER_KM2;
        Self {
            code,
            geometry,
            area_km2,
        }
    }
}

/// Ensemble d'unités d'une année, avec le système de ses coordonnées
#[derive(Debug, Clone)]
pub struct UnitSet {
    pub role: UnitRole,
    pub crs: Crs,
    pub units: Vec<AdministrativeUnit>,
}

/// Attributs d'affichage d'une unité
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct UnitAttributes {
    pub prefecture: String,
    pub city: String,
    pub district: Option<String>,
}

/// Recouvrement entre une unité de référence et une unité cible
#[derive(Debug, Clone)]
pub struct IntersectionRecord {
    pub reference_code: UnitCode,
    pub target_code: UnitCode,
    /// Géométrie d'intersection (vide si la surface est nulle)
    pub geometry: MultiPolygon,
    /// Surface en km², exactement 0 sous l'epsilon
    pub area_km2: f64,
}

impl IntersectionRecord {
    pub fn is_empty(&self) -> bool {
        self.area_km2 == 0.0
    }
}

/// Correspondance pondérée produite par le calcul des poids
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WeightedCorrespondence {
    pub reference_code: UnitCode,
    pub target_code: UnitCode,
    pub overlap_km2: f64,
    pub weight: f64,
}

/// Libellé d'une unité dans une ligne de sortie
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnitLabel {
    pub code: UnitCode,
    pub prefecture: String,
    pub city: String,
    /// District ou marqueur d'absence
    pub district: String,
}

/// Ligne finale de la table de passage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrosswalkRow {
    pub reference: UnitLabel,
    pub target: UnitLabel,
    pub weight: f64,
}

/// Raison pour laquelle une unité n'a produit aucune correspondance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateReason {
    /// Aucune unité de l'autre année ne la recouvre
    NoOverlap,
    /// Tous les recouvrements sont sous le seuil
    AllBelowThreshold,
}

/// Unité sans correspondance exploitable
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DegenerateUnit {
    pub code: UnitCode,
    pub role: UnitRole,
    pub reason: DegenerateReason,
}
