//! Types d'erreurs pour le crate crosswalk

use thiserror::Error;

use crate::types::{DegenerateUnit, UnitRole};

/// Erreurs pouvant survenir lors de la construction d'une table de passage
#[derive(Debug, Error)]
pub enum CrosswalkError {
    /// Enregistrement brut sans code d'unité exploitable
    #[error("Record #{index} has no usable unit code: {reason}")]
    MissingKey { index: usize, reason: String },

    /// Système de coordonnées inconnu, non supporté ou incohérent
    #[error("Projection error: {0}")]
    Projection(String),

    /// Géométrie irréparable
    #[error("Invalid geometry for {code}: {reason}")]
    InvalidGeometry { code: String, reason: String },

    /// Unités sans recouvrement (uniquement en mode strict)
    #[error("{} degenerate unit(s) without measurable overlap: {}", .0.len(), format_codes(.0))]
    DegenerateUnits(Vec<DegenerateUnit>),

    /// Code présent dans une correspondance mais absent des attributs
    #[error("Unresolved {role} code {code}: no attribute record")]
    UnresolvedCode { code: String, role: UnitRole },

    /// Paramètre de configuration hors bornes
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Traitement annulé avant la fusion des résultats
    #[error("Crosswalk computation cancelled")]
    Cancelled,
}

impl CrosswalkError {
    /// Crée une erreur de projection
    pub fn projection(reason: impl Into<String>) -> Self {
        Self::Projection(reason.into())
    }

    /// Crée une erreur de géométrie invalide
    pub fn invalid_geometry(code: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidGeometry {
            code: code.into(),
            reason: reason.into(),
        }
    }

    /// Crée une erreur de clé manquante
    pub fn missing_key(index: usize, reason: impl Into<String>) -> Self {
        Self::MissingKey {
            index,
            reason: reason.into(),
        }
    }
}

fn format_codes(units: &[DegenerateUnit]) -> String {
    units
        .iter()
        .map(|u| u.code.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
