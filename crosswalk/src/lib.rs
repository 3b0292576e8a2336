//! # crosswalk
//!
//! Tables de passage pondérées par la surface entre deux millésimes de
//! découpage administratif.
//!
//! ## Étapes
//!
//! - Agrégation des enregistrements en une géométrie par code ([`aggregate`])
//! - Reprojection dans une projection équivalente commune ([`projection`])
//! - Réparation des géométries ([`repair`])
//! - Intersections filtrées par R-tree ([`intersect`])
//! - Poids normalisés avec seuil minimal ([`weight`])
//! - Jointure des libellés et tri des lignes ([`assemble`])
//!
//! ## Usage
//!
//! ```rust,ignore
//! use crosswalk::{build_crosswalk, CrosswalkConfig, Dataset};
//!
//! let crosswalk = build_crosswalk(&reference, &target, &CrosswalkConfig::default())?;
//! for row in &crosswalk.rows {
//!     println!("{} -> {}: {}", row.reference.code, row.target.code, row.weight);
//! }
//! println!("{} unités dégénérées", crosswalk.degenerate.len());
//! ```

pub mod aggregate;
pub mod assemble;
pub mod config;
pub mod error;
pub mod geometry;
pub mod intersect;
pub mod projection;
pub mod repair;
pub mod types;
pub mod weight;

pub use assemble::AttributeTable;
pub use config::{CrosswalkConfig, WeightMode};
pub use error::CrosswalkError;
pub use projection::{Crs, ProjectionNormalizer};
pub use repair::RepairNote;
pub use types::{
    AdministrativeUnit, CrosswalkRow, Dataset, DegenerateReason, DegenerateUnit,
    IntersectionRecord, RawRecord, UnitCode, UnitLabel, UnitRole, UnitSet,
    WeightedCorrespondence,
};

use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::info;

/// Compteurs d'un calcul complet
#[derive(Debug, Clone, Default, Serialize)]
pub struct PipelineStats {
    pub reference_records: usize,
    pub target_records: usize,
    pub reference_units: usize,
    pub target_units: usize,
    pub candidate_pairs: usize,
    pub zero_area_pairs: usize,
    pub below_threshold: usize,
    pub correspondences: usize,
    /// Codes dont les enregistrements portent des libellés divergents
    pub attribute_conflicts: usize,
    pub repair_drift: Vec<RepairNote>,
}

/// Table de passage calculée
#[derive(Debug, Clone)]
pub struct Crosswalk {
    pub reference_year: u16,
    pub target_year: u16,
    pub mode: WeightMode,
    /// Lignes triées par code de référence, poids décroissant, code cible
    pub rows: Vec<CrosswalkRow>,
    pub degenerate: Vec<DegenerateUnit>,
    /// Recouvrements non nuls, conservés seulement si `keep_overlaps` est actif
    pub overlaps: Vec<IntersectionRecord>,
    pub stats: PipelineStats,
}

/// Calcule la table de passage entre deux jeux de données.
///
/// # Errors
///
/// Retourne `CrosswalkError` pour un code manquant, une projection non
/// supportée, une géométrie irréparable, un code sans libellé, ou des unités
/// dégénérées si `fail_on_degenerate` est actif.
pub fn build_crosswalk(
    reference: &Dataset,
    target: &Dataset,
    config: &CrosswalkConfig,
) -> Result<Crosswalk, CrosswalkError> {
    build_crosswalk_with_cancel(reference, target, config, &AtomicBool::new(false))
}

/// Comme [`build_crosswalk`], interrompu dès que `cancel` passe à `true`.
///
/// Une exécution interrompue ne produit aucune table partielle.
pub fn build_crosswalk_with_cancel(
    reference: &Dataset,
    target: &Dataset,
    config: &CrosswalkConfig,
    cancel: &AtomicBool,
) -> Result<Crosswalk, CrosswalkError> {
    config.validate()?;
    let normalizer = ProjectionNormalizer::new(Crs::new(config.target_crs))?;

    info!(
        reference_year = reference.year,
        target_year = target.year,
        mode = %config.mode,
        target_crs = %normalizer.target(),
        "Building crosswalk"
    );

    let reference_labels = AttributeTable::from_dataset(reference, UnitRole::Reference)?;
    let target_labels = AttributeTable::from_dataset(target, UnitRole::Target)?;

    let reference_units = aggregate::aggregate(reference, UnitRole::Reference, config.parallel)?;
    let target_units = aggregate::aggregate(target, UnitRole::Target, config.parallel)?;
    check_cancelled(cancel)?;

    let reference_units = normalizer.normalize(reference_units)?;
    let target_units = normalizer.normalize(target_units)?;
    check_cancelled(cancel)?;

    let reference_repair = repair::repair_set(reference_units, config.parallel)?;
    let target_repair = repair::repair_set(target_units, config.parallel)?;
    check_cancelled(cancel)?;

    let reference_units = reference_repair.set;
    let target_units = target_repair.set;

    let overlaps = intersect::intersect(&reference_units, &target_units, config.parallel, cancel)?;
    let weights = weight::compute_weights(&overlaps.records, &reference_units, &target_units, config)?;
    check_cancelled(cancel)?;

    let rows = assemble::assemble(
        &weights.correspondences,
        &reference_labels,
        &target_labels,
        &config.district_placeholder,
    )?;

    let mut repair_drift = reference_repair.drift;
    repair_drift.extend(target_repair.drift);

    let stats = PipelineStats {
        reference_records: reference.records.len(),
        target_records: target.records.len(),
        reference_units: reference_units.units.len(),
        target_units: target_units.units.len(),
        candidate_pairs: overlaps.candidate_pairs,
        zero_area_pairs: overlaps.zero_area_pairs,
        below_threshold: weights.below_threshold,
        correspondences: rows.len(),
        attribute_conflicts: reference_labels.conflicts() + target_labels.conflicts(),
        repair_drift,
    };

    let kept_overlaps = if config.keep_overlaps {
        overlaps
            .records
            .into_iter()
            .filter(|r| !r.is_empty())
            .collect()
    } else {
        Vec::new()
    };

    info!(
        rows = rows.len(),
        degenerate = weights.degenerate.len(),
        "Crosswalk complete"
    );

    Ok(Crosswalk {
        reference_year: reference.year,
        target_year: target.year,
        mode: config.mode,
        rows,
        degenerate: weights.degenerate,
        overlaps: kept_overlaps,
        stats,
    })
}

fn check_cancelled(cancel: &AtomicBool) -> Result<(), CrosswalkError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(CrosswalkError::Cancelled);
    }
    Ok(())
}
