//! Calcul des poids de passage
//!
//! Deux conventions de normalisation coexistent :
//!
//! - [`WeightMode::Reference`] : `w_ij = A_ij / Σ_k A_ik`, seuil appliqué à
//!   `A_ij / A_i`, puis renormalisation pour que la somme vaille exactement 1
//!   par unité de référence ;
//! - [`WeightMode::Target`] : `w_ij = A_ij / A_j`, seuil appliqué au poids,
//!   sans renormalisation (part de surface de l'unité cible).

use std::collections::{BTreeMap, BTreeSet};

use tracing::{debug, info, warn};

use crate::config::{CrosswalkConfig, WeightMode};
use crate::types::{
    AdministrativeUnit, DegenerateReason, DegenerateUnit, IntersectionRecord, UnitCode, UnitRole,
    UnitSet, WeightedCorrespondence,
};
use crate::CrosswalkError;

/// Résultat du calcul des poids
#[derive(Debug, Clone, Default)]
pub struct WeightOutcome {
    pub correspondences: Vec<WeightedCorrespondence>,
    /// Unités d'ancrage sans correspondance
    pub degenerate: Vec<DegenerateUnit>,
    /// Recouvrements non nuls écartés par le seuil
    pub below_threshold: usize,
}

/// Calcule les poids pour toutes les unités du côté d'ancrage du mode.
///
/// Chaque unité d'ancrage sans recouvrement mesurable est signalée comme
/// dégénérée plutôt que de produire un poids indéfini. En mode cible, les
/// unités de référence sans aucun recouvrement sont aussi signalées.
pub fn compute_weights(
    records: &[IntersectionRecord],
    reference: &UnitSet,
    target: &UnitSet,
    config: &CrosswalkConfig,
) -> Result<WeightOutcome, CrosswalkError> {
    config.validate()?;

    let (anchors, role) = match config.mode {
        WeightMode::Reference => (&reference.units, UnitRole::Reference),
        WeightMode::Target => (&target.units, UnitRole::Target),
    };

    let mut grouped: BTreeMap<&UnitCode, Vec<&IntersectionRecord>> = BTreeMap::new();
    for record in records.iter().filter(|r| !r.is_empty()) {
        let key = match config.mode {
            WeightMode::Reference => &record.reference_code,
            WeightMode::Target => &record.target_code,
        };
        grouped.entry(key).or_default().push(record);
    }

    let mut outcome = WeightOutcome::default();
    for anchor in anchors {
        let overlaps = grouped.get(&anchor.code).map(Vec::as_slice).unwrap_or(&[]);

        let weighted = match config.mode {
            WeightMode::Reference => reference_weights(anchor, overlaps, config.min_share),
            WeightMode::Target => target_weights(anchor, overlaps, config.min_share),
        };

        match weighted {
            Ok((rows, dropped)) => {
                outcome.below_threshold += dropped;
                outcome.correspondences.extend(rows);
            }
            Err((reason, dropped)) => {
                outcome.below_threshold += dropped;
                debug!(code = %anchor.code, role = %role, ?reason, "Degenerate unit");
                outcome.degenerate.push(DegenerateUnit {
                    code: anchor.code.clone(),
                    role,
                    reason,
                });
            }
        }
    }

    if config.mode == WeightMode::Target {
        outcome.degenerate.extend(uncovered_references(records, reference));
    }

    if !outcome.degenerate.is_empty() {
        warn!(
            mode = %config.mode,
            count = outcome.degenerate.len(),
            "Units without any correspondence"
        );
    }

    info!(
        mode = %config.mode,
        min_share = config.min_share,
        correspondences = outcome.correspondences.len(),
        below_threshold = outcome.below_threshold,
        degenerate = outcome.degenerate.len(),
        "Computed weights"
    );

    if config.fail_on_degenerate && !outcome.degenerate.is_empty() {
        return Err(CrosswalkError::DegenerateUnits(outcome.degenerate));
    }

    Ok(outcome)
}

/// Unités de référence qu'aucun recouvrement non nul n'atteint
fn uncovered_references(
    records: &[IntersectionRecord],
    reference: &UnitSet,
) -> Vec<DegenerateUnit> {
    let covered: BTreeSet<&UnitCode> = records
        .iter()
        .filter(|r| !r.is_empty())
        .map(|r| &r.reference_code)
        .collect();

    reference
        .units
        .iter()
        .filter(|unit| !covered.contains(&unit.code))
        .map(|unit| {
            debug!(code = %unit.code, role = %UnitRole::Reference, "Degenerate unit");
            DegenerateUnit {
                code: unit.code.clone(),
                role: UnitRole::Reference,
                reason: DegenerateReason::NoOverlap,
            }
        })
        .collect()
}

type Weighted = Result<(Vec<WeightedCorrespondence>, usize), (DegenerateReason, usize)>;

/// Poids d'une unité de référence, renormalisés après le seuil
fn reference_weights(
    unit: &AdministrativeUnit,
    overlaps: &[&IntersectionRecord],
    min_share: f64,
) -> Weighted {
    let total: f64 = overlaps.iter().map(|r| r.area_km2).sum();
    if total <= 0.0 {
        return Err((DegenerateReason::NoOverlap, 0));
    }

    // Seuil relatif à la surface propre de l'unité
    let survivors: Vec<&IntersectionRecord> = overlaps
        .iter()
        .copied()
        .filter(|r| r.area_km2 / unit.area_km2 >= min_share)
        .collect();
    let dropped = overlaps.len() - survivors.len();
    if survivors.is_empty() {
        return Err((DegenerateReason::AllBelowThreshold, dropped));
    }

    let kept: f64 = survivors.iter().map(|r| r.area_km2).sum();
    let mut rows: Vec<WeightedCorrespondence> = survivors
        .iter()
        .map(|r| correspondence(r, r.area_km2 / kept))
        .collect();
    absorb_residue(&mut rows);

    Ok((rows, dropped))
}

/// Poids d'une unité cible : part de sa propre surface, sans renormalisation
fn target_weights(
    unit: &AdministrativeUnit,
    overlaps: &[&IntersectionRecord],
    min_share: f64,
) -> Weighted {
    let total: f64 = overlaps.iter().map(|r| r.area_km2).sum();
    if total <= 0.0 || unit.area_km2 <= 0.0 {
        return Err((DegenerateReason::NoOverlap, 0));
    }

    let rows: Vec<WeightedCorrespondence> = overlaps
        .iter()
        .map(|r| correspondence(r, (r.area_km2 / unit.area_km2).min(1.0)))
        .filter(|c| c.weight >= min_share && c.weight > 0.0)
        .collect();
    let dropped = overlaps.len() - rows.len();
    if rows.is_empty() {
        return Err((DegenerateReason::AllBelowThreshold, dropped));
    }

    Ok((rows, dropped))
}

fn correspondence(record: &IntersectionRecord, weight: f64) -> WeightedCorrespondence {
    WeightedCorrespondence {
        reference_code: record.reference_code.clone(),
        target_code: record.target_code.clone(),
        overlap_km2: record.area_km2,
        weight,
    }
}

/// Reporte l'écart d'arrondi sur le plus grand poids pour que la somme vaille 1
fn absorb_residue(rows: &mut [WeightedCorrespondence]) {
    let sum: f64 = rows.iter().map(|r| r.weight).sum();
    let residue = 1.0 - sum;
    if residue == 0.0 {
        return;
    }

    let largest = rows
        .iter_mut()
        .max_by(|a, b| a.weight.total_cmp(&b.weight));
    if let Some(row) = largest {
        row.weight = (row.weight + residue).clamp(f64::MIN_POSITIVE, 1.0);
    }
}
