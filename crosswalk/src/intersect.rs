//! Intersections entre unités de référence et unités cibles

use std::sync::atomic::{AtomicBool, Ordering};

use geo::{Area, BooleanOps, MultiPolygon};
use rayon::prelude::*;
use rstar::RTree;
use tracing::{debug, info};

use crate::geometry::{envelope_of, IndexedEnvelope};
use crate::types::{AdministrativeUnit, IntersectionRecord, UnitSet, M2_PER_KM2};
use crate::CrosswalkError;

/// Surface (km²) sous laquelle un recouvrement est considéré nul
pub const AREA_EPSILON_KM2: f64 = 1e-9;

/// Résultat du calcul des intersections
#[derive(Debug, Clone, Default)]
pub struct IntersectionOutcome {
    /// Enregistrements par unité de référence puis par index cible
    pub records: Vec<IntersectionRecord>,
    /// Paires retenues par le pré-filtre d'enveloppes
    pub candidate_pairs: usize,
    /// Paires candidates dont la surface est nulle
    pub zero_area_pairs: usize,
}

/// Calcule les recouvrements de toutes les paires dont les enveloppes se touchent.
///
/// Les deux ensembles doivent partager la même projection équivalente.
pub fn intersect(
    reference: &UnitSet,
    target: &UnitSet,
    parallel: bool,
    cancel: &AtomicBool,
) -> Result<IntersectionOutcome, CrosswalkError> {
    if reference.crs != target.crs {
        return Err(CrosswalkError::projection(format!(
            "Reference units are in {} but target units are in {}",
            reference.crs, target.crs
        )));
    }
    if !reference.crs.is_equal_area() {
        return Err(CrosswalkError::projection(format!(
            "{} is not an equal-area projection",
            reference.crs
        )));
    }

    let tree = RTree::bulk_load(
        target
            .units
            .iter()
            .enumerate()
            .filter_map(|(idx, unit)| IndexedEnvelope::new(idx, &unit.geometry))
            .collect(),
    );

    let per_unit: Vec<Vec<IntersectionRecord>> = if parallel {
        reference
            .units
            .par_iter()
            .map(|unit| intersect_unit(unit, &target.units, &tree, cancel))
            .collect::<Result<_, _>>()?
    } else {
        reference
            .units
            .iter()
            .map(|unit| intersect_unit(unit, &target.units, &tree, cancel))
            .collect::<Result<_, _>>()?
    };

    if cancel.load(Ordering::Relaxed) {
        return Err(CrosswalkError::Cancelled);
    }

    let records: Vec<IntersectionRecord> = per_unit.into_iter().flatten().collect();
    let candidate_pairs = records.len();
    let zero_area_pairs = records.iter().filter(|r| r.is_empty()).count();

    info!(
        reference_units = reference.units.len(),
        target_units = target.units.len(),
        candidate_pairs,
        zero_area_pairs,
        "Computed intersections"
    );

    Ok(IntersectionOutcome {
        records,
        candidate_pairs,
        zero_area_pairs,
    })
}

fn intersect_unit(
    unit: &AdministrativeUnit,
    targets: &[AdministrativeUnit],
    tree: &RTree<IndexedEnvelope>,
    cancel: &AtomicBool,
) -> Result<Vec<IntersectionRecord>, CrosswalkError> {
    if cancel.load(Ordering::Relaxed) {
        return Err(CrosswalkError::Cancelled);
    }

    let Some(envelope) = envelope_of(&unit.geometry) else {
        return Ok(Vec::new());
    };

    let mut candidates: Vec<usize> = tree
        .locate_in_envelope_intersecting(&envelope)
        .map(|entry| entry.idx())
        .collect();
    candidates.sort_unstable();

    debug!(
        code = %unit.code,
        candidates = candidates.len(),
        "Intersecting unit"
    );

    Ok(candidates
        .into_iter()
        .map(|idx| overlap(unit, &targets[idx]))
        .collect())
}

/// Recouvrement d'une paire, surface bornée par celle des deux unités
pub fn overlap(reference: &AdministrativeUnit, target: &AdministrativeUnit) -> IntersectionRecord {
    let geometry = reference.geometry.intersection(&target.geometry);
    let area_km2 = geometry.unsigned_area() / M2_PER_KM2;

    let (geometry, area_km2) = if area_km2 < AREA_EPSILON_KM2 {
        (MultiPolygon::new(vec![]), 0.0)
    } else {
        (
            geometry,
            area_km2.min(reference.area_km2).min(target.area_km2),
        )
    };

    IntersectionRecord {
        reference_code: reference.code.clone(),
        target_code: target.code.clone(),
        geometry,
        area_km2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fixtures::rect_km;
    use crate::projection::Crs;
    use crate::types::{UnitCode, UnitRole};

    fn unit(code: &str, geometry: MultiPolygon) -> AdministrativeUnit {
        AdministrativeUnit::new(UnitCode::parse(code).unwrap(), geometry)
    }

    fn unit_set(role: UnitRole, crs: u32, units: Vec<AdministrativeUnit>) -> UnitSet {
        UnitSet {
            role,
            crs: Crs::new(crs),
            units,
        }
    }

    #[test]
    fn test_partial_overlap() {
        let reference = unit_set(
            UnitRole::Reference,
            6933,
            vec![unit("01101", rect_km(0.0, 0.0, 10.0, 10.0))],
        );
        let target = unit_set(
            UnitRole::Target,
            6933,
            vec![
                unit("01101", rect_km(0.0, 0.0, 3.0, 10.0)),
                unit("01102", rect_km(3.0, 0.0, 10.0, 10.0)),
            ],
        );

        let outcome = intersect(&reference, &target, false, &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome.records.len(), 2);
        assert_eq!(outcome.records[0].target_code.as_str(), "01101");
        assert!((outcome.records[0].area_km2 - 30.0).abs() < 1e-6);
        assert!((outcome.records[1].area_km2 - 70.0).abs() < 1e-6);
    }

    #[test]
    fn test_disjoint_units_have_exact_zero() {
        // Enveloppes qui se touchent sans recouvrement de surface
        let reference = unit_set(
            UnitRole::Reference,
            6933,
            vec![unit("01101", rect_km(0.0, 0.0, 1.0, 1.0))],
        );
        let target = unit_set(
            UnitRole::Target,
            6933,
            vec![
                unit("01201", rect_km(1.0, 0.0, 2.0, 1.0)),
                unit("01202", rect_km(50.0, 50.0, 51.0, 51.0)),
            ],
        );

        let outcome = intersect(&reference, &target, false, &AtomicBool::new(false)).unwrap();
        assert_eq!(outcome.candidate_pairs, 1);
        assert_eq!(outcome.zero_area_pairs, 1);
        assert_eq!(outcome.records[0].area_km2, 0.0);
        assert!(outcome.records[0].geometry.0.is_empty());
    }

    #[test]
    fn test_overlap_never_exceeds_unit_area() {
        let a = unit("01101", rect_km(0.0, 0.0, 5.0, 5.0));
        let b = unit("01101", rect_km(0.0, 0.0, 5.0, 5.0));
        let record = overlap(&a, &b);
        assert!(record.area_km2 <= a.area_km2);
        assert!((record.area_km2 - 25.0).abs() < 1e-6);
    }

    #[test]
    fn test_mixed_projections_fail() {
        let reference = unit_set(UnitRole::Reference, 6933, vec![]);
        let target = unit_set(UnitRole::Target, 102025, vec![]);
        assert!(matches!(
            intersect(&reference, &target, false, &AtomicBool::new(false)),
            Err(CrosswalkError::Projection(_))
        ));
    }

    #[test]
    fn test_non_equal_area_fails() {
        let reference = unit_set(UnitRole::Reference, 4326, vec![]);
        let target = unit_set(UnitRole::Target, 4326, vec![]);
        assert!(matches!(
            intersect(&reference, &target, true, &AtomicBool::new(false)),
            Err(CrosswalkError::Projection(_))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let reference = unit_set(
            UnitRole::Reference,
            6933,
            (0..6)
                .map(|i| {
                    let x = i as f64 * 2.0;
                    unit(&format!("01{:03}", i + 100), rect_km(x, 0.0, x + 2.0, 2.0))
                })
                .collect(),
        );
        let target = unit_set(
            UnitRole::Target,
            6933,
            (0..4)
                .map(|i| {
                    let x = i as f64 * 3.0;
                    unit(&format!("01{:03}", i + 200), rect_km(x, 0.0, x + 3.0, 2.0))
                })
                .collect(),
        );

        let cancel = AtomicBool::new(false);
        let seq = intersect(&reference, &target, false, &cancel).unwrap();
        let par = intersect(&reference, &target, true, &cancel).unwrap();

        let key = |o: &IntersectionOutcome| {
            o.records
                .iter()
                .map(|r| (r.reference_code.clone(), r.target_code.clone(), r.area_km2))
                .collect::<Vec<_>>()
        };
        assert_eq!(key(&seq), key(&par));
    }

    #[test]
    fn test_cancelled_run_returns_nothing() {
        let reference = unit_set(
            UnitRole::Reference,
            6933,
            vec![unit("01101", rect_km(0.0, 0.0, 1.0, 1.0))],
        );
        let target = unit_set(
            UnitRole::Target,
            6933,
            vec![unit("01101", rect_km(0.0, 0.0, 1.0, 1.0))],
        );
        let cancel = AtomicBool::new(true);
        assert!(matches!(
            intersect(&reference, &target, true, &cancel),
            Err(CrosswalkError::Cancelled)
        ));
    }
}
