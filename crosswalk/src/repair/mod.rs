//! Réparation des géométries d'unités
//!
//! Chaque polygone est recalculé par le moteur d'opérations booléennes
//! (union avec l'ensemble vide), ce qui découpe les auto-intersections et
//! réoriente les anneaux. Les parties sont ensuite réunies.

pub mod validity;

use geo::{BooleanOps, CoordsIter, MultiPolygon, RemoveRepeatedPoints};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::geometry::union_all;
use crate::types::{AdministrativeUnit, UnitCode, UnitRole, UnitSet};
use crate::CrosswalkError;

/// Dérive relative de surface au-delà de laquelle la réparation est signalée
pub const REPAIR_AREA_TOLERANCE: f64 = 1e-6;

/// Trace d'une réparation ayant modifié la surface d'une unité
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RepairNote {
    pub code: UnitCode,
    pub role: UnitRole,
    pub area_before_km2: f64,
    pub area_after_km2: f64,
    pub relative_drift: f64,
}

/// Résultat de la réparation d'un ensemble d'unités
#[derive(Debug, Clone)]
pub struct RepairOutcome {
    pub set: UnitSet,
    pub drift: Vec<RepairNote>,
}

/// Répare toutes les unités d'un ensemble.
///
/// Aucune unité n'est abandonnée : une géométrie irréparable interrompt le
/// traitement avec [`CrosswalkError::InvalidGeometry`].
pub fn repair_set(set: UnitSet, parallel: bool) -> Result<RepairOutcome, CrosswalkError> {
    let UnitSet { role, crs, units } = set;

    let repaired: Vec<(AdministrativeUnit, Option<RepairNote>)> = if parallel {
        units
            .into_par_iter()
            .map(|unit| repair_unit(unit, role))
            .collect::<Result<_, _>>()?
    } else {
        units
            .into_iter()
            .map(|unit| repair_unit(unit, role))
            .collect::<Result<_, _>>()?
    };

    let mut units = Vec::with_capacity(repaired.len());
    let mut drift = Vec::new();
    for (unit, note) in repaired {
        units.push(unit);
        drift.extend(note);
    }

    info!(
        role = %role,
        units = units.len(),
        drifted = drift.len(),
        "Repaired unit geometries"
    );

    Ok(RepairOutcome {
        set: UnitSet { role, crs, units },
        drift,
    })
}

fn repair_unit(
    unit: AdministrativeUnit,
    role: UnitRole,
) -> Result<(AdministrativeUnit, Option<RepairNote>), CrosswalkError> {
    let before = unit.area_km2;
    let geometry = repair_geometry(&unit.code, &unit.geometry)?;
    let repaired = AdministrativeUnit::new(unit.code, geometry);
    let after = repaired.area_km2;

    // Surface initiale nulle (anneau papillon) : dérive totale
    let relative_drift = if before > 0.0 {
        (after - before).abs() / before
    } else {
        1.0
    };

    let note = if relative_drift > REPAIR_AREA_TOLERANCE {
        warn!(
            code = %repaired.code,
            role = %role,
            before_km2 = before,
            after_km2 = after,
            drift = relative_drift,
            "Repair changed unit area"
        );
        Some(RepairNote {
            code: repaired.code.clone(),
            role,
            area_before_km2: before,
            area_after_km2: after,
            relative_drift,
        })
    } else {
        None
    };

    Ok((repaired, note))
}

/// Répare une géométrie et vérifie sa validité
pub fn repair_geometry(
    code: &UnitCode,
    geometry: &MultiPolygon,
) -> Result<MultiPolygon, CrosswalkError> {
    if geometry.0.is_empty() {
        return Err(CrosswalkError::invalid_geometry(
            code.as_str(),
            "empty geometry",
        ));
    }
    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Err(CrosswalkError::invalid_geometry(
            code.as_str(),
            "non-finite coordinate",
        ));
    }

    let cleaned = geometry.remove_repeated_points();
    let empty = MultiPolygon::new(vec![]);
    let parts: Vec<MultiPolygon> = cleaned
        .0
        .into_iter()
        .map(|polygon| MultiPolygon::new(vec![polygon]).union(&empty))
        .filter(|part| !part.0.is_empty())
        .collect();

    debug!(
        code = %code,
        polygons_in = geometry.0.len(),
        parts = parts.len(),
        "Rebuilt unit polygons"
    );

    let repaired = union_all(parts);
    if let Some(defect) = validity::find_defect(&repaired) {
        return Err(CrosswalkError::invalid_geometry(
            code.as_str(),
            format!("{} after repair", defect),
        ));
    }

    Ok(repaired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fixtures::rect_km;
    use crate::projection::Crs;
    use crate::types::M2_PER_KM2;
    use geo::{polygon, Area, Coord, LineString, Polygon};

    fn code() -> UnitCode {
        UnitCode::parse("13101").unwrap()
    }

    fn set(geometry: MultiPolygon) -> UnitSet {
        UnitSet {
            role: UnitRole::Reference,
            crs: Crs::new(6933),
            units: vec![AdministrativeUnit::new(code(), geometry)],
        }
    }

    #[test]
    fn test_valid_geometry_keeps_area() {
        let outcome = repair_set(set(rect_km(0.0, 0.0, 10.0, 10.0)), false).unwrap();
        assert!(outcome.drift.is_empty());
        assert!((outcome.set.units[0].area_km2 - 100.0).abs() < 1e-6);
    }

    #[test]
    fn test_bowtie_is_split() {
        // Anneau papillon : surface signée nulle avant réparation
        let bowtie = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 2000.0, y: 2000.0),
            (x: 2000.0, y: 0.0),
            (x: 0.0, y: 2000.0),
            (x: 0.0, y: 0.0),
        ]]);
        let outcome = repair_set(set(bowtie), false).unwrap();
        let unit = &outcome.set.units[0];

        assert!(validity::is_valid(&unit.geometry));
        assert!((unit.area_km2 - 2.0).abs() < 1e-6);
        assert_eq!(outcome.drift.len(), 1);
        assert_eq!(outcome.drift[0].code, code());
    }

    #[test]
    fn test_repeated_points_are_removed() {
        let ring = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1000.0, y: 0.0 },
            Coord { x: 1000.0, y: 0.0 },
            Coord { x: 1000.0, y: 1000.0 },
            Coord { x: 0.0, y: 1000.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let geometry = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        let repaired = repair_geometry(&code(), &geometry).unwrap();
        assert!(repaired.0[0].exterior().0.len() <= 5);
        assert!((repaired.unsigned_area() - 1e6).abs() < 1e-3);
    }

    #[test]
    fn test_overlapping_parts_are_merged() {
        let mut geometry = rect_km(0.0, 0.0, 2.0, 2.0);
        geometry.0.extend(rect_km(1.0, 0.0, 3.0, 2.0).0);
        let repaired = repair_geometry(&code(), &geometry).unwrap();
        assert_eq!(repaired.0.len(), 1);
        assert!((repaired.unsigned_area() / M2_PER_KM2 - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_geometry_fails() {
        let err = repair_geometry(&code(), &MultiPolygon::new(vec![])).unwrap_err();
        assert!(matches!(err, CrosswalkError::InvalidGeometry { .. }));
    }

    #[test]
    fn test_degenerate_geometry_fails() {
        let flat = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1000.0, y: 0.0),
            (x: 2000.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert!(matches!(
            repair_set(set(flat), true),
            Err(CrosswalkError::InvalidGeometry { .. })
        ));
    }

    #[test]
    fn test_repair_is_idempotent() {
        let once = repair_geometry(&code(), &rect_km(0.0, 0.0, 3.0, 4.0)).unwrap();
        let twice = repair_geometry(&code(), &once).unwrap();
        assert!((once.unsigned_area() - twice.unsigned_area()).abs() < 1e-6);
    }
}
