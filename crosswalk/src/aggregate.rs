//! Agrégation des enregistrements bruts : une géométrie par code d'unité

use std::collections::BTreeMap;

use geo::{CoordsIter, MultiPolygon, Polygon};
use rayon::prelude::*;
use tracing::{debug, info};

use crate::geometry::{cmp_polygons, union_all};
use crate::types::{AdministrativeUnit, Dataset, UnitCode, UnitRole, UnitSet};
use crate::CrosswalkError;

/// Résout le code de chaque enregistrement, dans l'ordre de lecture
pub fn resolve_codes(dataset: &Dataset) -> Result<Vec<UnitCode>, CrosswalkError> {
    dataset
        .records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let raw = record
                .code
                .as_deref()
                .ok_or_else(|| CrosswalkError::missing_key(index, "code column is empty"))?;
            UnitCode::parse(raw).map_err(|reason| CrosswalkError::missing_key(index, reason))
        })
        .collect()
}

/// Fusionne les parties de chaque code en une seule unité.
///
/// Les unités sont retournées triées par code, dans le système de coordonnées
/// du jeu de données.
pub fn aggregate(
    dataset: &Dataset,
    role: UnitRole,
    parallel: bool,
) -> Result<UnitSet, CrosswalkError> {
    let codes = resolve_codes(dataset)?;

    let mut grouped: BTreeMap<UnitCode, Vec<&MultiPolygon>> = BTreeMap::new();
    for (code, record) in codes.into_iter().zip(&dataset.records) {
        grouped.entry(code).or_default().push(&record.geometry);
    }

    // Le moteur booléen n'accepte que des coordonnées finies
    if let Some((code, _)) = grouped
        .iter()
        .find(|(_, parts)| parts.iter().any(|mp| has_non_finite(mp)))
    {
        return Err(CrosswalkError::invalid_geometry(
            code.as_str(),
            "non-finite coordinate",
        ));
    }

    let multi_part = grouped.values().filter(|parts| parts.len() > 1).count();
    let grouped: Vec<(UnitCode, Vec<&MultiPolygon>)> = grouped.into_iter().collect();

    let units: Vec<AdministrativeUnit> = if parallel {
        grouped
            .into_par_iter()
            .map(|(code, parts)| AdministrativeUnit::new(code, dissolve(parts)))
            .collect()
    } else {
        grouped
            .into_iter()
            .map(|(code, parts)| AdministrativeUnit::new(code, dissolve(parts)))
            .collect()
    };

    info!(
        role = %role,
        year = dataset.year,
        records = dataset.records.len(),
        units = units.len(),
        multi_part = multi_part,
        "Aggregated records into units"
    );

    Ok(UnitSet {
        role,
        crs: dataset.crs,
        units,
    })
}

fn has_non_finite(geometry: &MultiPolygon) -> bool {
    geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
}

/// Union des parties d'un même code (union, pas dissolve par adjacence)
fn dissolve(parts: Vec<&MultiPolygon>) -> MultiPolygon {
    if parts.len() == 1 {
        return parts[0].clone();
    }

    let mut polygons: Vec<Polygon> = parts.iter().flat_map(|mp| mp.0.iter().cloned()).collect();
    polygons.sort_by(cmp_polygons);
    debug!(parts = parts.len(), polygons = polygons.len(), "Dissolving unit parts");

    union_all(
        polygons
            .into_iter()
            .map(|p| MultiPolygon::new(vec![p]))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::fixtures::rect_km;
    use crate::projection::Crs;
    use crate::types::RawRecord;
    use geo::{polygon, Area};

    fn record(code: Option<&str>, geometry: MultiPolygon) -> RawRecord {
        RawRecord {
            code: code.map(str::to_string),
            prefecture: "東京都".to_string(),
            city: "千代田区".to_string(),
            district: None,
            geometry,
        }
    }

    fn dataset(records: Vec<RawRecord>) -> Dataset {
        Dataset::new(2000, Crs::new(6933), records)
    }

    #[test]
    fn test_single_part_passes_through() {
        let geometry = rect_km(0.0, 0.0, 2.0, 2.0);
        let set = aggregate(
            &dataset(vec![record(Some("13101"), geometry.clone())]),
            UnitRole::Reference,
            false,
        )
        .unwrap();

        assert_eq!(set.units.len(), 1);
        assert_eq!(set.units[0].geometry, geometry);
        assert!((set.units[0].area_km2 - 4.0).abs() < 1e-9);
    }

    #[test]
    fn test_disjoint_parts_union_into_multipolygon() {
        // Une commune et son île
        let ds = dataset(vec![
            record(Some("13101"), rect_km(0.0, 0.0, 2.0, 2.0)),
            record(Some("13102"), rect_km(2.0, 0.0, 4.0, 2.0)),
            record(Some("13101"), rect_km(10.0, 10.0, 11.0, 11.0)),
        ]);
        let set = aggregate(&ds, UnitRole::Reference, false).unwrap();

        assert_eq!(set.units.len(), 2);
        assert_eq!(set.units[0].code.as_str(), "13101");
        assert_eq!(set.units[0].geometry.0.len(), 2);
        assert!((set.units[0].area_km2 - 5.0).abs() < 1e-6);
        assert_eq!(set.units[1].code.as_str(), "13102");
    }

    #[test]
    fn test_overlapping_parts_are_not_double_counted() {
        let ds = dataset(vec![
            record(Some("13101"), rect_km(0.0, 0.0, 2.0, 2.0)),
            record(Some("13101"), rect_km(1.0, 0.0, 3.0, 2.0)),
        ]);
        let set = aggregate(&ds, UnitRole::Reference, false).unwrap();
        assert!((set.units[0].geometry.unsigned_area() / 1e6 - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_missing_code_fails() {
        let ds = dataset(vec![
            record(Some("13101"), rect_km(0.0, 0.0, 1.0, 1.0)),
            record(None, rect_km(1.0, 0.0, 2.0, 1.0)),
        ]);
        let err = aggregate(&ds, UnitRole::Target, false).unwrap_err();
        assert!(matches!(err, CrosswalkError::MissingKey { index: 1, .. }));
    }

    #[test]
    fn test_malformed_code_fails() {
        let ds = dataset(vec![record(Some("abc"), rect_km(0.0, 0.0, 1.0, 1.0))]);
        assert!(matches!(
            aggregate(&ds, UnitRole::Target, false),
            Err(CrosswalkError::MissingKey { index: 0, .. })
        ));
    }

    #[test]
    fn test_non_finite_part_fails_before_union() {
        let broken = MultiPolygon::new(vec![geo::polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1000.0, y: 1000.0),
            (x: 0.0, y: 1000.0),
            (x: 0.0, y: 0.0),
        ]]);
        let ds = dataset(vec![
            record(Some("01101"), broken),
            record(Some("01101"), rect_km(2.0, 0.0, 3.0, 1.0)),
        ]);

        let err = aggregate(&ds, UnitRole::Reference, false).unwrap_err();
        assert!(matches!(
            err,
            CrosswalkError::InvalidGeometry { ref code, .. } if code == "01101"
        ));
    }

    #[test]
    fn test_input_order_does_not_change_result() {
        let parts = vec![
            record(Some("01101"), rect_km(0.0, 0.0, 1.0, 1.0)),
            record(Some("01101"), rect_km(1.0, 0.0, 2.0, 1.5)),
            record(Some("01101"), rect_km(0.5, 1.0, 1.5, 3.0)),
        ];
        let mut reversed = parts.clone();
        reversed.reverse();

        let a = aggregate(&dataset(parts), UnitRole::Reference, false).unwrap();
        let b = aggregate(&dataset(reversed), UnitRole::Reference, true).unwrap();
        assert_eq!(a.units[0].geometry, b.units[0].geometry);
        assert_eq!(a.units[0].area_km2, b.units[0].area_km2);
    }
}
