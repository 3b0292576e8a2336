//! Lecture des Shapefiles (géométries et table dBase)

use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::RawRecord;
use geo::{Area, Contains, Coord, LineString, MultiPolygon, Polygon};
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};
use tracing::warn;

use crate::config::FieldMapping;

/// Lit tous les enregistrements d'un Shapefile
pub fn read_records(path: &Path, fields: &FieldMapping) -> Result<Vec<RawRecord>> {
    let mut reader = Reader::from_path(path)
        .with_context(|| format!("Failed to open shapefile: {}", path.display()))?;

    let mut records = Vec::new();
    for (index, result) in reader.iter_shapes_and_records().enumerate() {
        let (shape, record) =
            result.with_context(|| format!("Error reading shape+record #{}", index))?;
        let (geometry, skipped) =
            shape_geometry(shape).with_context(|| format!("Record #{}", index))?;
        if skipped > 0 {
            warn!(
                path = %path.display(),
                record = index,
                rings = skipped,
                "Skipped rings with fewer than 3 points"
            );
        }

        records.push(RawRecord {
            code: code_value(record.get(&fields.code)),
            prefecture: required_text(&record, &fields.prefecture, index)?,
            city: required_text(&record, &fields.city, index)?,
            district: fields
                .district
                .as_deref()
                .and_then(|name| text_value(record.get(name)))
                .filter(|d| !d.is_empty()),
            geometry,
        });
    }

    Ok(records)
}

fn required_text(record: &Record, field: &str, index: usize) -> Result<String> {
    match record.get(field) {
        Some(value) => Ok(text_value(Some(value)).unwrap_or_default()),
        None => anyhow::bail!("Column '{}' not found (record #{})", field, index),
    }
}

/// Valeur textuelle d'un champ, nombres entiers rendus sans décimales
pub fn text_value(value: Option<&FieldValue>) -> Option<String> {
    match value? {
        FieldValue::Character(Some(s)) => Some(s.trim().to_string()),
        FieldValue::Memo(s) => Some(s.trim().to_string()),
        FieldValue::Numeric(Some(n)) => Some(format_number(*n)),
        FieldValue::Double(n) => Some(format_number(*n)),
        FieldValue::Float(Some(n)) => Some(format_number(f64::from(*n))),
        FieldValue::Integer(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Code brut ; une valeur vide est traitée comme absente
pub fn code_value(value: Option<&FieldValue>) -> Option<String> {
    text_value(value).filter(|s| !s.is_empty())
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

/// Convertit une forme Shapefile en MultiPolygon ; une forme nulle donne une géométrie vide
pub fn shape_to_multipolygon(shape: Shape) -> Result<MultiPolygon> {
    shape_geometry(shape).map(|(geometry, _)| geometry)
}

/// Géométrie et nombre d'anneaux ignorés (moins de 3 points)
pub fn shape_geometry(shape: Shape) -> Result<(MultiPolygon, usize)> {
    match shape {
        Shape::NullShape => Ok((MultiPolygon::new(vec![]), 0)),
        Shape::Polygon(p) => Ok(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        Shape::PolygonM(p) => Ok(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        Shape::PolygonZ(p) => Ok(rings_to_multipolygon(p.rings(), |pt| Coord {
            x: pt.x,
            y: pt.y,
        })),
        other => anyhow::bail!("Unsupported shape type: {:?}", other.shapetype()),
    }
}

fn rings_to_multipolygon<P>(
    rings: &[PolygonRing<P>],
    xy: impl Fn(&P) -> Coord,
) -> (MultiPolygon, usize) {
    let mut outers = Vec::new();
    let mut inners = Vec::new();
    let mut skipped = 0;

    for ring in rings {
        let (points, is_outer) = match ring {
            PolygonRing::Outer(points) => (points, true),
            PolygonRing::Inner(points) => (points, false),
        };
        let mut coords: Vec<Coord> = points.iter().map(&xy).collect();
        if coords.len() < 3 {
            skipped += 1;
            continue;
        }
        if coords.first() != coords.last() {
            coords.push(coords[0]);
        }
        if is_outer {
            outers.push(LineString::new(coords));
        } else {
            inners.push(LineString::new(coords));
        }
    }

    (organize_rings(outers, inners), skipped)
}

/// Rattache chaque trou au plus petit anneau extérieur qui le contient.
///
/// Un trou qui n'est contenu dans aucun anneau extérieur devient lui-même
/// un polygone.
pub fn organize_rings(outers: Vec<LineString>, inners: Vec<LineString>) -> MultiPolygon {
    let shells: Vec<Polygon> = outers
        .into_iter()
        .map(|ring| Polygon::new(ring, vec![]))
        .collect();
    let mut holes: Vec<Vec<LineString>> = vec![Vec::new(); shells.len()];
    let mut orphans = Vec::new();

    for inner in inners {
        let Some(&first) = inner.0.first() else {
            continue;
        };

        let parent = shells
            .iter()
            .enumerate()
            .filter(|(_, shell)| shell.contains(&first))
            .min_by(|(_, a), (_, b)| a.unsigned_area().total_cmp(&b.unsigned_area()))
            .map(|(i, _)| i);

        match parent {
            Some(i) => holes[i].push(inner),
            None => orphans.push(Polygon::new(inner, vec![])),
        }
    }

    let mut polygons: Vec<Polygon> = shells
        .into_iter()
        .zip(holes)
        .map(|(shell, holes)| Polygon::new(shell.exterior().clone(), holes))
        .collect();
    polygons.extend(orphans);

    MultiPolygon::new(polygons)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shapefile::Point;

    fn square(x0: f64, y0: f64, size: f64) -> Vec<Point> {
        vec![
            Point::new(x0, y0),
            Point::new(x0, y0 + size),
            Point::new(x0 + size, y0 + size),
            Point::new(x0 + size, y0),
            Point::new(x0, y0),
        ]
    }

    #[test]
    fn test_outer_with_hole() {
        let polygon = shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(square(0.0, 0.0, 10.0)),
            PolygonRing::Inner(square(2.0, 2.0, 2.0)),
        ]);

        let mp = shape_to_multipolygon(Shape::Polygon(polygon)).unwrap();
        assert_eq!(mp.0.len(), 1);
        assert_eq!(mp.0[0].interiors().len(), 1);
        assert!((mp.unsigned_area() - 96.0).abs() < 1e-9);
    }

    #[test]
    fn test_hole_goes_to_smallest_shell() {
        // Île dans un lac : le trou appartient à l'anneau qui l'entoure au plus près
        let outers = vec![
            LineString::from(vec![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0), (0.0, 0.0)]),
            LineString::from(vec![(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0), (5.0, 5.0)]),
        ];
        let inners = vec![LineString::from(vec![
            (8.0, 8.0),
            (12.0, 8.0),
            (12.0, 12.0),
            (8.0, 12.0),
            (8.0, 8.0),
        ])];

        let mp = organize_rings(outers, inners);
        assert_eq!(mp.0.len(), 2);
        assert!(mp.0[0].interiors().is_empty());
        assert_eq!(mp.0[1].interiors().len(), 1);
    }

    #[test]
    fn test_orphan_hole_becomes_polygon() {
        let inners = vec![LineString::from(vec![
            (0.0, 0.0),
            (1.0, 0.0),
            (1.0, 1.0),
            (0.0, 0.0),
        ])];
        let mp = organize_rings(vec![], inners);
        assert_eq!(mp.0.len(), 1);
    }

    #[test]
    fn test_short_ring_is_counted() {
        let polygon = shapefile::Polygon::with_rings(vec![
            PolygonRing::Outer(square(0.0, 0.0, 10.0)),
            PolygonRing::Outer(vec![Point::new(20.0, 20.0)]),
        ]);

        let (mp, skipped) = shape_geometry(Shape::Polygon(polygon)).unwrap();
        assert_eq!(skipped, 1);
        assert_eq!(mp.0.len(), 1);
        assert!((mp.unsigned_area() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_null_shape_is_empty() {
        assert!(shape_to_multipolygon(Shape::NullShape).unwrap().0.is_empty());
    }

    #[test]
    fn test_text_values() {
        assert_eq!(
            text_value(Some(&FieldValue::Character(Some(" 札幌市 ".to_string())))),
            Some("札幌市".to_string())
        );
        assert_eq!(
            code_value(Some(&FieldValue::Numeric(Some(1101.0)))),
            Some("1101".to_string())
        );
        assert_eq!(code_value(Some(&FieldValue::Character(Some("  ".to_string())))), None);
        assert_eq!(code_value(Some(&FieldValue::Character(None))), None);
        assert_eq!(code_value(None), None);
    }
}
