//! Contrôle de validité après réparation

use geo::{Area, CoordsIter, LineString, MultiPolygon};

/// Décrit le premier défaut trouvé, ou None si la géométrie est exploitable.
///
/// Anneaux fermés d'au moins 4 sommets, coordonnées finies, surface non nulle.
pub fn find_defect(geometry: &MultiPolygon) -> Option<String> {
    if geometry.0.is_empty() {
        return Some("empty geometry".to_string());
    }

    if geometry
        .coords_iter()
        .any(|c| !c.x.is_finite() || !c.y.is_finite())
    {
        return Some("non-finite coordinate".to_string());
    }

    for (i, polygon) in geometry.0.iter().enumerate() {
        if let Some(defect) = ring_defect(polygon.exterior()) {
            return Some(format!("exterior ring of polygon #{} {}", i, defect));
        }
        for hole in polygon.interiors() {
            if let Some(defect) = ring_defect(hole) {
                return Some(format!("interior ring of polygon #{} {}", i, defect));
            }
        }
        if polygon.unsigned_area() <= 0.0 {
            return Some(format!("polygon #{} has zero area", i));
        }
    }

    None
}

pub fn is_valid(geometry: &MultiPolygon) -> bool {
    find_defect(geometry).is_none()
}

fn ring_defect(ring: &LineString) -> Option<String> {
    if ring.0.len() < 4 {
        return Some(format!("has {} vertices", ring.0.len()));
    }
    if !ring.is_closed() {
        return Some("is not closed".to_string());
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Coord, Polygon};

    #[test]
    fn test_valid_square() {
        let square = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert!(is_valid(&square));
    }

    #[test]
    fn test_empty_is_invalid() {
        assert_eq!(
            find_defect(&MultiPolygon::new(vec![])).as_deref(),
            Some("empty geometry")
        );
    }

    #[test]
    fn test_flat_polygon_is_invalid() {
        let flat = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 2.0, y: 0.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert!(find_defect(&flat).unwrap().contains("zero area"));
    }

    #[test]
    fn test_short_ring_is_invalid() {
        let ring = LineString::new(vec![
            Coord { x: 0.0, y: 0.0 },
            Coord { x: 1.0, y: 0.0 },
            Coord { x: 0.0, y: 0.0 },
        ]);
        let poly = MultiPolygon::new(vec![Polygon::new(ring, vec![])]);
        assert!(find_defect(&poly).unwrap().contains("vertices"));
    }

    #[test]
    fn test_nan_is_invalid() {
        let poly = MultiPolygon::new(vec![polygon![
            (x: 0.0, y: 0.0),
            (x: f64::NAN, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 0.0),
        ]]);
        assert_eq!(find_defect(&poly).as_deref(), Some("non-finite coordinate"));
    }
}
