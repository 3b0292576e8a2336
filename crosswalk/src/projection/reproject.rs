//! Reprojection de géométries avec PROJ
//!
//! Ce module est disponible uniquement avec le feature `reproject`.

use geo::{Coord, MapCoords, MultiPolygon};
use proj::Proj;

use super::Crs;
use crate::CrosswalkError;

/// Reprojection de géométries entre deux systèmes de coordonnées
pub struct ProjReprojector {
    proj: Proj,
    source: Crs,
    target: Crs,
}

impl ProjReprojector {
    /// Crée un nouveau reprojector entre deux systèmes connus de PROJ
    pub fn new(source: Crs, target: Crs) -> Result<Self, CrosswalkError> {
        let proj = Proj::new_known_crs(&source.to_string(), &target.to_string(), None).map_err(
            |e| {
                CrosswalkError::projection(format!(
                    "Failed to create projection from {} to {}: {}",
                    source, target, e
                ))
            },
        )?;

        Ok(Self {
            proj,
            source,
            target,
        })
    }

    /// Retourne le système source
    pub fn source(&self) -> Crs {
        self.source
    }

    /// Retourne le système cible
    pub fn target(&self) -> Crs {
        self.target
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &MultiPolygon) -> Result<MultiPolygon, CrosswalkError> {
        geom.try_map_coords(|c| {
            let (x, y) = self.proj.convert((c.x, c.y)).map_err(|e| {
                CrosswalkError::projection(format!(
                    "Coordinate transformation {} → {} failed at ({}, {}): {}",
                    self.source, self.target, c.x, c.y, e
                ))
            })?;
            Ok(Coord { x, y })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, Area};

    #[test]
    fn test_tokyo_datum_square() {
        let reprojector = ProjReprojector::new(Crs::new(4301), Crs::new(6933)).unwrap();

        let square = MultiPolygon::new(vec![polygon![
            (x: 139.0, y: 35.0),
            (x: 139.1, y: 35.0),
            (x: 139.1, y: 35.1),
            (x: 139.0, y: 35.1),
            (x: 139.0, y: 35.0),
        ]]);
        let result = reprojector.transform_geometry(&square).unwrap();

        // Environ 101 km² pour 0.1° x 0.1° à 35°N
        let area_km2 = result.unsigned_area() / 1e6;
        assert!((area_km2 - 101.0).abs() < 2.0, "area={}", area_km2);
    }

    #[test]
    fn test_invalid_epsg() {
        assert!(ProjReprojector::new(Crs::new(99999), Crs::new(6933)).is_err());
    }
}
