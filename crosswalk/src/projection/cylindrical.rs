//! Projection cylindrique équivalente de Lambert (EPSG:6933)
//!
//! WGS 84 / NSIDC EASE-Grid 2.0 Global, parallèle standard 30°.

use super::ellipsoid::{authalic_q, parallel_radius, WGS84};
use super::Geographic;

/// Paramètres de la projection cylindrique équivalente
#[derive(Debug, Clone, Copy)]
pub struct CylindricalEqualArea {
    /// Méridien central
    lon0: f64,
    /// Facteur d'échelle sur le parallèle standard
    k0: f64,
}

impl CylindricalEqualArea {
    /// EASE-Grid 2.0 Global (EPSG:6933)
    pub fn ease_grid_global() -> Self {
        Self::new(0.0, 30.0_f64.to_radians())
    }

    pub fn new(lon0: f64, standard_parallel: f64) -> Self {
        Self {
            lon0,
            k0: parallel_radius(standard_parallel),
        }
    }

    /// Coordonnées géographiques vers (x, y) en mètres
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let x = WGS84::A * self.k0 * (geo.lon - self.lon0);
        let y = WGS84::A * authalic_q(geo.lat) / (2.0 * self.k0);
        (x, y)
    }
}
