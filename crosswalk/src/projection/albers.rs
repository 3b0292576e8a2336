//! Projection conique équivalente d'Albers
//!
//! Asia North Albers Equal Area Conic (ESRI:102025) :
//! méridien central 95°E, latitude d'origine 30°N, parallèles standards 15°N et 65°N.

use super::ellipsoid::{authalic_q, parallel_radius, WGS84};
use super::Geographic;

/// Constantes précalculées de la projection
#[derive(Debug, Clone, Copy)]
pub struct AlbersEqualArea {
    lon0: f64,
    n: f64,
    c: f64,
    rho0: f64,
}

impl AlbersEqualArea {
    /// Asia North Albers Equal Area Conic (ESRI:102025)
    pub fn asia_north() -> Self {
        Self::new(
            95.0_f64.to_radians(),
            30.0_f64.to_radians(),
            15.0_f64.to_radians(),
            65.0_f64.to_radians(),
        )
    }

    pub fn new(lon0: f64, lat0: f64, lat1: f64, lat2: f64) -> Self {
        let m1 = parallel_radius(lat1);
        let m2 = parallel_radius(lat2);
        let q0 = authalic_q(lat0);
        let q1 = authalic_q(lat1);
        let q2 = authalic_q(lat2);

        // Cône tangent si les deux parallèles sont confondus
        let n = if (lat1 - lat2).abs() < 1e-12 {
            lat1.sin()
        } else {
            (m1 * m1 - m2 * m2) / (q2 - q1)
        };
        let c = m1 * m1 + n * q1;
        let rho0 = WGS84::A * (c - n * q0).sqrt() / n;

        Self { lon0, n, c, rho0 }
    }

    /// Coordonnées géographiques vers (x, y) en mètres
    pub fn forward(&self, geo: Geographic) -> (f64, f64) {
        let q = authalic_q(geo.lat);
        let rho = WGS84::A * (self.c - self.n * q).max(0.0).sqrt() / self.n;
        let theta = self.n * (geo.lon - self.lon0);

        let x = rho * theta.sin();
        let y = self.rho0 - rho * theta.cos();
        (x, y)
    }
}
