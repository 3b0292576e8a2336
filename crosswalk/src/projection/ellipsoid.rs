//! Définitions des ellipsoïdes

/// Ellipsoïde WGS84
pub struct WGS84;

impl WGS84 {
    /// Demi-grand axe (rayon équatorial) en mètres
    pub const A: f64 = 6378137.0;

    /// Aplatissement
    pub const F: f64 = 1.0 / 298.257223563;

    /// Première excentricité au carré
    pub const E2: f64 = 2.0 * Self::F - Self::F * Self::F;

    /// Première excentricité
    pub const E: f64 = 0.0818191908426215; // sqrt(E2)

    /// Deuxième excentricité au carré
    pub const EP2: f64 = Self::E2 / (1.0 - Self::E2);
}

/// Fonction q de Snyder (latitude authalique), base des projections équivalentes
///
/// Note: JGD2000/JGD2011 utilisent GRS80, quasi identique à WGS84 (< 0.1mm)
pub fn authalic_q(lat: f64) -> f64 {
    let e = WGS84::E;
    let e2 = WGS84::E2;
    let sin_lat = lat.sin();
    let es = e * sin_lat;

    (1.0 - e2) * (sin_lat / (1.0 - es * es) - (1.0 / (2.0 * e)) * ((1.0 - es) / (1.0 + es)).ln())
}

/// Rayon du parallèle normalisé m = cos φ / sqrt(1 - e² sin² φ)
pub fn parallel_radius(lat: f64) -> f64 {
    lat.cos() / (1.0 - WGS84::E2 * lat.sin().powi(2)).sqrt()
}
