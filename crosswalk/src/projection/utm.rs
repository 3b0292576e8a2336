//! Projection UTM (Universal Transverse Mercator), zones couvrant le Japon
//!
//! - Zones 51N à 56N sur WGS84 (EPSG:32651-32656)
//! - Zones 51N à 55N sur JGD2000 (EPSG:3097-3101) et JGD2011 (EPSG:6688-6692)

use super::ellipsoid::WGS84;
use super::Geographic;
use crate::CrosswalkError;

/// Zone UTM associée à un code EPSG, si supportée
pub fn zone_for_epsg(epsg: u32) -> Option<(u32, bool)> {
    match epsg {
        32651..=32656 => Some((epsg - 32600, false)),
        3097..=3101 => Some((epsg - 3097 + 51, false)),
        6688..=6692 => Some((epsg - 6688 + 51, false)),
        _ => None,
    }
}

/// Convertit UTM vers coordonnées géographiques
pub fn utm_to_geographic(x: f64, y: f64, zone: u32, south: bool) -> Result<Geographic, CrosswalkError> {
    if !x.is_finite() || !y.is_finite() {
        return Err(CrosswalkError::projection(format!(
            "non-finite UTM coordinate ({}, {})",
            x, y
        )));
    }

    let a = WGS84::A;
    let e2 = WGS84::E2;
    let ep2 = WGS84::EP2;

    let k0 = 0.9996;
    let x0 = 500000.0;
    let y0 = if south { 10000000.0 } else { 0.0 };

    // Méridien central de la zone
    let lon0 = ((zone as f64 - 1.0) * 6.0 - 180.0 + 3.0).to_radians();

    let x = x - x0;
    let y = y - y0;

    // Latitude du pied de la perpendiculaire (footprint latitude)
    let m = y / k0;
    let mu = m / (a * (1.0 - e2 / 4.0 - 3.0 * e2.powi(2) / 64.0 - 5.0 * e2.powi(3) / 256.0));

    let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());

    let phi1 = mu
        + (3.0 * e1 / 2.0 - 27.0 * e1.powi(3) / 32.0) * (2.0 * mu).sin()
        + (21.0 * e1.powi(2) / 16.0 - 55.0 * e1.powi(4) / 32.0) * (4.0 * mu).sin()
        + (151.0 * e1.powi(3) / 96.0) * (6.0 * mu).sin()
        + (1097.0 * e1.powi(4) / 512.0) * (8.0 * mu).sin();

    let sin_phi1 = phi1.sin();
    let cos_phi1 = phi1.cos();
    let tan_phi1 = phi1.tan();

    let n1 = a / (1.0 - e2 * sin_phi1.powi(2)).sqrt();
    let t1 = tan_phi1.powi(2);
    let c1 = ep2 * cos_phi1.powi(2);
    let r1 = a * (1.0 - e2) / (1.0 - e2 * sin_phi1.powi(2)).powf(1.5);
    let d = x / (n1 * k0);

    let lat = phi1
        - (n1 * tan_phi1 / r1)
            * (d.powi(2) / 2.0
                - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1.powi(2) - 9.0 * ep2) * d.powi(4) / 24.0
                + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1.powi(2) - 252.0 * ep2 - 3.0 * c1.powi(2))
                    * d.powi(6)
                    / 720.0);

    let lon = lon0
        + (d - (1.0 + 2.0 * t1 + c1) * d.powi(3) / 6.0
            + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1.powi(2) + 8.0 * ep2 + 24.0 * t1.powi(2))
                * d.powi(5)
                / 120.0)
            / cos_phi1;

    Ok(Geographic::new(lon, lat))
}
