//! Normalisation des projections
//!
//! Toutes les géométries des deux années sont reprojetées dans un même système
//! équivalent (qui conserve les surfaces) avant tout calcul de surface ou
//! d'intersection.
//!
//! Reprojection en Rust pur :
//! - Sources : géographiques WGS84 (EPSG:4326), JGD2000 (EPSG:4612), JGD2011 (EPSG:6668),
//!   UTM 51N-56N (EPSG:32651-32656, 3097-3101, 6688-6692)
//! - Cibles : EASE-Grid 2.0 Global (EPSG:6933), Asia North Albers (ESRI:102025)
//!
//! Les autres sources passent par PROJ avec la feature `reproject`.

mod albers;
mod cylindrical;
mod ellipsoid;
#[cfg(feature = "reproject")]
mod reproject;
mod utm;

use std::fmt;

use geo::{Coord, MapCoords, MultiPolygon};
use serde::Serialize;
use tracing::{debug, info};

pub use albers::AlbersEqualArea;
pub use cylindrical::CylindricalEqualArea;

use crate::types::{AdministrativeUnit, UnitSet};
use crate::CrosswalkError;

/// Code ESRI de la projection Asia North Albers Equal Area Conic
pub const ASIA_NORTH_ALBERS: u32 = 102025;

/// Code EPSG de la grille EASE 2.0 globale (cylindrique équivalente)
pub const EASE_GRID_GLOBAL: u32 = 6933;

/// Système de coordonnées identifié par son code (EPSG, ou ESRI au-delà de 100000)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Crs(u32);

impl Crs {
    pub const fn new(code: u32) -> Self {
        Self(code)
    }

    pub fn code(self) -> u32 {
        self.0
    }

    /// Autorité du code ("ESRI" pour les codes ≥ 100000)
    pub fn authority(self) -> &'static str {
        if self.0 >= 100_000 {
            "ESRI"
        } else {
            "EPSG"
        }
    }

    /// Système géographique (longitude/latitude en degrés)
    pub fn is_geographic(self) -> bool {
        matches!(self.0, 4326 | 4612 | 6668)
    }

    /// Système dont les surfaces planes sont comparables et additives
    pub fn is_equal_area(self) -> bool {
        matches!(self.0, EASE_GRID_GLOBAL | ASIA_NORTH_ALBERS)
    }
}

impl fmt::Display for Crs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.authority(), self.0)
    }
}

/// Point en coordonnées géographiques (radians)
#[derive(Debug, Clone, Copy)]
pub struct Geographic {
    /// Longitude en radians
    pub lon: f64,
    /// Latitude en radians
    pub lat: f64,
}

impl Geographic {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    /// Convertit en degrés
    pub fn to_degrees(self) -> (f64, f64) {
        (self.lon.to_degrees(), self.lat.to_degrees())
    }

    /// Crée depuis des degrés
    pub fn from_degrees(lon_deg: f64, lat_deg: f64) -> Self {
        Self {
            lon: lon_deg.to_radians(),
            lat: lat_deg.to_radians(),
        }
    }
}

/// Système source pris en charge en Rust pur
#[derive(Debug, Clone, Copy)]
enum Source {
    Geographic,
    Utm { zone: u32, south: bool },
}

impl Source {
    fn from_crs(crs: Crs) -> Option<Self> {
        if crs.is_geographic() {
            return Some(Self::Geographic);
        }
        utm::zone_for_epsg(crs.code()).map(|(zone, south)| Self::Utm { zone, south })
    }

    fn to_geographic(self, x: f64, y: f64) -> Result<Geographic, CrosswalkError> {
        match self {
            Self::Geographic => {
                if !(-180.0..=180.0).contains(&x) || !(-90.0..=90.0).contains(&y) {
                    return Err(CrosswalkError::projection(format!(
                        "coordinate ({}, {}) is outside the lon/lat domain; is the source CRS correct?",
                        x, y
                    )));
                }
                Ok(Geographic::from_degrees(x, y))
            }
            Self::Utm { zone, south } => utm::utm_to_geographic(x, y, zone, south),
        }
    }
}

/// Projection équivalente cible
#[derive(Debug, Clone, Copy)]
enum EqualArea {
    Cylindrical(CylindricalEqualArea),
    Albers(AlbersEqualArea),
}

impl EqualArea {
    fn from_crs(crs: Crs) -> Option<Self> {
        match crs.code() {
            EASE_GRID_GLOBAL => Some(Self::Cylindrical(CylindricalEqualArea::ease_grid_global())),
            ASIA_NORTH_ALBERS => Some(Self::Albers(AlbersEqualArea::asia_north())),
            _ => None,
        }
    }

    fn forward(&self, geo: Geographic) -> (f64, f64) {
        match self {
            Self::Cylindrical(p) => p.forward(geo),
            Self::Albers(p) => p.forward(geo),
        }
    }
}

/// Reprojection légère source → géographique → équivalente
#[derive(Debug, Clone, Copy)]
pub struct ReprojectorLite {
    source: Source,
    target: EqualArea,
}

impl ReprojectorLite {
    /// Crée un nouveau reprojector
    pub fn new(source: Crs, target: Crs) -> Result<Self, CrosswalkError> {
        let Some(src) = Source::from_crs(source) else {
            return Err(CrosswalkError::projection(format!(
                "{} is not supported. Supported sources: 4326, 4612, 6668, 32651-32656, 3097-3101, 6688-6692",
                source
            )));
        };
        let Some(tgt) = EqualArea::from_crs(target) else {
            return Err(CrosswalkError::projection(format!(
                "{} is not a supported equal-area target. Supported targets: EPSG:6933, ESRI:102025",
                target
            )));
        };
        Ok(Self {
            source: src,
            target: tgt,
        })
    }

    /// Vérifie si la reprojection est supportée
    pub fn is_supported(source: Crs, target: Crs) -> bool {
        Source::from_crs(source).is_some() && EqualArea::from_crs(target).is_some()
    }

    /// Transforme un point (x, y) de la source vers la cible
    pub fn transform_point(&self, x: f64, y: f64) -> Result<(f64, f64), CrosswalkError> {
        let geo = self.source.to_geographic(x, y)?;
        Ok(self.target.forward(geo))
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &MultiPolygon) -> Result<MultiPolygon, CrosswalkError> {
        geom.try_map_coords(|c| {
            let (x, y) = self.transform_point(c.x, c.y)?;
            Ok(Coord { x, y })
        })
    }
}

/// Reprojection : identité, Rust pur, ou PROJ si la feature est activée
pub enum Reprojector {
    /// Pas de reprojection (source == cible)
    Identity,
    /// Reprojection légère (pure Rust)
    Lite(ReprojectorLite),
    /// Reprojection via PROJ
    #[cfg(feature = "reproject")]
    Proj(reproject::ProjReprojector),
}

impl Reprojector {
    /// Crée un reprojector vers un système équivalent
    pub fn new(source: Crs, target: Crs) -> Result<Self, CrosswalkError> {
        if !target.is_equal_area() {
            return Err(CrosswalkError::projection(format!(
                "{} is not an equal-area projection; areas would not be comparable",
                target
            )));
        }

        if source == target {
            return Ok(Self::Identity);
        }

        if ReprojectorLite::is_supported(source, target) {
            return Ok(Self::Lite(ReprojectorLite::new(source, target)?));
        }

        #[cfg(feature = "reproject")]
        {
            Ok(Self::Proj(reproject::ProjReprojector::new(source, target)?))
        }

        #[cfg(not(feature = "reproject"))]
        Err(CrosswalkError::projection(format!(
            "reprojection {} → {} is not supported. \
             Pure-Rust sources: 4326, 4612, 6668, UTM 51N-56N (32651-32656, 3097-3101, 6688-6692). \
             For other systems, build with: cargo build --features reproject",
            source, target
        )))
    }

    /// Transforme une géométrie
    pub fn transform_geometry(&self, geom: &MultiPolygon) -> Result<MultiPolygon, CrosswalkError> {
        match self {
            Self::Identity => Ok(geom.clone()),
            Self::Lite(lite) => lite.transform_geometry(geom),
            #[cfg(feature = "reproject")]
            Self::Proj(proj) => proj.transform_geometry(geom),
        }
    }

    /// Retourne une description du reprojector utilisé
    pub fn description(&self) -> &'static str {
        match self {
            Self::Identity => "identity",
            Self::Lite(_) => "reproject_lite (pure Rust)",
            #[cfg(feature = "reproject")]
            Self::Proj(_) => "proj (PROJ library)",
        }
    }
}

/// Reprojette les deux années dans un même système équivalent
#[derive(Debug, Clone, Copy)]
pub struct ProjectionNormalizer {
    target: Crs,
}

impl ProjectionNormalizer {
    /// Refuse toute cible qui ne conserve pas les surfaces
    pub fn new(target: Crs) -> Result<Self, CrosswalkError> {
        if !target.is_equal_area() {
            return Err(CrosswalkError::projection(format!(
                "{} is not an equal-area projection. Use EPSG:6933 or ESRI:102025",
                target
            )));
        }
        Ok(Self { target })
    }

    pub fn target(&self) -> Crs {
        self.target
    }

    /// Reprojette un ensemble d'unités ; les surfaces sont recalculées en km²
    pub fn normalize(&self, set: UnitSet) -> Result<UnitSet, CrosswalkError> {
        let reprojector = Reprojector::new(set.crs, self.target)?;
        info!(
            role = %set.role,
            from = %set.crs,
            to = %self.target,
            method = reprojector.description(),
            units = set.units.len(),
            "Reprojecting units"
        );

        let units = set
            .units
            .into_iter()
            .map(|unit| {
                let geometry = reprojector.transform_geometry(&unit.geometry).map_err(|e| {
                    debug!(code = %unit.code, error = %e, "Reprojection failed");
                    e
                })?;
                Ok(AdministrativeUnit::new(unit.code, geometry))
            })
            .collect::<Result<Vec<_>, CrosswalkError>>()?;

        Ok(UnitSet {
            role: set.role,
            crs: self.target,
            units,
        })
    }
}
