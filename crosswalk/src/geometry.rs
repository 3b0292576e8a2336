//! Utilitaires géométriques partagés (union déterministe, ordre canonique, enveloppes)

use std::cmp::Ordering;

use geo::{Area, BooleanOps, BoundingRect, CoordsIter, MultiPolygon, Polygon};
use rstar::{RTreeObject, AABB};

/// Union de toutes les parties, par paires successives (arbre équilibré).
///
/// L'ordre des opérations ne dépend que de l'ordre de `parts`, ce qui rend
/// le résultat reproductible au bit près.
pub fn union_all(mut parts: Vec<MultiPolygon>) -> MultiPolygon {
    while parts.len() > 1 {
        let mut next = Vec::with_capacity(parts.len().div_ceil(2));
        let mut iter = parts.into_iter();
        while let Some(a) = iter.next() {
            match iter.next() {
                Some(b) => next.push(a.union(&b)),
                None => next.push(a),
            }
        }
        parts = next;
    }
    parts.pop().unwrap_or_else(|| MultiPolygon::new(vec![]))
}

/// Ordre total sur les polygones, indépendant de l'ordre de lecture
pub fn cmp_polygons(a: &Polygon, b: &Polygon) -> Ordering {
    let rect_key = |p: &Polygon| {
        p.bounding_rect()
            .map(|r| [r.min().x, r.min().y, r.max().x, r.max().y])
            .unwrap_or([f64::NAN; 4])
    };

    let (ka, kb) = (rect_key(a), rect_key(b));
    ka.iter()
        .zip(kb.iter())
        .map(|(x, y)| x.total_cmp(y))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.coords_count().cmp(&b.coords_count()))
        .then_with(|| a.unsigned_area().total_cmp(&b.unsigned_area()))
        .then_with(|| {
            a.coords_iter()
                .zip(b.coords_iter())
                .map(|(ca, cb)| ca.x.total_cmp(&cb.x).then(ca.y.total_cmp(&cb.y)))
                .find(|o| o.is_ne())
                .unwrap_or(Ordering::Equal)
        })
}

/// Enveloppe d'une unité dans le R-tree, associée par index
#[derive(Debug, Clone)]
pub struct IndexedEnvelope {
    idx: usize,
    envelope: AABB<[f64; 2]>,
}

impl IndexedEnvelope {
    /// Retourne None pour une géométrie vide
    pub fn new(idx: usize, geometry: &MultiPolygon) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            idx,
            envelope: AABB::from_corners(rect.min().into(), rect.max().into()),
        })
    }

    /// Index de l'unité correspondante
    pub fn idx(&self) -> usize {
        self.idx
    }
}

impl RTreeObject for IndexedEnvelope {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// Enveloppe d'une géométrie pour interroger le R-tree
pub fn envelope_of(geometry: &MultiPolygon) -> Option<AABB<[f64; 2]>> {
    let rect = geometry.bounding_rect()?;
    Some(AABB::from_corners(rect.min().into(), rect.max().into()))
}
