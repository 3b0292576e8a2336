//! Lecture des FeatureCollection GeoJSON

use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::RawRecord;
use geo::{Geometry, MultiPolygon};
use geojson::{Feature, FeatureCollection, GeoJson};
use serde_json::Value;

use crate::config::FieldMapping;

/// Lit tous les enregistrements d'un fichier GeoJSON
pub fn read_records(path: &Path, fields: &FieldMapping) -> Result<Vec<RawRecord>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read GeoJSON: {}", path.display()))?;
    parse_records(&content, fields).with_context(|| format!("In {}", path.display()))
}

/// Lit les enregistrements depuis une chaîne GeoJSON
pub fn parse_records(content: &str, fields: &FieldMapping) -> Result<Vec<RawRecord>> {
    let geojson: GeoJson = content.parse().context("Failed to parse GeoJSON")?;
    let collection =
        FeatureCollection::try_from(geojson).context("Expected a GeoJSON FeatureCollection")?;

    collection
        .features
        .into_iter()
        .enumerate()
        .map(|(index, feature)| record_from_feature(index, feature, fields))
        .collect()
}

fn record_from_feature(index: usize, feature: Feature, fields: &FieldMapping) -> Result<RawRecord> {
    let required = |name: &str| -> Result<String> {
        if !feature.contains_property(name) {
            anyhow::bail!("Property '{}' not found (feature #{})", name, index);
        }
        Ok(property_text(feature.property(name)).unwrap_or_default())
    };

    let prefecture = required(&fields.prefecture)?;
    let city = required(&fields.city)?;
    let code = property_text(feature.property(&fields.code)).filter(|c| !c.is_empty());
    let district = fields
        .district
        .as_deref()
        .and_then(|name| property_text(feature.property(name)))
        .filter(|d| !d.is_empty());

    let geometry = match feature.geometry {
        Some(geometry) => {
            to_multipolygon(geometry.value).with_context(|| format!("Feature #{}", index))?
        }
        None => MultiPolygon::new(vec![]),
    };

    Ok(RawRecord {
        code,
        prefecture,
        city,
        district,
        geometry,
    })
}

/// Valeur textuelle d'une propriété, nombres entiers rendus sans décimales
pub fn property_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(i.to_string()),
            None => n.as_f64().map(|f| {
                if f.fract() == 0.0 {
                    format!("{}", f as i64)
                } else {
                    f.to_string()
                }
            }),
        },
        _ => None,
    }
}

fn to_multipolygon(value: geojson::Value) -> Result<MultiPolygon> {
    let geometry: Geometry = value.try_into().context("Invalid GeoJSON geometry")?;
    match geometry {
        Geometry::Polygon(p) => Ok(MultiPolygon::new(vec![p])),
        Geometry::MultiPolygon(mp) => Ok(mp),
        other => anyhow::bail!("Unsupported geometry type: {}", geometry_kind(&other)),
    }
}

fn geometry_kind(geometry: &Geometry) -> &'static str {
    match geometry {
        Geometry::Point(_) => "Point",
        Geometry::Line(_) => "Line",
        Geometry::LineString(_) => "LineString",
        Geometry::MultiPoint(_) => "MultiPoint",
        Geometry::MultiLineString(_) => "MultiLineString",
        Geometry::GeometryCollection(_) => "GeometryCollection",
        Geometry::Rect(_) => "Rect",
        Geometry::Triangle(_) => "Triangle",
        Geometry::Polygon(_) => "Polygon",
        Geometry::MultiPolygon(_) => "MultiPolygon",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::Area;

    fn fields() -> FieldMapping {
        FieldMapping {
            code: "N03_007".to_string(),
            prefecture: "N03_001".to_string(),
            city: "N03_004".to_string(),
            district: Some("N03_003".to_string()),
        }
    }

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "properties": {"N03_001": "北海道", "N03_003": "石狩郡", "N03_004": "当別町", "N03_007": "01303"},
                "geometry": {"type": "Polygon", "coordinates": [[[141.0, 43.0], [141.1, 43.0], [141.1, 43.1], [141.0, 43.0]]]}
            },
            {
                "type": "Feature",
                "properties": {"N03_001": "北海道", "N03_003": null, "N03_004": "札幌市", "N03_007": 1100},
                "geometry": {"type": "MultiPolygon", "coordinates": [[[[141.3, 43.0], [141.4, 43.0], [141.4, 43.1], [141.3, 43.0]]]]}
            },
            {
                "type": "Feature",
                "properties": {"N03_001": "北海道", "N03_004": "所属未定地", "N03_007": ""},
                "geometry": null
            }
        ]
    }"#;

    #[test]
    fn test_parse_records() {
        let records = parse_records(SAMPLE, &fields()).unwrap();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].code.as_deref(), Some("01303"));
        assert_eq!(records[0].district.as_deref(), Some("石狩郡"));
        assert!(records[0].geometry.unsigned_area() > 0.0);

        assert_eq!(records[1].code.as_deref(), Some("1100"));
        assert_eq!(records[1].district, None);
        assert_eq!(records[1].geometry.0.len(), 1);

        assert_eq!(records[2].code, None);
        assert!(records[2].geometry.0.is_empty());
    }

    #[test]
    fn test_missing_required_property() {
        let mut mapping = fields();
        mapping.city = "CITY".to_string();
        assert!(parse_records(SAMPLE, &mapping).is_err());
    }

    #[test]
    fn test_rejects_points() {
        let content = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "properties": {"N03_001": "a", "N03_004": "b", "N03_007": "01101"},
             "geometry": {"type": "Point", "coordinates": [141.0, 43.0]}}]}"#;
        assert!(parse_records(content, &fields()).is_err());
    }
}
