//! Export GeoJSON des géométries d'intersection (diagnostic), avec geozero

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::{Crs, IntersectionRecord};
use geo::Geometry;
use geozero::geojson::GeoJsonWriter;
use geozero::GeozeroGeometry;

/// Exporte les recouvrements en FeatureCollection, dans la projection équivalente
pub fn export_overlaps(overlaps: &[IntersectionRecord], crs: Crs, output_path: &Path) -> Result<()> {
    super::ensure_parent_dir(output_path)?;
    let file = File::create(output_path)
        .context(format!("Failed to create file: {}", output_path.display()))?;
    let mut writer = BufWriter::new(file);

    write_overlaps(&mut writer, overlaps, crs)?;
    writer.flush()?;
    Ok(())
}

/// Écrit la FeatureCollection dans un flux
pub fn write_overlaps<W: Write>(
    writer: &mut W,
    overlaps: &[IntersectionRecord],
    crs: Crs,
) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"FeatureCollection","crs":{{"type":"name","properties":{{"name":"urn:ogc:def:crs:{}::{}"}}}},"features":["#,
        crs.authority(),
        crs.code()
    )?;

    for (i, overlap) in overlaps.iter().enumerate() {
        if i > 0 {
            write!(writer, ",")?;
        }
        write_feature(writer, overlap)?;
    }

    write!(writer, "]}}")?;
    Ok(())
}

fn write_feature<W: Write>(writer: &mut W, overlap: &IntersectionRecord) -> Result<()> {
    write!(
        writer,
        r#"{{"type":"Feature","id":"{}-{}","#,
        overlap.reference_code, overlap.target_code
    )?;

    write!(writer, r#""geometry":"#)?;
    let mut geom_buf = Vec::new();
    let mut geom_writer = GeoJsonWriter::new(&mut geom_buf);
    Geometry::MultiPolygon(overlap.geometry.clone()).process_geom(&mut geom_writer)?;
    writer.write_all(&geom_buf)?;

    // Codes à 5 chiffres : pas d'échappement nécessaire
    write!(
        writer,
        r#","properties":{{"reference_code":"{}","target_code":"{}","area_km2":{}}}}}"#,
        overlap.reference_code, overlap.target_code, overlap.area_km2
    )?;

    Ok(())
}
