//! Export JSON de la table de passage

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::{Crosswalk, CrosswalkRow, DegenerateUnit, WeightMode};
use serde::Serialize;

#[derive(Serialize)]
struct CrosswalkDocument<'a> {
    reference_year: u16,
    target_year: u16,
    mode: WeightMode,
    rows: &'a [CrosswalkRow],
    degenerate: &'a [DegenerateUnit],
}

/// Écrit la table (lignes et unités dégénérées) en JSON indenté
pub fn write_json<W: Write>(writer: W, crosswalk: &Crosswalk) -> Result<()> {
    let document = CrosswalkDocument {
        reference_year: crosswalk.reference_year,
        target_year: crosswalk.target_year,
        mode: crosswalk.mode,
        rows: &crosswalk.rows,
        degenerate: &crosswalk.degenerate,
    };
    serde_json::to_writer_pretty(writer, &document)?;
    Ok(())
}

pub fn export_json(crosswalk: &Crosswalk, path: &Path) -> Result<()> {
    let file =
        File::create(path).context(format!("Failed to create file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    write_json(&mut writer, crosswalk)?;
    writer.flush()?;
    Ok(())
}
