//! Export CSV de la table de passage

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};
use crosswalk::Crosswalk;

/// En-tête : préfecture, ville, district et code pour chaque année, puis le poids
pub fn header(reference_year: u16, target_year: u16) -> Vec<String> {
    let mut columns = Vec::with_capacity(9);
    for year in [reference_year, target_year] {
        columns.push(format!("PREF{}", year));
        columns.push(format!("CITY{}", year));
        columns.push(format!("GUN{}", year));
        columns.push(format!("City Code {}", year));
    }
    columns.push("weight".to_string());
    columns
}

/// Écrit la table dans un flux CSV
pub fn write_csv<W: Write>(writer: W, crosswalk: &Crosswalk) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(header(crosswalk.reference_year, crosswalk.target_year))?;

    for row in &crosswalk.rows {
        let weight = row.weight.to_string();
        wtr.write_record([
            row.reference.prefecture.as_str(),
            row.reference.city.as_str(),
            row.reference.district.as_str(),
            row.reference.code.as_str(),
            row.target.prefecture.as_str(),
            row.target.city.as_str(),
            row.target.district.as_str(),
            row.target.code.as_str(),
            weight.as_str(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exporte la table dans un fichier CSV
pub fn export_csv(crosswalk: &Crosswalk, path: &Path) -> Result<()> {
    let file =
        File::create(path).context(format!("Failed to create file: {}", path.display()))?;
    write_csv(BufWriter::new(file), crosswalk)
}
