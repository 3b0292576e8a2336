//! Rapport d'exécution
//!
//! Résume une table de passage calculée : compteurs de chaque étape,
//! unités dégénérées (nombre et codes) et dérives de surface à la réparation.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use crosswalk::{Crosswalk, CrosswalkConfig, DegenerateReason, DegenerateUnit, RepairNote};
use serde::Serialize;

/// Statut global du calcul
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RunStatus {
    /// Toutes les unités ont une correspondance
    Success,
    /// Table produite, mais des unités sont dégénérées
    PartialSuccess,
    /// Aucune ligne produite
    Failed,
}

/// Rapport complet d'un calcul
#[derive(Debug, Clone, Serialize)]
pub struct CrosswalkReport {
    pub reference_year: u16,
    pub target_year: u16,
    pub mode: String,
    pub min_share: f64,
    pub target_crs: u32,
    /// Durée du calcul
    pub duration_secs: f64,
    pub status: RunStatus,

    pub reference_records: usize,
    pub target_records: usize,
    pub reference_units: usize,
    pub target_units: usize,
    pub candidate_pairs: usize,
    pub zero_area_pairs: usize,
    pub below_threshold: usize,
    pub rows: usize,
    pub attribute_conflicts: usize,

    /// Unités sans correspondance
    pub degenerate: Vec<DegenerateUnit>,
    /// Réparations ayant modifié la surface
    pub repair_drift: Vec<RepairNote>,
    /// Fichiers écrits
    pub outputs: Vec<String>,
}

impl CrosswalkReport {
    /// Construit le rapport d'une table calculée
    pub fn from_crosswalk(crosswalk: &Crosswalk, config: &CrosswalkConfig) -> Self {
        let stats = &crosswalk.stats;
        let mut report = Self {
            reference_year: crosswalk.reference_year,
            target_year: crosswalk.target_year,
            mode: crosswalk.mode.to_string(),
            min_share: config.min_share,
            target_crs: config.target_crs,
            duration_secs: 0.0,
            status: RunStatus::Success,
            reference_records: stats.reference_records,
            target_records: stats.target_records,
            reference_units: stats.reference_units,
            target_units: stats.target_units,
            candidate_pairs: stats.candidate_pairs,
            zero_area_pairs: stats.zero_area_pairs,
            below_threshold: stats.below_threshold,
            rows: crosswalk.rows.len(),
            attribute_conflicts: stats.attribute_conflicts,
            degenerate: crosswalk.degenerate.clone(),
            repair_drift: stats.repair_drift.clone(),
            outputs: Vec::new(),
        };
        report.finalize();
        report
    }

    /// Enregistre un fichier écrit
    pub fn record_output(&mut self, path: &Path) {
        self.outputs.push(path.display().to_string());
    }

    /// Définit la durée du calcul
    pub fn set_duration(&mut self, duration: Duration) {
        self.duration_secs = duration.as_secs_f64();
    }

    /// Détermine le statut final
    pub fn finalize(&mut self) {
        self.status = if self.rows == 0 {
            RunStatus::Failed
        } else if !self.degenerate.is_empty() {
            RunStatus::PartialSuccess
        } else {
            RunStatus::Success
        };
    }

    /// Codes dégénérés pour une raison donnée
    pub fn degenerate_codes(&self, reason: DegenerateReason) -> Vec<&str> {
        self.degenerate
            .iter()
            .filter(|u| u.reason == reason)
            .map(|u| u.code.as_str())
            .collect()
    }

    /// Affiche le rapport sur la console
    pub fn display(&self) {
        println!("\n{}", "=".repeat(60));
        println!(
            "CROSSWALK REPORT - {} → {}",
            self.reference_year, self.target_year
        );
        println!("{}", "=".repeat(60));

        println!("\nStatus: {:?}", self.status);
        println!("Duration: {:.2}s", self.duration_secs);
        println!(
            "Mode: {} (min share {}, EPSG/ESRI {})",
            self.mode, self.min_share, self.target_crs
        );

        println!("\n--- SUMMARY ---");
        println!(
            "Records: {} reference, {} target",
            self.reference_records, self.target_records
        );
        println!(
            "Units: {} reference, {} target",
            self.reference_units, self.target_units
        );
        println!(
            "Pairs: {} candidates, {} without area, {} below threshold",
            self.candidate_pairs, self.zero_area_pairs, self.below_threshold
        );
        println!("Rows: {}", self.rows);
        if self.attribute_conflicts > 0 {
            println!("Codes with conflicting names: {}", self.attribute_conflicts);
        }

        if !self.degenerate.is_empty() {
            println!("\n--- DEGENERATE UNITS ({}) ---", self.degenerate.len());
            for (reason, label) in [
                (DegenerateReason::NoOverlap, "no overlap"),
                (DegenerateReason::AllBelowThreshold, "all below threshold"),
            ] {
                let codes = self.degenerate_codes(reason);
                if !codes.is_empty() {
                    println!("  {} ({}): {}", label, codes.len(), codes.join(", "));
                }
            }
        }

        if !self.repair_drift.is_empty() {
            println!("\n--- REPAIR DRIFT ({}) ---", self.repair_drift.len());
            for note in self.repair_drift.iter().take(10) {
                println!(
                    "  [{} {}] {:.6} → {:.6} km² ({:.2e})",
                    note.role,
                    note.code,
                    note.area_before_km2,
                    note.area_after_km2,
                    note.relative_drift
                );
            }
            if self.repair_drift.len() > 10 {
                println!("  ... and {} more", self.repair_drift.len() - 10);
            }
        }

        if !self.outputs.is_empty() {
            println!("\n--- OUTPUTS ---");
            for output in &self.outputs {
                println!("  {}", output);
            }
        }

        println!("\n{}", "=".repeat(60));
    }

    /// Sauvegarde le rapport en JSON
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write report: {}", path.display()))?;
        Ok(())
    }

    /// Affichage compact pour le résumé
    pub fn summary(&self) -> String {
        format!(
            "{} → {}: {} rows, {} degenerate units",
            self.reference_year,
            self.target_year,
            self.rows,
            self.degenerate.len()
        )
    }
}
