//! # jpn-crosswalk
//!
//! Chargement des découpages municipaux japonais (Shapefile, GeoJSON) et
//! export des tables de passage calculées par le crate `crosswalk`.

pub mod config;
pub mod export;
pub mod io;
pub mod report;

pub use config::{Config, FieldMapping};
pub use export::OutputFormat;
pub use report::{CrosswalkReport, RunStatus};
