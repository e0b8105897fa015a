use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, Trim};
use log::debug;
use serde::Deserialize;

use crate::error::{Result, TrackerError};
use crate::product::parse_product_name;

/// Search terms shorter than this return nothing.
pub const MIN_SEARCH_LEN: usize = 3;
pub const MAX_RESULTS: usize = 5;

/// One row of the medicine information bank export.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct CatalogueEntry {
    pub productnaam: String,
    #[serde(default)]
    pub registratienummer: String,
    #[serde(default)]
    pub farmaceutischevorm: String,
    #[serde(default)]
    pub toedienningsweg: String,
}

pub fn load_catalogue(path: &Path) -> Result<Vec<CatalogueEntry>> {
    let file = File::open(path).map_err(|e| TrackerError::io(path, e))?;
    let entries = read_catalogue(file)?;
    debug!("loaded {} catalogue entries from {}", entries.len(), path.display());
    Ok(entries)
}

pub fn read_catalogue<R: Read>(reader: R) -> Result<Vec<CatalogueEntry>> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::Headers)
        .flexible(true)
        .from_reader(reader);

    let mut entries = Vec::new();
    for record in rdr.deserialize() {
        let entry: CatalogueEntry = record?;
        if !entry.productnaam.trim().is_empty() {
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Case-insensitive substring match on the product name, first
/// `MAX_RESULTS` hits in catalogue order.
pub fn search<'a>(entries: &'a [CatalogueEntry], term: &str) -> Vec<&'a CatalogueEntry> {
    let term = term.trim();
    if term.chars().count() < MIN_SEARCH_LEN {
        return Vec::new();
    }

    let needle = term.to_lowercase();
    entries
        .iter()
        .filter(|e| e.productnaam.to_lowercase().contains(&needle))
        .take(MAX_RESULTS)
        .collect()
}

pub fn print_search_results(results: &[&CatalogueEntry], term: &str) {
    if results.is_empty() {
        if term.trim().chars().count() < MIN_SEARCH_LEN {
            println!("Type at least {} characters to search.", MIN_SEARCH_LEN);
        } else {
            println!("No medicines found matching '{}'.", term);
        }
        return;
    }

    for entry in results {
        println!("\n{}", entry.productnaam);
        println!("  {} - {}", entry.farmaceutischevorm, entry.toedienningsweg);
        match parse_product_name(&entry.productnaam) {
            Ok(parsed) => println!("  Dosage (auto): {} {}", parsed.dose_amount, parsed.dose_unit),
            Err(_) => println!("  Dosage (auto): not found, enter it with --dose/--unit"),
        }
    }
    println!();
}
