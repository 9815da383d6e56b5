//! Batch CSV loading and validation.
//!
//! Reads the per-run, per-generation log written by the batch simulation,
//! checks that the required columns are present and returns the records
//! sorted by run then generation.

use crate::models::{Record, REQUIRED_COLUMNS};
use anyhow::{Context, Result};
use std::collections::{BTreeSet, HashSet};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors detected while validating the batch table.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoadError {
    /// One or more required columns are absent. Names are sorted.
    #[error("Missing required columns: {}", .0.join(", "))]
    MissingColumns(Vec<String>),

    /// The table has a header but no data rows.
    #[error("Input contains no records")]
    Empty,
}

/// Load and sort all records from a CSV file.
pub fn load_records(path: &Path) -> Result<Vec<Record>> {
    let file =
        File::open(path).with_context(|| format!("Failed to open CSV: {}", path.display()))?;
    let records = read_records(file)
        .with_context(|| format!("Failed to load batch results from {}", path.display()))?;
    debug!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}

/// Read records from any CSV source.
pub fn read_records<R: Read>(source: R) -> Result<Vec<Record>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);

    let headers = reader.headers()?.clone();
    check_columns(headers.iter())?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        let record: Record = row?;
        records.push(record);
    }

    if records.is_empty() {
        return Err(LoadError::Empty.into());
    }

    sort_records(&mut records);
    warn_on_duplicates(&records);

    Ok(records)
}

/// Verify that every required column is present in the header.
pub fn check_columns<'a, I>(headers: I) -> Result<(), LoadError>
where
    I: IntoIterator<Item = &'a str>,
{
    let present: HashSet<&str> = headers.into_iter().collect();

    // BTreeSet keeps the report alphabetical.
    let missing: BTreeSet<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|column| !present.contains(column))
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingColumns(
            missing.into_iter().map(String::from).collect(),
        ))
    }
}

/// Sort by run, then generation.
pub fn sort_records(records: &mut [Record]) {
    records.sort_by_key(|r| (r.run, r.generation));
}

/// Log any (run, generation) pair that appears more than once.
fn warn_on_duplicates(records: &[Record]) {
    let duplicates = records
        .windows(2)
        .filter(|pair| pair[0].run == pair[1].run && pair[0].generation == pair[1].generation)
        .count();

    if duplicates > 0 {
        warn!(
            "{} duplicate (run, generation) rows found; they are kept as consecutive rows",
            duplicates
        );
    }
}
