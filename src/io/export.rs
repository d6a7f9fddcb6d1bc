//! CSV export for market records.

use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use crate::market::types::UserStepRecord;

/// Column header for CSV record export.
const HEADER: &str = "day,hour,user,price,power_available,usage_mask,\
                      consumption_before,storage_before,consumption_after,storage_after,\
                      billing_share,discomfort,cost,converged,changed";

/// Exports market records to a CSV file at the given path.
///
/// Writes a header row followed by one data row per record. Vector-valued
/// columns are joined with `;`. Produces deterministic output for identical
/// inputs.
///
/// # Arguments
///
/// * `records` - Complete record vector of a run
/// * `path` - Output file path
///
/// # Errors
///
/// Returns an `io::Error` if file creation or writing fails.
pub fn export_csv(records: &[UserStepRecord], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    let buf = io::BufWriter::new(file);
    write_csv(records, buf)
}

/// Writes market records as CSV to any writer.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_csv(records: &[UserStepRecord], writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    wtr.write_record(HEADER.split(',').map(str::trim))?;

    for r in records {
        let (consumption_before, storage_before) = split_strategy(&r.strategy_before);
        let (consumption_after, storage_after) = split_strategy(&r.strategy_after);
        let mask: String = r
            .usage_mask
            .iter()
            .map(|&on| if on { '1' } else { '0' })
            .collect();
        wtr.write_record(&[
            r.day.to_string(),
            r.hour.to_string(),
            r.user.to_string(),
            format!("{:.6}", r.price),
            r.power_available.to_string(),
            mask,
            consumption_before,
            storage_before,
            consumption_after,
            storage_after,
            format!("{:.6}", r.billing_share),
            format!("{:.6}", r.discomfort),
            format!("{:.6}", r.cost),
            r.converged.to_string(),
            r.changed.to_string(),
        ])?;
    }

    wtr.flush()?;
    Ok(())
}

/// Splits a strategy into its `;`-joined consumption part and its storage value.
fn split_strategy(strategy: &[f64]) -> (String, String) {
    match strategy.split_last() {
        Some((storage, consumption)) => (
            consumption
                .iter()
                .map(|v| format!("{v:.6}"))
                .collect::<Vec<_>>()
                .join(";"),
            format!("{storage:.6}"),
        ),
        None => (String::new(), String::new()),
    }
}
