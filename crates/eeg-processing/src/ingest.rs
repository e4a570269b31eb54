//! Parsing of the raw acquisition CSV
//!
//! Expected layout: a header row, then `timestamp_ms, TP9, AF7, AF8, TP10`
//! by position. Columns after the fifth are ignored.

use eeg_core::{EegError, EegResult, RawSample, CHANNEL_COUNT};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::debug;

const REQUIRED_COLUMNS: usize = 1 + CHANNEL_COUNT;

/// Parse a raw recording from any reader
pub fn parse_raw_csv<R: Read>(reader: R) -> EegResult<Vec<RawSample>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut samples = Vec::new();
    for (row, record) in csv_reader.records().enumerate() {
        let record = record.map_err(|e| EegError::Csv(e.to_string()))?;
        let line = row + 1;
        if record.len() < REQUIRED_COLUMNS {
            return Err(EegError::malformed(format!(
                "data row {} has {} fields, expected at least {}",
                line,
                record.len(),
                REQUIRED_COLUMNS
            )));
        }

        let mut values = [0.0f64; REQUIRED_COLUMNS];
        for (col, value) in values.iter_mut().enumerate() {
            let field = &record[col];
            *value = field.parse().map_err(|_| {
                EegError::malformed(format!(
                    "data row {}, column {}: '{}' is not a number",
                    line,
                    col + 1,
                    field
                ))
            })?;
        }
        samples.push(RawSample::new(values[0], [values[1], values[2], values[3], values[4]]));
    }

    debug!(rows = samples.len(), "parsed raw recording");
    Ok(samples)
}

/// Read a raw recording from disk
pub fn read_raw_csv(path: &Path) -> EegResult<Vec<RawSample>> {
    let file = File::open(path)?;
    parse_raw_csv(file)
}
