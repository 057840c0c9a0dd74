use std::path::Path;

use ndarray::Array2;
use tracing::debug;

use crate::consts::BAND_LABEL_HEADERS;
use crate::error::{Result, UnmixError};
use crate::spectral::ReferenceMatrix;

/// Load a reference spectral matrix from CSV.
///
/// The header row holds the channel labels; each following row is one band,
/// in band order. A leading `band` / `wavelength` / `lambda` column is
/// treated as a row label and dropped.
pub fn load_reference(path: &Path) -> Result<ReferenceMatrix> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)?;
    let reference = read_reference(reader)?;
    debug!(
        path = %path.display(),
        bands = reference.bands(),
        channels = reference.channels(),
        "Loaded reference"
    );
    Ok(reference)
}

/// Parse a reference matrix from CSV text.
pub fn parse_reference(text: &str) -> Result<ReferenceMatrix> {
    let reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    read_reference(reader)
}

fn read_reference<R: std::io::Read>(mut reader: csv::Reader<R>) -> Result<ReferenceMatrix> {
    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let skip = usize::from(headers.first().is_some_and(|h| {
        BAND_LABEL_HEADERS
            .iter()
            .any(|label| h.eq_ignore_ascii_case(label))
    }));
    let labels: Vec<String> = headers[skip..].to_vec();
    let channels = labels.len();

    let mut values: Vec<f64> = Vec::new();
    let mut bands = 0usize;
    for (row_no, record) in reader.records().enumerate() {
        let record = record?;
        if record.iter().all(|cell| cell.is_empty()) {
            continue;
        }
        if record.len() != headers.len() {
            return Err(UnmixError::InvalidReference(format!(
                "row {} has {} cells, header has {}",
                row_no + 1,
                record.len(),
                headers.len()
            )));
        }
        for (col, cell) in record.iter().enumerate().skip(skip) {
            let v = cell.parse::<f64>().map_err(|_| {
                UnmixError::InvalidReference(format!(
                    "row {}, column '{}': '{}' is not a number",
                    row_no + 1,
                    headers[col],
                    cell
                ))
            })?;
            values.push(v);
        }
        bands += 1;
    }

    let data = Array2::from_shape_vec((bands, channels), values)
        .map_err(|e| UnmixError::InvalidReference(e.to_string()))?;
    ReferenceMatrix::new(data, labels)
}
