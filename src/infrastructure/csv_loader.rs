//! CSV dataset loading
//!
//! Reads a headed CSV into a `Dataset` holding only the mapped columns.

use crate::domain::dataset::{ColumnMapping, Dataset};
use crate::domain::errors::DatasetError;
use csv::StringRecord;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Cell contents treated as missing values.
const MISSING_MARKERS: &[&str] = &["", "NA", "N/A", "NaN", "nan", "null", "NULL"];

pub fn load_dataset(path: &Path, mapping: &ColumnMapping) -> Result<Dataset, DatasetError> {
    let file = std::fs::File::open(path).map_err(|e| DatasetError::Read {
        path: path.display().to_string(),
        reason: e.to_string(),
    })?;
    let dataset = read_dataset(file, mapping).map_err(|e| match e {
        DatasetError::Read { reason, .. } => DatasetError::Read {
            path: path.display().to_string(),
            reason,
        },
        other => other,
    })?;
    info!("Loaded {} rows from {:?}", dataset.len(), path);
    Ok(dataset)
}

/// Parses CSV from any reader. Mapped columns must be present in the header;
/// other columns are ignored.
pub fn read_dataset<R: Read>(reader: R, mapping: &ColumnMapping) -> Result<Dataset, DatasetError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let read_error = |e: csv::Error| DatasetError::Read {
        path: "<reader>".to_string(),
        reason: e.to_string(),
    };

    let headers = rdr.headers().map_err(read_error)?.clone();
    let index: HashMap<&str, usize> = headers.iter().enumerate().map(|(i, h)| (h, i)).collect();
    let position = |column: &str| {
        index
            .get(column)
            .copied()
            .ok_or_else(|| DatasetError::MissingColumn {
                column: column.to_string(),
            })
    };

    let numeric_columns = mapping.numeric_columns();
    let numeric_idx = numeric_columns
        .iter()
        .map(|c| position(c))
        .collect::<Result<Vec<_>, _>>()?;
    let categorical_idx = mapping
        .categorical_features
        .iter()
        .map(|c| position(c))
        .collect::<Result<Vec<_>, _>>()?;
    let datetime_idx = position(&mapping.datetime)?;

    let mut numeric: Vec<Vec<Option<f64>>> = vec![Vec::new(); numeric_columns.len()];
    let mut categorical: Vec<Vec<Option<String>>> =
        vec![Vec::new(); mapping.categorical_features.len()];
    let mut timestamps = Vec::new();

    let mut record = StringRecord::new();
    let mut row = 0usize;
    while rdr.read_record(&mut record).map_err(read_error)? {
        row += 1;
        for (slot, (&idx, column)) in numeric_idx.iter().zip(numeric_columns.iter()).enumerate() {
            numeric[slot].push(parse_number(record.get(idx), column, row)?);
        }
        for (slot, &idx) in categorical_idx.iter().enumerate() {
            categorical[slot].push(text_cell(record.get(idx)));
        }
        timestamps.push(text_cell(record.get(datetime_idx)));
    }
    debug!("Parsed {} CSV rows", row);

    let mut dataset = Dataset::new(row);
    for (column, values) in numeric_columns.iter().zip(numeric) {
        dataset = dataset.with_numeric(column.clone(), values)?;
    }
    for (column, values) in mapping.categorical_features.iter().zip(categorical) {
        dataset = dataset.with_categorical(column.clone(), values)?;
    }
    dataset.with_timestamps(&mapping.datetime, timestamps)
}

fn is_missing(cell: &str) -> bool {
    MISSING_MARKERS.contains(&cell)
}

fn text_cell(cell: Option<&str>) -> Option<String> {
    cell.filter(|c| !is_missing(c)).map(str::to_string)
}

fn parse_number(cell: Option<&str>, column: &str, row: usize) -> Result<Option<f64>, DatasetError> {
    match cell {
        None => Ok(None),
        Some(c) if is_missing(c) => Ok(None),
        Some(c) => c
            .parse::<f64>()
            .map(Some)
            .map_err(|_| DatasetError::InvalidNumber {
                column: column.to_string(),
                row,
                value: c.to_string(),
            }),
    }
}
