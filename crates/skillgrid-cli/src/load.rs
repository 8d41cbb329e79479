//! Reading snapshots and JSON inputs from disk

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::de::DeserializeOwned;
use skillgrid::{Cell, CellValue, Sheet, SpreadsheetSnapshot};

/// Load a snapshot from `.json` (serialized snapshot) or `.csv` (one sheet)
pub fn load_snapshot(path: &Path) -> Result<SpreadsheetSnapshot> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());

    match extension.as_deref() {
        Some("json") => load_json(path),
        Some("csv") => {
            let file =
                File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
            let name = path
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("Sheet1");
            read_csv(file, name).with_context(|| format!("Failed to read '{}'", path.display()))
        }
        _ => bail!("Unsupported snapshot format: {}", path.display()),
    }
}

/// Deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open '{}'", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse '{}'", path.display()))
}

/// Read CSV without headers into a single-sheet snapshot
pub fn read_csv<R: Read>(reader: R, sheet_name: &str) -> Result<SpreadsheetSnapshot> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut grid = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        grid.push(record.iter().map(detect_cell).collect());
    }

    Ok(SpreadsheetSnapshot::single_sheet(Sheet {
        grid,
        ..Sheet::new(sheet_name)
    }))
}

/// Turn a CSV field into a cell
///
/// A leading `=` marks a formula; its value is unknown until recalculated.
fn detect_cell(field: &str) -> Cell {
    let field = field.trim();

    if field.is_empty() {
        return Cell::default();
    }

    if field.starts_with('=') {
        return Cell {
            formula: Some(field.to_string()),
            ..Cell::default()
        };
    }

    let value = if field.eq_ignore_ascii_case("true") {
        CellValue::Boolean(true)
    } else if field.eq_ignore_ascii_case("false") {
        CellValue::Boolean(false)
    } else if let Ok(n) = field.parse::<f64>() {
        CellValue::Number(n)
    } else {
        CellValue::text(field)
    };
    Cell::value(value)
}
