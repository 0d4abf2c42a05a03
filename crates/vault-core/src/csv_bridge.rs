use csv::{ReaderBuilder, Terminator, Trim, WriterBuilder};
use thiserror::Error;

use crate::record::Record;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("csv import failed: {0}")]
    Import(String),
    #[error("nothing to export")]
    EmptyExport,
    #[error("csv export failed: {0}")]
    Write(String),
}

#[derive(Clone, Debug)]
pub struct CsvImport {
    pub records: Vec<Record>,
    pub count: usize,
}

/// Parses CSV with a header row into records keyed by the trimmed header names.
///
/// Columns with a blank header are dropped. Rows without a usable `id` get a
/// generated one. Any malformed row fails the whole import.
pub fn import_csv(input: &[u8]) -> Result<CsvImport, CsvError> {
    let input = input.strip_prefix(UTF8_BOM).unwrap_or(input);
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(input);

    let columns: Vec<Option<String>> = reader
        .headers()
        .map_err(|err| CsvError::Import(err.to_string()))?
        .iter()
        .map(|name| {
            let name = name.trim();
            (!name.is_empty()).then(|| name.to_string())
        })
        .collect();
    if columns.iter().all(Option::is_none) {
        return Err(CsvError::Import("missing header row".to_string()));
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row.map_err(|err| CsvError::Import(err.to_string()))?;
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let mut record = Record::new();
        for (column, cell) in columns.iter().zip(row.iter()) {
            if let Some(name) = column {
                record.insert(name.as_str(), cell.trim());
            }
        }
        record.ensure_id();
        records.push(record);
    }

    let count = records.len();
    Ok(CsvImport { records, count })
}

/// Renders records as CSV. Columns come from the first record, in its field
/// order; extra fields on later records are omitted, missing ones are empty.
/// Values are written as stored. Edge whitespace survives export but is
/// trimmed again by [`import_csv`].
pub fn export_csv(records: &[Record]) -> Result<String, CsvError> {
    let first = records.first().ok_or(CsvError::EmptyExport)?;
    let columns: Vec<&str> = first.keys().collect();

    let mut writer = WriterBuilder::new()
        .terminator(Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer
        .write_record(&columns)
        .map_err(|err| CsvError::Write(err.to_string()))?;
    for record in records {
        writer
            .write_record(columns.iter().map(|column| record.get(column).unwrap_or("")))
            .map_err(|err| CsvError::Write(err.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|err| CsvError::Write(err.to_string()))?;
    String::from_utf8(bytes).map_err(|err| CsvError::Write(err.to_string()))
}
