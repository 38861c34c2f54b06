//! CSV decode/encode for feature tables.

use super::value::infer_column;
use super::{FeatureTable, TableError, Value};
use std::borrow::Cow;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// UTF-8 when valid (BOM stripped), Latin-1 otherwise.
fn decode_text(bytes: &[u8]) -> Cow<'_, str> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => Cow::Borrowed(s),
        Err(_) => Cow::Owned(bytes.iter().map(|&b| b as char).collect()),
    }
}

/// Later duplicates of a header get `.1`, `.2`, ... appended.
fn dedupe_headers(headers: &csv::StringRecord) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(headers.len());
    for h in headers.iter() {
        let mut name = h.to_string();
        let mut n = 0;
        while out.contains(&name) {
            n += 1;
            name = format!("{}.{}", h, n);
        }
        out.push(name);
    }
    out
}

pub(super) fn decode(bytes: &[u8]) -> Result<FeatureTable, TableError> {
    let text = decode_text(bytes);
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || (headers.len() == 1 && headers[0].trim().is_empty()) {
        return Err(TableError::NoColumns);
    }
    let columns = dedupe_headers(&headers);
    let width = columns.len();

    let mut records = Vec::new();
    for result in reader.records() {
        let record = result?;
        if record.len() > width {
            let line = record.position().map(|p| p.line()).unwrap_or_default();
            return Err(TableError::TooManyFields {
                line,
                expected: width,
                found: record.len(),
            });
        }
        records.push(record);
    }

    let mut cells: Vec<Vec<Value>> = Vec::with_capacity(width);
    for col in 0..width {
        let raw: Vec<Option<&str>> = records.iter().map(|r| r.get(col)).collect();
        cells.push(infer_column(&raw));
    }

    let rows = (0..records.len())
        .map(|i| cells.iter().map(|col| col[i].clone()).collect())
        .collect();
    FeatureTable::new(columns, rows)
}

pub(super) fn encode(table: &FeatureTable) -> Result<Vec<u8>, TableError> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());
    writer.write_record(table.columns())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|v| v.to_string()))?;
    }
    writer
        .into_inner()
        .map_err(|e| TableError::Export(e.error().to_string()))
}
