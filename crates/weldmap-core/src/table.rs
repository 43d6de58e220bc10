//! CSV import and export
//!
//! One table per entity kind. Headers are trimmed and matched
//! case-insensitively; unknown columns are ignored on import.

use tracing::{debug, info};

use crate::entity::{Entity, EntityKind};
use crate::error::ImportError;
use crate::store::{RawRecord, REQUIRED_COLUMNS};

/// Parse a CSV document into raw records for `kind`.
///
/// Fails if the header row lacks any of `id`, `x`, `y`, `z`.
pub fn read_records(kind: EntityKind, bytes: &[u8]) -> Result<Vec<RawRecord>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()?
        .iter()
        .map(|h| h.trim().to_ascii_lowercase())
        .collect();

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|column| !headers.iter().any(|h| h == *column))
        .map(|column| column.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ImportError::MissingColumns {
            kind,
            columns: missing,
        });
    }

    let mut records = Vec::new();
    for row in reader.records() {
        let row = row?;
        let record: RawRecord = headers
            .iter()
            .zip(row.iter())
            .filter(|(header, _)| !header.is_empty())
            .map(|(header, value)| (header.clone(), value.to_string()))
            .collect();
        records.push(record);
    }
    debug!(kind = %kind, rows = records.len(), "Parsed CSV table");
    Ok(records)
}

/// Serialize entities of one kind using that kind's column set
pub fn write_records<'a>(
    kind: EntityKind,
    entities: impl IntoIterator<Item = &'a Entity>,
) -> Result<Vec<u8>, csv::Error> {
    let fields = kind.fields();
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());
    writer.write_record(fields.iter().map(|f| f.name()))?;

    let mut count = 0usize;
    for entity in entities {
        writer.write_record(fields.iter().map(|f| entity.table_text(*f)))?;
        count += 1;
    }
    writer.flush()?;
    info!(kind = %kind, count, "Exported CSV table");
    writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))
}
