//! CSV export of object listings.
//!
//! One row per object with the columns `Key,LastModified,Size,SizeHuman`,
//! followed by any additional fields, looked up in each record's metadata.

use std::path::Path;

use anyhow::{Result, anyhow};
use byte_unit::{Byte, Unit, UnitType};
use chrono::SecondsFormat;
use tracing::info;

use crate::types::ObjectRecord;
use crate::types::error::S3cleanerError;

const BASE_HEADER: [&str; 4] = ["Key", "LastModified", "Size", "SizeHuman"];

/// Writes object listings to a CSV file.
#[derive(Debug, Clone, Default)]
pub struct ReportExporter {
    additional_fields: Vec<String>,
}

impl ReportExporter {
    /// `additional_fields` are appended as columns after the base ones.
    /// A record without a value for a field gets an empty cell.
    pub fn new(additional_fields: Vec<String>) -> Self {
        Self { additional_fields }
    }

    /// Write `records` to `path`, replacing any existing file.
    ///
    /// Returns the number of rows written. Any failure is reported as
    /// [`S3cleanerError::ReportWrite`].
    pub fn export<'a, I>(&self, records: I, path: &Path) -> Result<usize>
    where
        I: IntoIterator<Item = &'a ObjectRecord>,
    {
        let rows = self
            .write_csv(records, path)
            .map_err(|e| anyhow!(S3cleanerError::ReportWrite(format!("{}: {e}", path.display()))))?;

        info!(path = %path.display(), rows = rows, "report has been written.");
        Ok(rows)
    }

    fn write_csv<'a, I>(&self, records: I, path: &Path) -> std::result::Result<usize, csv::Error>
    where
        I: IntoIterator<Item = &'a ObjectRecord>,
    {
        let mut writer = csv::Writer::from_path(path)?;

        let header = BASE_HEADER
            .iter()
            .copied()
            .chain(self.additional_fields.iter().map(String::as_str));
        writer.write_record(header)?;

        let mut rows = 0;
        for record in records {
            writer.write_record(self.row(record))?;
            rows += 1;
        }
        writer.flush()?;

        Ok(rows)
    }

    fn row(&self, record: &ObjectRecord) -> Vec<String> {
        let mut row = vec![
            record.key.clone(),
            record
                .last_modified
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            record.size.to_string(),
            format_size_human(record.size),
        ];
        row.extend(
            self.additional_fields
                .iter()
                .map(|field| record.metadata_value(field).unwrap_or_default().to_string()),
        );
        row
    }
}

/// Binary-unit human readable size, e.g. `"12.3 MiB"`.
///
/// Byte counts below 1 KiB are printed without a fraction (`"512 B"`).
pub fn format_size_human(size: u64) -> String {
    let adjusted = Byte::from_u64(size).get_appropriate_unit(UnitType::Binary);
    if adjusted.get_unit() == Unit::B {
        return format!("{size} B");
    }
    format!("{:.1} {}", adjusted.get_value(), adjusted.get_unit())
}
