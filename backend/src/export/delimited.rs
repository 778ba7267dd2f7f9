//! CSV writer: comma delimited, header row, `\n` line endings.

use crate::error::{ExportError, ExportResult};
use crate::models::Table;

pub fn write_csv(table: &Table) -> ExportResult<Vec<u8>> {
    // The csv writer refuses to emit a record without fields.
    if table.column_count() == 0 {
        return Ok(vec![b'\n'; table.row_count() + 1]);
    }

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b',')
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    writer.write_record(table.column_names())?;
    for row in table.rows() {
        writer.write_record(row.iter().map(|cell| cell.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}
