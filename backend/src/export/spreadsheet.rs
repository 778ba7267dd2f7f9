//! Excel writer: one worksheet, bold header row, native cell types.

use rust_xlsxwriter::{ColNum, Format, RowNum, Workbook};

use crate::error::{ExportError, ExportResult};
use crate::models::{is_date_only, Cell, Table};

const DATE_FORMAT: &str = "yyyy-mm-dd";
const DATETIME_FORMAT: &str = "yyyy-mm-dd hh:mm:ss";

pub fn write_excel(table: &Table) -> ExportResult<Vec<u8>> {
    let header_format = Format::new().set_bold();
    let date_format = Format::new().set_num_format(DATE_FORMAT);
    let datetime_format = Format::new().set_num_format(DATETIME_FORMAT);

    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    for (index, column) in table.columns().iter().enumerate() {
        let col = ColNum::try_from(index)
            .map_err(|_| ExportError::SheetLimits(format!("{} columns", table.column_count())))?;

        worksheet.write_string_with_format(0, col, column.name.as_str(), &header_format)?;

        for (offset, cell) in column.values.iter().enumerate() {
            let row = RowNum::try_from(offset + 1)
                .map_err(|_| ExportError::SheetLimits(format!("{} rows", table.row_count())))?;

            match cell {
                Cell::Missing => {}
                Cell::Number(n) => {
                    worksheet.write_number(row, col, *n)?;
                }
                Cell::Bool(b) => {
                    worksheet.write_boolean(row, col, *b)?;
                }
                Cell::Date(d) => {
                    let format = if is_date_only(d) { &date_format } else { &datetime_format };
                    worksheet.write_datetime_with_format(row, col, d, format)?;
                }
                Cell::Text(s) => {
                    worksheet.write_string(row, col, s.as_str())?;
                }
            }
        }
    }

    worksheet.autofit();

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ColumnKind;
    use crate::parser::parse_workbook;

    #[test]
    fn test_round_trip() {
        let original = Table::from_rows(
            vec!["name", "qty", "in_stock"],
            vec![
                vec![Cell::Text("bolt".into()), Cell::Number(12.0), Cell::Bool(true)],
                vec![Cell::Text("nut".into()), Cell::Missing, Cell::Bool(false)],
                vec![Cell::Missing, Cell::Number(0.5), Cell::Bool(true)],
            ],
        );

        let bytes = write_excel(&original).unwrap();
        let reparsed = parse_workbook(&bytes).unwrap();

        assert_eq!(reparsed, original);
        assert_eq!(reparsed.column("qty").unwrap().kind, ColumnKind::Numeric);
    }

    #[test]
    fn test_header_only() {
        let table = Table::from_rows(vec!["a", "b"], Vec::new());
        let bytes = write_excel(&table).unwrap();

        let reparsed = parse_workbook(&bytes).unwrap();
        assert_eq!(reparsed.column_names(), vec!["a", "b"]);
        assert_eq!(reparsed.row_count(), 0);
    }
}
