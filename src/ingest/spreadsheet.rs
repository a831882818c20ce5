use super::{DocumentExtractor, ExtractionError};
use calamine::{open_workbook_auto_from_rs, Data, Range, Reader};
use std::io::Cursor;

/// First worksheet of a workbook (xlsx, xls, ods) serialized as CSV.
///
/// Further sheets are not read.
pub struct SpreadsheetExtractor;

impl DocumentExtractor for SpreadsheetExtractor {
    fn label(&self) -> &'static str {
        "EXCEL"
    }

    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

        let sheet_names = workbook.sheet_names();
        let first = sheet_names
            .first()
            .cloned()
            .ok_or_else(|| ExtractionError::Spreadsheet("workbook has no sheets".to_string()))?;

        if sheet_names.len() > 1 {
            tracing::debug!(
                "Reading sheet '{}' only, skipping {} other sheet(s)",
                first,
                sheet_names.len() - 1
            );
        }

        let range = workbook
            .worksheet_range(&first)
            .map_err(|e| ExtractionError::Spreadsheet(e.to_string()))?;

        Ok(range_to_csv(&range))
    }
}

fn range_to_csv(range: &Range<Data>) -> String {
    range
        .rows()
        .map(|row| {
            row.iter()
                .map(|cell| csv_field(&cell.to_string()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn csv_field(value: &str) -> String {
    if value.contains(&[',', '"', '\n', '\r'][..]) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}
