//! Excel rendering.

use rust_xlsxwriter::{Format, Workbook};

use crate::error::ReportResult;
use crate::table::ReportTable;

/// Worksheet holding the history table.
pub const SHEET_NAME: &str = "History";

/// Render the table as an `.xlsx` workbook with a single worksheet.
pub fn render_xlsx(table: &ReportTable) -> ReportResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SHEET_NAME)?;

    for (col, header) in table.headers().iter().enumerate() {
        worksheet.write_string_with_format(0, col as u16, *header, &header_format)?;
    }

    for (index, row) in table.rows.iter().enumerate() {
        let r = index as u32 + 1;
        worksheet.write_string(r, 0, row.timestamp.as_str())?;
        worksheet.write_number(r, 1, row.count)?;
        worksheet.write_string(r, 2, row.media_type.as_str())?;
        worksheet.write_string(r, 3, row.file.as_str())?;
    }

    worksheet.set_column_width(0, 28)?;
    worksheet.set_column_width(3, 40)?;

    Ok(workbook.save_to_buffer()?)
}
