//! History reports.
//!
//! Both formats are pure renderings of the full history log:
//! - PDF, a paginated four-column table on A4
//! - Excel, a single `History` worksheet

pub mod error;
pub mod excel;
pub mod generator;
pub mod pdf;
pub mod table;

pub use error::{ReportError, ReportResult};
pub use excel::render_xlsx;
pub use generator::{ReportFormat, ReportGenerator, PDF_REPORT_FILE, XLSX_REPORT_FILE};
pub use pdf::{layout_pages, render_pdf, PageLayout, TextItem};
pub use table::{ReportRow, ReportTable, REPORT_HEADERS};
