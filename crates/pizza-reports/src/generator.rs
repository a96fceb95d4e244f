//! Report generation entry point.

use std::path::{Path, PathBuf};

use metrics::counter;
use pizza_models::HistoryRecord;
use tracing::{debug, info};

use crate::error::ReportResult;
use crate::excel::render_xlsx;
use crate::pdf::render_pdf;
use crate::table::ReportTable;

/// Cached PDF report file name in the output directory.
pub const PDF_REPORT_FILE: &str = "pizza_report.pdf";
/// Cached Excel report file name in the output directory.
pub const XLSX_REPORT_FILE: &str = "pizza_report.xlsx";

const REPORTS_GENERATED_TOTAL: &str = "pizza_reports_generated_total";

/// Downloadable report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportFormat {
    Pdf,
    Excel,
}

impl ReportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "pdf",
            ReportFormat::Excel => "excel",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => PDF_REPORT_FILE,
            ReportFormat::Excel => XLSX_REPORT_FILE,
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ReportFormat::Pdf => "application/pdf",
            ReportFormat::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

/// Renders reports in memory and refreshes the cached copies on disk.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    output_dir: PathBuf,
}

impl ReportGenerator {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Path of the cached copy for `format`.
    pub fn cached_path(&self, format: ReportFormat) -> PathBuf {
        self.output_dir.join(format.file_name())
    }

    /// Render one format from the full history, newest first.
    pub fn render(&self, format: ReportFormat, records: &[HistoryRecord]) -> ReportResult<Vec<u8>> {
        let table = ReportTable::from_records(records);
        let bytes = match format {
            ReportFormat::Pdf => render_pdf(&table)?,
            ReportFormat::Excel => render_xlsx(&table)?,
        };

        counter!(REPORTS_GENERATED_TOTAL, "format" => format.as_str()).increment(1);
        debug!(format = format.as_str(), rows = table.len(), bytes = bytes.len(), "Report rendered");
        Ok(bytes)
    }

    /// Regenerate both cached reports, overwriting the previous versions.
    pub fn write_cached(&self, records: &[HistoryRecord]) -> ReportResult<()> {
        std::fs::create_dir_all(&self.output_dir)?;

        for format in [ReportFormat::Pdf, ReportFormat::Excel] {
            let bytes = self.render(format, records)?;
            std::fs::write(self.cached_path(format), bytes)?;
        }

        info!(rows = records.len(), dir = %self.output_dir.display(), "Cached reports refreshed");
        Ok(())
    }
}
