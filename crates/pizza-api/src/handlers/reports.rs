//! Report downloads.

use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use pizza_reports::ReportFormat;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Download the full history as PDF.
pub async fn download_pdf(State(state): State<AppState>) -> ApiResult<Response> {
    download(state, ReportFormat::Pdf).await
}

/// Download the full history as an Excel workbook.
pub async fn download_excel(State(state): State<AppState>) -> ApiResult<Response> {
    download(state, ReportFormat::Excel).await
}

/// Render a fresh report in memory from the current history.
async fn download(state: AppState, format: ReportFormat) -> ApiResult<Response> {
    let history = state.history.clone();
    let reports = state.reports.clone();

    let bytes = tokio::task::spawn_blocking(move || -> ApiResult<Vec<u8>> {
        let records = history.list_all()?;
        Ok(reports.render(format, &records)?)
    })
    .await
    .map_err(|e| ApiError::internal(format!("Report task failed: {}", e)))??;

    let headers = [
        (header::CONTENT_TYPE, format.content_type().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", format.file_name()),
        ),
    ];

    Ok((headers, bytes).into_response())
}
