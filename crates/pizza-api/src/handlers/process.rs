//! Upload processing.

use axum::extract::{Multipart, State};
use axum::Json;
use pizza_models::{HistoryRecord, ProcessResponse};
use tracing::{info, warn};

use crate::error::{ApiError, ApiResult};
use crate::metrics;
use crate::state::AppState;

/// Multipart field carrying the upload.
pub const UPLOAD_FIELD: &str = "image";

/// Accept one image or video, count pizzas and log the result.
///
/// Uploads are handled one at a time. Each accepted upload appends exactly
/// one history record and refreshes the cached reports before responding.
pub async fn process_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> ApiResult<Json<ProcessResponse>> {
    let (filename, bytes) = read_upload(&mut multipart).await?;
    info!(filename = %filename, size = bytes.len(), "Upload received");

    let _guard = state.processing.lock().await;

    let outcome = match state.pipeline.process(&filename, bytes).await {
        Ok(outcome) => outcome,
        Err(e) => {
            let err = ApiError::from(e);
            if matches!(err, ApiError::UnsupportedType) {
                warn!(filename = %filename, "Unsupported file type");
                metrics::record_upload_rejected("unsupported_type");
            }
            return Err(err);
        }
    };

    let record = HistoryRecord::now(
        outcome.count,
        outcome.media_type,
        outcome.result_path.to_string_lossy(),
    );

    let history = state.history.clone();
    let reports = state.reports.clone();
    tokio::task::spawn_blocking(move || -> ApiResult<()> {
        history.append(&record)?;
        let records = history.list_all()?;
        reports.write_cached(&records)?;
        Ok(())
    })
    .await
    .map_err(|e| ApiError::internal(format!("History task failed: {}", e)))??;

    metrics::record_upload(outcome.media_type, outcome.count);

    Ok(Json(ProcessResponse {
        count: outcome.count,
        media_type: outcome.media_type,
    }))
}

/// Pull the upload field's file name and contents, skipping other fields.
async fn read_upload(multipart: &mut Multipart) -> ApiResult<(String, Vec<u8>)> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        return Ok((filename, bytes.to_vec()));
    }

    metrics::record_upload_rejected("missing_field");
    Err(ApiError::bad_request(format!(
        "Missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}
