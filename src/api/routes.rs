use crate::AppState;
use crate::job::{
    ConvertJob, EMPTY_UPLOAD, JobError, NO_FILE_SELECTED, NO_VIDEO_PROVIDED, megabytes,
};
use axum::extract::multipart::{Field, MultipartRejection};
use axum::extract::{Extension, Multipart};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Multipart field carrying the uploaded video.
pub const VIDEO_FIELD: &str = "video";

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

pub async fn health() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok".to_string(),
        }),
    )
}

#[axum::debug_handler]
pub async fn convert_360(
    Extension(state): Extension<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Response {
    match convert(&state, multipart).await {
        Ok(response) => response,
        Err(error) => failure(error),
    }
}

fn failure(error: JobError) -> Response {
    match &error {
        // Problems with the uploaded file itself, not with the service.
        JobError::Inject(inject) if inject.is_structural() => {
            info!(%error, status = %error.to_err_code(), "Input rejected");
        }
        _ => warn!(%error, status = %error.to_err_code(), "Conversion failed"),
    }
    error.into_response()
}

async fn convert(
    state: &AppState,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, JobError> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(%rejection, "Request is not multipart");
        JobError::InputMissing(NO_VIDEO_PROVIDED)
    })?;

    // The permit is held before any of the body is read.
    let job = ConvertJob::admit(state).await?;

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(VIDEO_FIELD) {
            continue;
        }
        let job_id = job.job_id();
        let mut response = convert_field(job, field).await.unwrap_or_else(failure);
        response.extensions_mut().insert(job_id);
        return Ok(response);
    }

    Err(JobError::InputMissing(NO_VIDEO_PROVIDED))
}

async fn convert_field(job: ConvertJob, field: Field<'_>) -> Result<Response, JobError> {
    if field.file_name().is_none_or(str::is_empty) {
        return Err(JobError::InputMissing(NO_FILE_SELECTED));
    }

    let received = job.store_upload(field).await?;
    if received == 0 {
        return Err(JobError::InputMissing(EMPTY_UPLOAD));
    }
    info!(
        job_id = %job.id(),
        size_mb = format!("{:.2}", megabytes(received)),
        "Received video"
    );

    let output = job.run().await?;
    info!(
        job_id = %output.job_id(),
        size_mb = format!("{:.2}", megabytes(output.len())),
        "Spherical metadata injected"
    );

    let headers = [
        (header::CONTENT_TYPE, "video/mp4".to_string()),
        (header::CONTENT_LENGTH, output.len().to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", output.download_name()),
        ),
    ];
    Ok((StatusCode::OK, headers, output.into_body()).into_response())
}
