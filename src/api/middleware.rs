use crate::job::JobId;
use axum::{body::Body, http::Request, middleware::Next, response::Response};
use std::time::Instant;
use tracing::{error, info, warn};

/// Logs failed requests, and every request that ran a conversion job.
///
/// Handlers tag job responses with a [`JobId`] extension so the outcome can
/// be matched with the job's own log lines.
pub async fn log_request_errors(req: Request<Body>, next: Next) -> Response {
    let uri = req.uri().clone();
    let method = req.method().clone();
    let started = Instant::now();

    let response = next.run(req).await;
    let status = response.status();
    let job_id = response
        .extensions()
        .get::<JobId>()
        .map(|JobId(id)| id.as_str());
    let elapsed_ms = started.elapsed().as_millis() as u64;

    if status.is_client_error() {
        warn!(%method, %uri, %status, job_id, elapsed_ms, "Client error");
    } else if status.is_server_error() {
        error!(%method, %uri, %status, job_id, elapsed_ms, "Server error");
    } else if job_id.is_some() {
        // Headers only; the body is still streaming.
        info!(%method, %uri, %status, job_id, elapsed_ms, "Conversion response ready");
    }

    response
}
