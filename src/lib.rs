pub mod api;
pub mod app_state;
pub mod config;
pub mod job;
pub mod mp4;

use axum::Router;
use axum::extract::{DefaultBodyLimit, Extension};
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

//
// Re-export
//
pub use api::{convert_360, health, log_request_errors};
pub use app_state::AppState;
pub use config::Config;
pub use job::{ConvertJob, JobError, JobId, JobOutput};
pub use mp4::{InjectError, InjectionReport, inject_into, inject_spherical_metadata};

/// Room for multipart framing on top of the upload limit.
const MULTIPART_SLACK: u64 = 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes.saturating_add(MULTIPART_SLACK))
        .unwrap_or(usize::MAX);

    // CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/convert-360", post(convert_360))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(axum::middleware::from_fn(api::log_request_errors))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(Extension(state))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    let state = AppState::new(&config)?;
    let app = router(state);

    let addr = format!("0.0.0.0:{}", config.listen_on_port);
    let listener = TcpListener::bind(&addr).await?;
    info!("API listening on {addr}");

    axum::serve(listener, app).await?;
    Ok(())
}
