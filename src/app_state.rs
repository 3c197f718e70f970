use crate::config::Config;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::info;

const TEMP_DIR: &str = "temp";

fn init_workspace(workspace: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(workspace.join(TEMP_DIR))
}

#[derive(Clone)]
pub struct AppState {
    /// Admission limit for conversion jobs.
    pub semaphore: Arc<Semaphore>,
    pub permits: usize,

    pub temp_dir: PathBuf,
    pub job_timeout: Duration,
    pub max_upload_bytes: u64,
}

impl AppState {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let workspace = PathBuf::from(&config.workspace);
        init_workspace(&workspace)?;

        info!(
            permits = config.permits,
            workspace = %workspace.display(),
            job_timeout_secs = config.job_timeout_secs,
            max_upload_mb = config.max_upload_mb,
            "Initialize app state"
        );

        Ok(Self {
            semaphore: Arc::new(Semaphore::new(config.permits)),
            permits: config.permits,

            temp_dir: workspace.join(TEMP_DIR),
            job_timeout: config.job_timeout(),
            max_upload_bytes: config.max_upload_bytes(),
        })
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.as_path()
    }

    /// Jobs currently holding a permit.
    pub fn running_jobs(&self) -> usize {
        self.permits - self.semaphore.available_permits()
    }
}
