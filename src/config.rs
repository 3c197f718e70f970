use clap::Parser;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration structure that can be loaded from CLI, config file, or environment
///
/// Example configuration file content
/// # Spherical metadata injector configuration
///
/// listen_on_port = 5000
/// permits = 4
/// workspace = "/var/tmp/spherical-inject"
/// job_timeout_secs = 300
/// max_upload_mb = 4096
#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[serde(default)]
#[command(version, about, long_about = None)]
pub struct Config {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = default_port())]
    #[serde(default = "default_port")]
    pub listen_on_port: u16,

    /// Number of conversion jobs allowed to run at the same time
    #[arg(short, long, default_value_t = default_permits())]
    #[serde(default = "default_permits")]
    pub permits: usize,

    /// Working directory for per-job temporary files
    #[arg(short = 'w', long, default_value_t = default_workspace())]
    #[serde(default = "default_workspace")]
    pub workspace: String,

    /// Seconds a single conversion may take before it is cancelled
    #[arg(long, default_value_t = default_job_timeout_secs())]
    #[serde(default = "default_job_timeout_secs")]
    pub job_timeout_secs: u64,

    /// Largest accepted upload, in MiB
    #[arg(long, default_value_t = default_max_upload_mb())]
    #[serde(default = "default_max_upload_mb")]
    pub max_upload_mb: u64,

    /// Configuration file path
    #[arg(short, long)]
    #[serde(skip)]
    pub config: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_on_port: default_port(),
            permits: default_permits(),
            workspace: default_workspace(),
            job_timeout_secs: default_job_timeout_secs(),
            max_upload_mb: default_max_upload_mb(),
            config: None,
        }
    }
}

impl Config {
    /// Load configuration from CLI args, optionally merging with a config file
    pub fn load() -> anyhow::Result<Self> {
        let mut config = Config::parse();

        if let Some(config_path) = &config.config {
            let file_config = Self::from_file(Path::new(config_path))?;
            config = config.merge_with_file(file_config);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Merge with file config, CLI args take precedence
    fn merge_with_file(mut self, file_config: Config) -> Self {
        // If CLI value is default, use file value
        if self.listen_on_port == default_port() {
            self.listen_on_port = file_config.listen_on_port;
        }
        if self.permits == default_permits() {
            self.permits = file_config.permits;
        }
        if self.workspace == default_workspace() {
            self.workspace = file_config.workspace;
        }
        if self.job_timeout_secs == default_job_timeout_secs() {
            self.job_timeout_secs = file_config.job_timeout_secs;
        }
        if self.max_upload_mb == default_max_upload_mb() {
            self.max_upload_mb = file_config.max_upload_mb;
        }

        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.permits == 0 {
            return Err(anyhow::anyhow!("permits must be at least 1"));
        }
        if self.job_timeout_secs == 0 {
            return Err(anyhow::anyhow!("job_timeout_secs must be at least 1"));
        }
        if self.max_upload_mb == 0 {
            return Err(anyhow::anyhow!("max_upload_mb must be at least 1"));
        }
        if self.workspace.is_empty() {
            return Err(anyhow::anyhow!("workspace cannot be empty"));
        }
        Ok(())
    }

    pub fn job_timeout(&self) -> Duration {
        Duration::from_secs(self.job_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

// Default value functions
fn default_port() -> u16 {
    5000
}

fn default_permits() -> usize {
    num_cpus::get().clamp(1, 16)
}

fn default_workspace() -> String {
    std::env::temp_dir()
        .join("spherical-inject")
        .to_string_lossy()
        .into_owned()
}

fn default_job_timeout_secs() -> u64 {
    300
}

fn default_max_upload_mb() -> u64 {
    4096
}
