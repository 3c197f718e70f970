#![allow(dead_code)]

use spherical_inject::Config;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// Test harness that runs the server on its own runtime thread
pub struct TestServer {
    _handle: JoinHandle<()>,
    _workspace: TempDir,
    temp_dir: PathBuf,
    port: u16,
}

impl TestServer {
    pub async fn start() -> Self {
        Self::start_with(Config::default()).await
    }

    /// Start with `config`, overriding its port and workspace
    pub async fn start_with(config: Config) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("warn"))
            .with_test_writer()
            .try_init();

        // Find an available port
        let port = portpicker::pick_unused_port().expect("No available port");
        let workspace = tempfile::tempdir().expect("Failed to create workspace");

        let config = Config {
            listen_on_port: port,
            workspace: workspace.path().to_string_lossy().into_owned(),
            ..config
        };

        // Spawn the server in a separate thread with its own runtime
        let handle = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async move {
                spherical_inject::run(config).await.unwrap();
            });
        });

        let server = TestServer {
            _handle: handle,
            temp_dir: workspace.path().join("temp"),
            _workspace: workspace,
            port,
        };

        // Poll until server is ready
        let client = server.client();
        for _ in 0..200 {
            if let Ok(response) = client.get(server.url("/health")).send().await
                && response.status().is_success()
            {
                break;
            }

            sleep(Duration::from_millis(10)).await;
        }

        server
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://127.0.0.1:{}{}", self.port, path)
    }

    pub fn client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap()
    }

    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Number of files left in the job temp directory
    pub fn temp_entries(&self) -> usize {
        std::fs::read_dir(&self.temp_dir)
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    /// Wait until every job temp file is gone
    pub async fn wait_for_clean_temp(&self) -> bool {
        for _ in 0..200 {
            if self.temp_entries() == 0 {
                return true;
            }
            sleep(Duration::from_millis(10)).await;
        }
        false
    }

    /// Post `video_data` as the multipart field `field` with `file_name`
    pub async fn upload(
        &self,
        client: &reqwest::Client,
        field: &str,
        file_name: &str,
        video_data: Vec<u8>,
    ) -> reqwest::Response {
        let part = reqwest::multipart::Part::bytes(video_data)
            .file_name(file_name.to_string())
            .mime_str("video/mp4")
            .unwrap();
        let form = reqwest::multipart::Form::new().part(field.to_string(), part);

        client
            .post(self.url("/convert-360"))
            .multipart(form)
            .send()
            .await
            .unwrap()
    }
}

/// A box of `total` bytes with a compact header and zeroed payload
pub fn mp4_box(kind: &[u8; 4], total: u32) -> Vec<u8> {
    let mut data = Vec::with_capacity(total as usize);
    data.extend_from_slice(&total.to_be_bytes());
    data.extend_from_slice(kind);
    data.resize(total as usize, 0);
    data
}

/// ftyp(24) + moov(100) + mdat(1000)
pub fn ftyp_moov_mdat() -> Vec<u8> {
    let mut data = mp4_box(b"ftyp", 24);
    data.extend(mp4_box(b"moov", 100));
    data.extend(mp4_box(b"mdat", 1000));
    data
}
