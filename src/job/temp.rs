use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Input and output scratch files of one job.
///
/// Both files are removed when the guard is dropped, whichever way the job
/// ends. Files that were never created are skipped silently.
#[derive(Debug)]
pub struct TempFiles {
    job_id: String,
    input: PathBuf,
    output: PathBuf,
}

impl TempFiles {
    pub fn new(temp_dir: &Path, job_id: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            input: temp_dir.join(format!("input_{job_id}.mp4")),
            output: temp_dir.join(format!("output_360_{job_id}.mp4")),
        }
    }

    pub fn input(&self) -> &Path {
        &self.input
    }

    pub fn output(&self) -> &Path {
        &self.output
    }
}

impl Drop for TempFiles {
    fn drop(&mut self) {
        for path in [&self.input, &self.output] {
            match std::fs::remove_file(path) {
                Ok(()) => debug!(job_id = %self.job_id, path = %path.display(), "Removed temp file"),
                Err(error) if error.kind() == IoErrorKind::NotFound => {}
                Err(error) => {
                    warn!(job_id = %self.job_id, path = %path.display(), %error, "Failed to remove temp file")
                }
            }
        }
    }
}
