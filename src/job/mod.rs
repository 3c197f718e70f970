pub mod error;
pub mod temp;

use crate::app_state::AppState;
use crate::mp4::{self, COPY_CHUNK_SIZE, InjectError, InjectionReport};
use axum::body::Body;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt as _;
use tokio::sync::OwnedSemaphorePermit;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

// Re-exports for convenience
pub use error::{EMPTY_UPLOAD, ErrorResponse, JobError, NO_FILE_SELECTED, NO_VIDEO_PROVIDED};
pub use temp::TempFiles;

pub const CONVERT_KIND: &str = "convert-360";

const BYTES_PER_MB: f64 = 1024.0 * 1024.0;

pub(crate) fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

fn new_job_id() -> String {
    let mut id = Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

/// Id of the job that produced a response, attached as a response extension.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobId(pub String);

/// One conversion request.
///
/// Holds an admission permit and the job's temp files for as long as it
/// lives; dropping it releases both.
pub struct ConvertJob {
    id: String,
    files: TempFiles,
    timeout: Duration,
    max_upload_bytes: u64,
    _permit: OwnedSemaphorePermit,
}

impl ConvertJob {
    /// Waits for a free slot, then allocates a fresh job id.
    pub async fn admit(state: &AppState) -> Result<Self, JobError> {
        let id = new_job_id();
        let kind = CONVERT_KIND;
        debug!(job_id = %id, kind, "job wait for permit");

        let permit = state
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| JobError::Unavailable)?;

        info!(job_id = %id, kind, "job started");
        Ok(Self {
            files: TempFiles::new(state.temp_dir(), &id),
            id,
            timeout: state.job_timeout,
            max_upload_bytes: state.max_upload_bytes,
            _permit: permit,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn job_id(&self) -> JobId {
        JobId(self.id.clone())
    }

    /// Suggested filename for the converted video.
    pub fn download_name(&self) -> String {
        format!("video_360_{}.mp4", self.id)
    }

    /// Streams an upload into the job's input file. Returns the byte count.
    ///
    /// The upload shares the job's time limit, so a stalled client cannot
    /// keep its permit.
    pub async fn store_upload<S, E>(&self, stream: S) -> Result<u64, JobError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        JobError: From<E>,
    {
        match tokio::time::timeout(self.timeout, self.write_upload(stream)).await {
            Ok(stored) => stored,
            Err(_) => {
                warn!(job_id = %self.id, timeout = ?self.timeout, "Upload timed out");
                Err(JobError::Timeout(self.timeout))
            }
        }
    }

    async fn write_upload<S, E>(&self, stream: S) -> Result<u64, JobError>
    where
        S: Stream<Item = Result<Bytes, E>>,
        JobError: From<E>,
    {
        let mut file = tokio::fs::File::create(self.files.input()).await?;
        let mut stream = std::pin::pin!(stream);
        let mut received = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            received += chunk.len() as u64;
            if received > self.max_upload_bytes {
                warn!(job_id = %self.id, limit = self.max_upload_bytes, "Upload exceeds limit");
                return Err(JobError::PayloadTooLarge);
            }
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        debug!(job_id = %self.id, received, "Upload stored");
        Ok(received)
    }

    /// Injects the spherical metadata box into the stored upload.
    pub async fn run(self) -> Result<JobOutput, JobError> {
        self.run_with(mp4::inject_spherical_metadata).await
    }

    /// Runs `inject` on the blocking pool under the job's time limit.
    ///
    /// On timeout the token is cancelled and the blocking task is awaited
    /// before returning, so the temp files are no longer in use when the
    /// job drops.
    pub async fn run_with<F>(self, inject: F) -> Result<JobOutput, JobError>
    where
        F: FnOnce(&Path, &Path, &CancellationToken) -> Result<InjectionReport, InjectError>
            + Send
            + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let input = self.files.input().to_path_buf();
        let output = self.files.output().to_path_buf();

        let mut task = tokio::task::spawn_blocking(move || inject(&input, &output, &token));
        let report = match tokio::time::timeout(self.timeout, &mut task).await {
            Ok(joined) => joined.map_err(|error| JobError::Io(std::io::Error::other(error)))??,
            Err(_) => {
                cancel.cancel();
                let _ = task.await;
                warn!(job_id = %self.id, timeout = ?self.timeout, "Job timed out");
                return Err(JobError::Timeout(self.timeout));
            }
        };

        info!(
            job_id = %self.id,
            insertion_offset = report.insertion_offset,
            inserted_len = report.inserted_len,
            extended_size = report.extended_size,
            box_count = report.box_count,
            "Metadata injected"
        );

        let file = tokio::fs::File::open(self.files.output()).await?;
        let len = file.metadata().await?.len();
        Ok(JobOutput {
            job: self,
            file,
            len,
            report,
        })
    }
}

impl Drop for ConvertJob {
    fn drop(&mut self) {
        debug!(job_id = %self.id, "job released");
    }
}

/// A finished job whose output file is ready to be sent.
pub struct JobOutput {
    job: ConvertJob,
    file: tokio::fs::File,
    len: u64,
    pub report: InjectionReport,
}

impl JobOutput {
    pub fn job_id(&self) -> &str {
        self.job.id()
    }

    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn download_name(&self) -> String {
        self.job.download_name()
    }

    /// Response body streaming the output file. The job travels with the
    /// stream, so the temp files and the permit are released once the body
    /// is fully sent or the client goes away.
    pub fn into_body(self) -> Body {
        let JobOutput { job, file, .. } = self;
        let stream = ReaderStream::with_capacity(file, COPY_CHUNK_SIZE).map(move |chunk| {
            let _job = &job;
            chunk
        });
        Body::from_stream(stream)
    }
}
