use thiserror::Error;

/// Failures of the scan / plan / splice pipeline.
#[derive(Debug, Error)]
pub enum InjectError {
    /// Header fields violate the ISOBMFF box structure.
    #[error("Malformed box at offset {offset}: {reason}")]
    MalformedBox { offset: u64, reason: String },

    /// A box declares more bytes than the stream has left.
    #[error("Box at offset {offset} declares {declared} bytes but only {available} remain")]
    TruncatedStream {
        offset: u64,
        declared: u64,
        available: u64,
    },

    #[error("Spherical metadata box already present at offset {offset}")]
    AlreadySpherical { offset: u64 },

    #[error("Injection cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl InjectError {
    pub(crate) fn malformed(offset: u64, reason: impl Into<String>) -> Self {
        InjectError::MalformedBox {
            offset,
            reason: reason.into(),
        }
    }

    /// Structural errors describe the input itself and never go away on retry.
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            InjectError::MalformedBox { .. }
                | InjectError::TruncatedStream { .. }
                | InjectError::AlreadySpherical { .. }
        )
    }
}
