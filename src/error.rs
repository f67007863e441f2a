use iam_blockchain::FetchError;
use iam_repository::RepositoryError;
use thiserror::Error;

/// Why a sync cycle did not commit.
///
/// In both cases the stored watermark is unchanged, so the next cycle
/// resumes from the same block.
#[derive(Error, Debug)]
pub enum SyncError {
    /// The remote range could not be fetched completely.
    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The cache store rejected the batch or could not be read.
    #[error("Cache store error: {0}")]
    Repository(#[from] RepositoryError),
}

impl SyncError {
    pub fn as_label(&self) -> &'static str {
        match self {
            Self::Fetch(FetchError::Cancelled { .. }) => "cancelled",
            Self::Fetch(_) => "fetch_error",
            Self::Repository(_) => "store_error",
        }
    }
}
