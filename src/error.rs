use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    /// The processed leads file has not been generated yet.
    #[error("lead data unavailable: {} does not exist", .path.display())]
    DataUnavailable { path: PathBuf },
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
    #[error("row {row}: {message}")]
    InvalidRow { row: u64, message: String },
}
