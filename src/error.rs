use std::path::PathBuf;
use thiserror::Error;

/// The main error type for rddprep operations.
#[derive(Debug, Error)]
pub enum PrepError {
    #[error("Invalid configuration: {message}")]
    InvalidConfiguration { message: String },

    #[error("Failed to parse annotation {path}: {message}")]
    Format { path: PathBuf, message: String },

    #[error("Image {image} has no paired label (expected {expected_label})")]
    MissingPair {
        image: PathBuf,
        expected_label: PathBuf,
    },

    #[error("Image {image} would be written to {destination}, which another image already claims")]
    NameCollision {
        image: PathBuf,
        destination: PathBuf,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {path}: {source}")]
    IoAt {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to build worker pool: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Failed to read image dimensions from {path}: {source}")]
    ImageDimensionRead {
        path: PathBuf,
        #[source]
        source: imagesize::ImageError,
    },

    #[error("Failed to resize image {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Failed to write {path}: {source}")]
    YamlWrite {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Failed to serialize stats report: {0}")]
    StatsJson(#[from] serde_json::Error),

    #[error("Pipeline finished with {failed} failed item(s) ({processed} processed)")]
    PipelineFailed { processed: usize, failed: usize },
}

impl PrepError {
    /// Shorthand for a [`PrepError::IoAt`] bound to `path`.
    pub(crate) fn io_at(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| PrepError::IoAt { path, source }
    }
}
