use std::path::PathBuf;
use thiserror::Error;

/// Structured error types for the person segmentation pipeline.
///
/// Each variant captures context specific to its error domain (filesystem,
/// image processing, model operations, etc.). Sources are boxed as
/// `Send + Sync` so the enum crosses the `anyhow` boundary in `main`.
#[derive(Error, Debug)]
pub enum PersonSegError {
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Filesystem error: {operation} failed for {path:?}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Image processing error: {operation} failed (file: {path})")]
    ImageProcessing {
        path: String,
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Model error: {operation} failed")]
    Model {
        operation: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("Validation error: {field} {reason}")]
    Validation { field: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PersonSegError>;

impl From<anyhow::Error> for PersonSegError {
    fn from(err: anyhow::Error) -> Self {
        PersonSegError::Configuration {
            message: err.to_string(),
        }
    }
}

/// Fallback for I/O errors that surface without path/operation context.
/// Code that has context constructs `PersonSegError::FileSystem` directly.
impl From<std::io::Error> for PersonSegError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("unknown"),
            operation: "unknown".to_string(),
            source: err,
        }
    }
}

impl From<image::ImageError> for PersonSegError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageProcessing {
            path: "unknown".to_string(),
            operation: "image processing".to_string(),
            source: Box::new(err),
        }
    }
}

impl From<ort::Error> for PersonSegError {
    fn from(err: ort::Error) -> Self {
        Self::Model {
            operation: "ort operation".to_string(),
            source: Box::new(err),
        }
    }
}

/// Shape errors occur during tensor operations which are part of model
/// inference, so they are categorized as model errors.
impl From<ndarray::ShapeError> for PersonSegError {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Model {
            operation: "tensor shape conversion".to_string(),
            source: Box::new(err),
        }
    }
}
