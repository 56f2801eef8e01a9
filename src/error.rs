use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in vseq operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// I/O error with context.
    #[error("I/O error at {path}: {context} ({source})")]
    Io {
        #[source]
        source: std::io::Error,
        path: PathBuf,
        context: String,
    },

    /// Vector dimension mismatch.
    #[error("dimension mismatch: expected {expected}, got {got}")]
    WrongDimension { expected: usize, got: usize },

    /// Unknown similarity metric name.
    #[error("unknown similarity metric: '{0}'")]
    UnknownMetric(String),

    /// Unknown index variant name.
    #[error("unknown index variant: '{0}'")]
    UnknownVariant(String),

    /// The requested metric cannot be served by the chosen index variant.
    #[error("metric '{metric}' is not supported by the {variant} index")]
    UnsupportedMetric { metric: String, variant: String },

    /// Invalid argument provided.
    #[error("invalid argument for field '{field}': {reason}")]
    InvalidArgument { field: String, reason: String },
}

impl Error {
    /// Create an I/O error with context.
    pub fn io_err(path: impl Into<PathBuf>, context: impl Into<String>) -> impl FnOnce(std::io::Error) -> Self {
        move |e: std::io::Error| Error::Io {
            source: e,
            path: path.into(),
            context: context.into(),
        }
    }

    /// Create an invalid argument error.
    pub fn invalid_arg(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for vseq operations.
pub type Result<T> = std::result::Result<T, Error>;
