use std::path::PathBuf;

/// Result type alias for lazyclean operations
pub type Result<T> = std::result::Result<T, Error>;

/// Boxed error returned by cleanup actions
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Core error type for lazyclean operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A cleanup action failed while being run explicitly
    #[error("cleanup action failed: {source}")]
    Action {
        #[source]
        source: BoxError,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Background runtime errors
    #[error("background runtime error: {message}")]
    Runtime { message: String },

    /// Use of a resource after it was released
    #[error("{resource} is already closed")]
    Closed { resource: String },
}

// Conversion implementations
impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

// Helper methods for creating errors with context
impl Error {
    /// Create an action error from whatever the action returned
    #[must_use]
    pub fn action(source: impl Into<BoxError>) -> Self {
        Error::Action {
            source: source.into(),
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a runtime error
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
        }
    }

    /// Create a closed-resource error
    #[must_use]
    pub fn closed(resource: impl Into<String>) -> Self {
        Error::Closed {
            resource: resource.into(),
        }
    }
}
