use std::fmt;

use thiserror::Error;

/// Error type for client operations.
///
/// The first group of variants belongs to this layer's own contract.
/// Everything an adapter reports travels through unchanged.
#[derive(Error, Debug)]
pub enum KvError {
    /// A required argument was missing or malformed.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// No configuration could be resolved for the requested group.
    #[error("missing configuration: {0}")]
    MissingConfiguration(String),

    /// No adapter implementation was registered or supplied.
    #[error("adapter is not set, missing configuration or adapter registration?")]
    MissingAdapter,

    /// A configuration object could not be built from its source.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// A generic value could not be converted to the requested shape.
    #[error("cannot convert {from} value to {to}")]
    Conversion {
        /// Tag of the source value.
        from: &'static str,
        /// Name of the requested target type.
        to: &'static str,
    },

    /// Serialization/deserialization error.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Error reply produced by the store itself.
    #[error("{0}")]
    Store(String),

    /// The adapter does not implement the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// The execution context was canceled.
    #[error("context canceled")]
    Canceled,

    /// The execution context deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,

    /// Opaque adapter failure (network, protocol, ...).
    #[error(transparent)]
    Adapter(Box<dyn std::error::Error + Send + Sync>),
}

/// Coarse classification of a [`KvError`], for callers that branch on cause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`KvError::InvalidParameter`].
    InvalidParameter,
    /// See [`KvError::MissingConfiguration`] and [`KvError::InvalidConfiguration`].
    MissingConfiguration,
    /// See [`KvError::MissingAdapter`].
    MissingAdapter,
    /// Local conversion or serialization failure.
    Conversion,
    /// Anything reported by the adapter.
    Adapter,
}

impl KvError {
    /// Wraps an arbitrary adapter-side error.
    pub fn adapter<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        KvError::Adapter(Box::new(err))
    }

    /// Returns the kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KvError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            KvError::MissingConfiguration(_) | KvError::InvalidConfiguration(_) => {
                ErrorKind::MissingConfiguration
            }
            KvError::MissingAdapter => ErrorKind::MissingAdapter,
            KvError::Conversion { .. } | KvError::Serde(_) => ErrorKind::Conversion,
            KvError::Store(_)
            | KvError::Unsupported(_)
            | KvError::Canceled
            | KvError::DeadlineExceeded
            | KvError::Adapter(_) => ErrorKind::Adapter,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidParameter => "invalid parameter",
            ErrorKind::MissingConfiguration => "missing configuration",
            ErrorKind::MissingAdapter => "missing adapter",
            ErrorKind::Conversion => "conversion",
            ErrorKind::Adapter => "adapter",
        };
        f.write_str(name)
    }
}

/// Result type alias for client operations.
pub type Result<T> = std::result::Result<T, KvError>;
