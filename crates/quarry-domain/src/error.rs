//! Error handling types
//!
//! One error enum for the whole core. Adapters translate foreign errors
//! into this taxonomy at their boundary; raw driver errors never cross a
//! port. Variants are comparable through [`ErrorKind`].

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the Quarry core
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced resource does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// The resource that was not found
        resource: String,
    },

    /// A resource with the same identity already exists
    #[error("already exists: {resource}")]
    AlreadyExists {
        /// The conflicting resource
        resource: String,
    },

    /// Caller-supplied input failed validation
    #[error("invalid input: {message}")]
    InvalidInput {
        /// Description of the rejected input
        message: String,
    },

    /// Credentials are missing or were rejected by a provider
    #[error("unauthorized: {message}")]
    Unauthorized {
        /// Description of the authorization failure
        message: String,
    },

    /// The caller's role does not permit the operation
    #[error("forbidden: {message}")]
    Forbidden {
        /// Description of the RBAC decision
        message: String,
    },

    /// Another sync already holds the per-source lock
    #[error("sync already in progress for source {source_id}")]
    SyncInProgress {
        /// Source whose lock is held
        source_id: String,
    },

    /// No connector builder is registered for the provider
    #[error("no connector registered for provider: {provider}")]
    ConnectorNotFound {
        /// The unregistered provider type
        provider: String,
    },

    /// An access token has passed its expiry
    #[error("token expired")]
    TokenExpired,

    /// A token failed signature or claims validation
    #[error("token invalid: {message}")]
    TokenInvalid {
        /// Description of the validation failure
        message: String,
    },

    /// The session id does not resolve to a live session
    #[error("session not found")]
    SessionNotFound,

    /// Email/password pair did not match a user
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The provider name is not one the platform supports
    #[error("invalid provider: {provider}")]
    InvalidProvider {
        /// The rejected provider name
        provider: String,
    },

    /// An external collaborator is down or unreachable
    #[error("service unavailable: {service}")]
    ServiceUnavailable {
        /// The unavailable collaborator
        service: String,
    },

    /// Transient failure; safe to retry with backoff
    #[error("retryable: {message}")]
    Retryable {
        /// Description of the transient failure
        message: String,
        /// Optional source error
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// The operation was cancelled at a boundary
    #[error("cancelled")]
    Cancelled,

    /// Invariant violation or unexpected internal state
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error
        message: String,
    },
}

/// Comparable discriminant for [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidInput,
    Unauthorized,
    Forbidden,
    SyncInProgress,
    ConnectorNotFound,
    TokenExpired,
    TokenInvalid,
    SessionNotFound,
    InvalidCredentials,
    InvalidProvider,
    ServiceUnavailable,
    Retryable,
    Cancelled,
    Internal,
}

impl Error {
    /// Discriminant of this error, for comparison and classification
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidInput { .. } => ErrorKind::InvalidInput,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Forbidden { .. } => ErrorKind::Forbidden,
            Self::SyncInProgress { .. } => ErrorKind::SyncInProgress,
            Self::ConnectorNotFound { .. } => ErrorKind::ConnectorNotFound,
            Self::TokenExpired => ErrorKind::TokenExpired,
            Self::TokenInvalid { .. } => ErrorKind::TokenInvalid,
            Self::SessionNotFound => ErrorKind::SessionNotFound,
            Self::InvalidCredentials => ErrorKind::InvalidCredentials,
            Self::InvalidProvider { .. } => ErrorKind::InvalidProvider,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::Retryable { .. } => ErrorKind::Retryable,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Whether the task queue may re-drive the failed operation
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::Retryable | ErrorKind::ServiceUnavailable
        )
    }
}

// Constructor helpers
impl Error {
    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an already exists error
    pub fn already_exists<S: Into<String>>(resource: S) -> Self {
        Self::AlreadyExists {
            resource: resource.into(),
        }
    }

    /// Create an invalid input error
    pub fn invalid_input<S: Into<String>>(message: S) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized<S: Into<String>>(message: S) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a forbidden error
    pub fn forbidden<S: Into<String>>(message: S) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Create a sync-in-progress error
    pub fn sync_in_progress<S: Into<String>>(source_id: S) -> Self {
        Self::SyncInProgress {
            source_id: source_id.into(),
        }
    }

    /// Create a connector-not-found error
    pub fn connector_not_found<S: Into<String>>(provider: S) -> Self {
        Self::ConnectorNotFound {
            provider: provider.into(),
        }
    }

    /// Create a token invalid error
    pub fn token_invalid<S: Into<String>>(message: S) -> Self {
        Self::TokenInvalid {
            message: message.into(),
        }
    }

    /// Create an invalid provider error
    pub fn invalid_provider<S: Into<String>>(provider: S) -> Self {
        Self::InvalidProvider {
            provider: provider.into(),
        }
    }

    /// Create a service unavailable error
    pub fn service_unavailable<S: Into<String>>(service: S) -> Self {
        Self::ServiceUnavailable {
            service: service.into(),
        }
    }

    /// Create a retryable error
    pub fn retryable<S: Into<String>>(message: S) -> Self {
        Self::Retryable {
            message: message.into(),
            source: None,
        }
    }

    /// Create a retryable error with source
    pub fn retryable_with_source<S: Into<String>, E: std::error::Error + Send + Sync + 'static>(
        message: S,
        source: E,
    ) -> Self {
        Self::Retryable {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::invalid_input(format!("JSON error: {}", e))
    }
}
