//! Error types for tabula-db
//!
//! The resolver never invents failures of its own; it classifies what its
//! collaborators report:
//! - Configuration errors (missing or malformed options, fatal)
//! - Connection errors (balancer, factory or driver could not produce a handle)
//! - Introspection errors (a host connection cannot report a property)

use std::fmt;
use thiserror::Error;

/// Result type for tabula-db operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Configuration error (not retriable)
    Configuration,
    /// Connection could not be established (retriable)
    Connection,
    /// Host connection could not be introspected
    Introspection,
    /// Statement execution errors
    Query,
    /// No driver available for the requested engine
    Unsupported,
}

impl ErrorCategory {
    /// Whether errors in this category are generally retriable
    #[inline]
    pub const fn is_retriable(self) -> bool {
        matches!(self, Self::Connection)
    }
}

/// Main error type for tabula-db
#[derive(Error, Debug)]
#[allow(missing_docs)]
pub enum Error {
    /// A configuration key is missing or holds a value of the wrong shape
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// Connection establishment failed
    #[error("connection error: {message}")]
    Connection {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A connection could not report a requested property
    #[error("introspection error: {message}")]
    Introspection { message: String },

    /// Statement execution failed
    #[error("query error: {message}")]
    Query {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Unsupported engine or operation
    #[error("unsupported: {message}")]
    Unsupported { message: String },
}

impl Error {
    /// Get the error category
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Configuration { .. } => ErrorCategory::Configuration,
            Self::Connection { .. } => ErrorCategory::Connection,
            Self::Introspection { .. } => ErrorCategory::Introspection,
            Self::Query { .. } => ErrorCategory::Query,
            Self::Unsupported { .. } => ErrorCategory::Unsupported,
        }
    }

    /// Whether this error is retriable
    #[inline]
    pub fn is_retriable(&self) -> bool {
        self.category().is_retriable()
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create a configuration error for a key that was never declared
    pub fn missing_option(key: &str) -> Self {
        Self::config(format!("required option '{}' is not declared", key))
    }

    /// Create a connection error
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
            source: None,
        }
    }

    /// Create a connection error with source
    pub fn connection_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Connection {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an introspection error
    pub fn introspection(message: impl Into<String>) -> Self {
        Self::Introspection {
            message: message.into(),
        }
    }

    /// Create a query error with source
    pub fn query_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Query {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unsupported operation error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Self::Unsupported {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "configuration"),
            Self::Connection => write!(f, "connection"),
            Self::Introspection => write!(f, "introspection"),
            Self::Query => write!(f, "query"),
            Self::Unsupported => write!(f, "unsupported"),
        }
    }
}
