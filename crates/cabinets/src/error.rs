//! Error types for cabinets
//!
//! Errors are organized by the stage that produced them: locating a resource,
//! registering implementations, talking to a storage backend, or converting
//! content. Every variant carries the key, URI or path it failed on.

use std::fmt;
use thiserror::Error;

use crate::registry::Kind;

/// Main error type for cabinets operations
#[derive(Error, Debug)]
pub enum CabinetError {
    /// The location could not be split into a protocol and a path
    #[error("Invalid URI: {0}")]
    InvalidUri(#[from] UriError),

    /// Misuse of the registry at registration time
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    /// Lookup miss for a protocol or an extension
    #[error("No {kind} registered for key '{key}'")]
    UnknownKey { kind: Kind, key: String },

    /// The underlying storage operation failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Content could not be decoded or encoded
    #[error("Parser error: {0}")]
    Parser(#[from] ParserError),

    /// A caller-supplied argument has the wrong shape
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Plugin discovery failed before registration
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Invalid process configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Errors produced while resolving a location into (protocol, path)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UriError {
    #[error("'{uri}' contains {count} protocol separators, expected at most one")]
    SeparatorCount { uri: String, count: usize },

    #[error("Unknown protocol '{protocol}' in '{uri}'")]
    UnknownProtocol { protocol: String, uri: String },

    #[error("Empty resource path in '{uri}'")]
    EmptyPath { uri: String },

    #[error("Cannot use path {path}: {reason}")]
    InvalidPath { path: String, reason: String },
}

/// Registration-time errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("{kind} key '{key}' is already registered to '{owner}'")]
    Duplicate {
        kind: Kind,
        key: String,
        owner: String,
    },

    #[error("Cannot register {kind} '{name}' without any keys")]
    Empty { kind: Kind, name: String },

    #[error("Cannot register '{name}' as a {expected}: it is a {found}")]
    TypeMismatch {
        name: String,
        expected: Kind,
        found: Kind,
    },
}

/// Storage backend errors
///
/// Raised by the raw content primitives of a backend and propagated
/// unchanged through the layered read/create/delete operations.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Not found: {path}")]
    NotFound { path: String },

    #[error("Permission denied: {path}")]
    PermissionDenied { path: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Object storage error for bucket '{bucket}', key '{key}': {message}")]
    Remote {
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Backend '{backend}' does not support {operation}")]
    Unsupported {
        backend: String,
        operation: &'static str,
    },

    #[error("Invalid backend configuration: {0}")]
    Config(String),

    #[error("Storage backend error: {0}")]
    Internal(String),
}

/// Content conversion errors, tagged with the format that failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParserError {
    #[error("Cannot decode {format} content: {reason}")]
    Decode { format: String, reason: String },

    #[error("Cannot encode {format} content: {reason}")]
    Encode { format: String, reason: String },

    #[error("Invalid option for {format} parser: {reason}")]
    Options { format: String, reason: String },
}

/// Plugin discovery errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiscoveryError {
    #[error("Cannot load plugin manifest {path}: {reason}")]
    Manifest { path: String, reason: String },

    #[error("Unknown plugin implementation '{name}'")]
    UnknownImplementation { name: String },

    #[error("Plugin implementation '{name}' is already in the catalog")]
    DuplicateImplementation { name: String },
}

/// Shorthand result type for cabinets operations
pub type Result<T> = std::result::Result<T, CabinetError>;

// ============================================================================
// Constructors
// ============================================================================

impl BackendError {
    /// Classify an I/O error while keeping the path it happened on
    pub fn io(path: impl Into<String>, error: std::io::Error) -> Self {
        let path = path.into();
        match error.kind() {
            std::io::ErrorKind::NotFound => BackendError::NotFound { path },
            std::io::ErrorKind::PermissionDenied => BackendError::PermissionDenied { path },
            _ => BackendError::Io {
                path,
                source: error,
            },
        }
    }

    pub fn unsupported(backend: impl Into<String>, operation: &'static str) -> Self {
        BackendError::Unsupported {
            backend: backend.into(),
            operation,
        }
    }
}

impl ParserError {
    pub fn decode(format: impl Into<String>, reason: impl fmt::Display) -> Self {
        ParserError::Decode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub fn encode(format: impl Into<String>, reason: impl fmt::Display) -> Self {
        ParserError::Encode {
            format: format.into(),
            reason: reason.to_string(),
        }
    }

    pub fn options(format: impl Into<String>, reason: impl fmt::Display) -> Self {
        ParserError::Options {
            format: format.into(),
            reason: reason.to_string(),
        }
    }
}

impl CabinetError {
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        CabinetError::InvalidArgument(msg.into())
    }

    /// True when the error means the addressed resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, CabinetError::Backend(BackendError::NotFound { .. }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_classification_keeps_path() {
        let err = BackendError::io(
            "/tmp/missing.json",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        match err {
            BackendError::NotFound { path } => assert_eq!(path, "/tmp/missing.json"),
            other => panic!("Expected NotFound, got {other:?}"),
        }

        let err = BackendError::io(
            "/root/secret",
            std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        );
        assert!(matches!(err, BackendError::PermissionDenied { .. }));

        let err = BackendError::io("/dev/full", std::io::Error::other("disk full"));
        assert!(matches!(err, BackendError::Io { .. }));
        assert!(err.to_string().contains("/dev/full"));
    }

    #[test]
    fn test_messages_identify_offending_key() {
        let err = CabinetError::UnknownKey {
            kind: Kind::Parser,
            key: "toml".to_string(),
        };
        assert_eq!(err.to_string(), "No parser registered for key 'toml'");

        let err = CabinetError::from(RegistryError::Duplicate {
            kind: Kind::Backend,
            key: "s3".to_string(),
            owner: "s3".to_string(),
        });
        assert!(err.to_string().contains("backend key 's3'"));
    }

    #[test]
    fn test_is_not_found() {
        let err = CabinetError::from(BackendError::NotFound {
            path: "a.json".into(),
        });
        assert!(err.is_not_found());
        assert!(!CabinetError::invalid_argument("bad").is_not_found());
    }
}
