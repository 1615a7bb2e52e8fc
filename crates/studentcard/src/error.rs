//! Error types for studentcard.
//!
//! This module defines all error types used throughout the studentcard crate,
//! providing detailed context for debugging and user-friendly error messages.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for studentcard operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// A database query failed.
    #[error("database query failed: {0}")]
    DatabaseQuery(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Record Errors ===
    /// A required field was empty when the record was submitted.
    #[error("cannot submit record: {field} is required")]
    IncompleteRecord {
        /// Name of the missing field.
        field: &'static str,
    },

    /// The record is already submitted and can no longer be edited.
    #[error("record is already submitted")]
    AlreadySubmitted,

    /// A photo value is not a usable `data:` URI.
    #[error("invalid data URI: {message}")]
    InvalidDataUri {
        /// Description of what is wrong with the URI.
        message: String,
    },

    /// A photo file does not have an image type.
    #[error("unsupported photo file {path}: {reason}")]
    UnsupportedPhoto {
        /// Path of the rejected file.
        path: PathBuf,
        /// Why the file was rejected.
        reason: String,
    },

    // === Token Errors ===
    /// A QR token could not be decoded.
    #[error("malformed token: {message}")]
    TokenDecode {
        /// Description of what went wrong.
        message: String,
    },

    /// The token cannot be drawn as a QR symbol.
    #[error("cannot build QR symbol: {message}")]
    QrSymbol {
        /// Description of what went wrong.
        message: String,
    },

    // === Export Errors ===
    /// The card rasterizer failed.
    #[error("failed to rasterize card: {0}")]
    Rasterize(String),

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for studentcard operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a token decode error.
    #[must_use]
    pub fn token(message: impl Into<String>) -> Self {
        Self::TokenDecode {
            message: message.into(),
        }
    }

    /// Create a QR symbol error.
    #[must_use]
    pub fn qr_symbol(message: impl Into<String>) -> Self {
        Self::QrSymbol {
            message: message.into(),
        }
    }

    /// Create an invalid data URI error.
    #[must_use]
    pub fn data_uri(message: impl Into<String>) -> Self {
        Self::InvalidDataUri {
            message: message.into(),
        }
    }

    /// Create a rasterizer error.
    #[must_use]
    pub fn rasterize(message: impl Into<String>) -> Self {
        Self::Rasterize(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incomplete_record_display() {
        let err = Error::IncompleteRecord { field: "name" };
        assert_eq!(err.to_string(), "cannot submit record: name is required");
    }

    #[test]
    fn test_already_submitted_display() {
        assert_eq!(
            Error::AlreadySubmitted.to_string(),
            "record is already submitted"
        );
    }

    #[test]
    fn test_token_error() {
        let err = Error::token("unexpected end of input");
        assert_eq!(err.to_string(), "malformed token: unexpected end of input");
    }

    #[test]
    fn test_data_uri_error() {
        let err = Error::data_uri("missing base64 marker");
        assert!(err.to_string().contains("missing base64 marker"));
    }

    #[test]
    fn test_rasterize_error() {
        let err = Error::rasterize("surface lost");
        assert_eq!(err.to_string(), "failed to rasterize card: surface lost");
    }

    #[test]
    fn test_unsupported_photo_display() {
        let err = Error::UnsupportedPhoto {
            path: PathBuf::from("/tmp/notes.txt"),
            reason: "not an image".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("/tmp/notes.txt"));
        assert!(msg.contains("not an image"));
    }

    #[test]
    fn test_qr_symbol_error() {
        let err = Error::qr_symbol("data too long");
        assert_eq!(err.to_string(), "cannot build QR symbol: data too long");
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_rusqlite_error() {
        let result = rusqlite::Connection::open_with_flags(
            "/nonexistent/path/db.sqlite",
            rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY,
        );
        if let Err(sqlite_err) = result {
            let err: Error = sqlite_err.into();
            assert!(matches!(err, Error::DatabaseQuery(_)));
        }
    }

    #[test]
    fn test_from_json_error() {
        let json_result: std::result::Result<i32, serde_json::Error> =
            serde_json::from_str("not valid json");
        if let Err(json_err) = json_result {
            let err: Error = json_err.into();
            assert!(matches!(err, Error::Json(_)));
        }
    }

    #[test]
    fn test_config_validation_error_display() {
        let err = Error::ConfigValidation {
            message: "slot_key must not be empty".to_string(),
        };
        assert!(err.to_string().contains("slot_key"));
    }

    #[test]
    fn test_directory_create_error_display() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let err = Error::DirectoryCreate {
            path: PathBuf::from("/root/forbidden"),
            source: io_err,
        };
        assert!(err.to_string().contains("/root/forbidden"));
    }
}
