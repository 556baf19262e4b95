//! Error types for glossa.

use thiserror::Error;

/// Result type alias using glossa's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for glossa operations.
///
/// The variants mirror the protocol's failure taxonomy: every read-oriented
/// operation distinguishes [`Error::NotFound`] from [`Error::Gone`], and every
/// client-caused write failure is either [`Error::Validation`] or
/// [`Error::Constraint`].
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource never existed
    #[error("Not found: {0}")]
    NotFound(String),

    /// Resource existed and was deleted
    #[error("Gone: {0}")]
    Gone(String),

    /// Payload failed schema validation
    #[error("{0}")]
    Validation(String),

    /// Uniqueness or referential constraint rejected by the repository
    #[error("Constraint violation: {0}")]
    Constraint(String),

    /// Malformed request (unparseable body, bad query parameter)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures the client caused and can fix by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::Gone(_)
                | Error::Validation(_)
                | Error::Constraint(_)
                | Error::InvalidInput(_)
        )
    }

    /// Classify a sqlx error, turning constraint violations into
    /// [`Error::Constraint`] and leaving everything else as [`Error::Database`].
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation()
                || db_err.is_foreign_key_violation()
                || db_err.is_check_violation()
            {
                return Error::Constraint(db_err.message().to_string());
            }
        }
        Error::Database(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_not_found() {
        let err = Error::NotFound("annotation foo".to_string());
        assert_eq!(err.to_string(), "Not found: annotation foo");
    }

    #[test]
    fn test_error_display_gone() {
        let err = Error::Gone("annotation foo".to_string());
        assert_eq!(err.to_string(), "Gone: annotation foo");
    }

    #[test]
    fn test_validation_message_is_verbatim() {
        let err = Error::Validation("\"target\" is a required property".to_string());
        assert_eq!(err.to_string(), "\"target\" is a required property");
    }

    #[test]
    fn test_error_display_constraint() {
        let err = Error::Constraint("duplicate slug".to_string());
        assert_eq!(err.to_string(), "Constraint violation: duplicate slug");
    }

    #[test]
    fn test_client_error_classification() {
        assert!(Error::NotFound("x".into()).is_client_error());
        assert!(Error::Gone("x".into()).is_client_error());
        assert!(Error::Validation("x".into()).is_client_error());
        assert!(Error::Constraint("x".into()).is_client_error());
        assert!(Error::InvalidInput("x".into()).is_client_error());
        assert!(!Error::Internal("x".into()).is_client_error());
        assert!(!Error::Database(sqlx::Error::RowNotFound).is_client_error());
    }

    #[test]
    fn test_from_sqlx_keeps_non_constraint_errors() {
        let err = Error::from_sqlx(sqlx::Error::RowNotFound);
        assert!(matches!(err, Error::Database(_)));
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json");
        let err: Error = json_err.unwrap_err().into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
