//! Error types for TELEPIPE
//!
//! Note that the send path itself never surfaces these: a send either
//! succeeds or it does not, and channels report that as a plain boolean.
//! Errors here cover construction-time concerns like configuration.

use thiserror::Error;

/// Result type alias for TELEPIPE operations
pub type Result<T> = std::result::Result<T, TelepipeError>;

/// Main error type for TELEPIPE
#[derive(Error, Debug)]
pub enum TelepipeError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let err = TelepipeError::Config("bad threshold".to_string());
        assert_eq!(err.to_string(), "configuration error: bad threshold");
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: TelepipeError = io.into();
        assert!(matches!(err, TelepipeError::Io(_)));
    }
}
