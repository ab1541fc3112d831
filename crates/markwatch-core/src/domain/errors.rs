//! Domain error types
//!
//! Errors raised by domain-level parsing. Adapter failures travel as
//! `anyhow::Error` through the ports instead.

use thiserror::Error;

/// Errors that can occur in domain operations
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// A storage key name that the structured store does not know about
    #[error("Unknown storage key: {0}")]
    UnknownStorageKey(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = DomainError::UnknownStorageKey("color".to_string());
        assert_eq!(err.to_string(), "Unknown storage key: color");
    }

    #[test]
    fn test_error_equality() {
        let err1 = DomainError::UnknownStorageKey("a".to_string());
        let err2 = DomainError::UnknownStorageKey("a".to_string());
        let err3 = DomainError::UnknownStorageKey("b".to_string());

        assert_eq!(err1, err2);
        assert_ne!(err1, err3);
    }
}
