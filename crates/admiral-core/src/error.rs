//! Core domain errors.

use thiserror::Error;

/// Core domain errors for the Admiral CLI.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No resource matched the given ID or prefix.
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    /// More than one resource matched a short ID prefix.
    #[error("ambiguous {kind} ID '{id}', matches: {}", matches.join(", "))]
    Ambiguous {
        kind: String,
        id: String,
        matches: Vec<String>,
    },

    /// Invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_lists_matches() {
        let err = CoreError::Ambiguous {
            kind: "container".to_string(),
            id: "ab".to_string(),
            matches: vec!["abc".to_string(), "abd".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "ambiguous container ID 'ab', matches: abc, abd"
        );
    }
}
