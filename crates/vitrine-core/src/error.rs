//! # Error Types
//!
//! Domain-specific error types for vitrine-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  vitrine-core errors (this file)                                       │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Form input failures                            │
//! │                                                                         │
//! │  vitrine-sync errors (separate crate)                                  │
//! │  ├── ConfigError      - Placeholder credentials (never sent anywhere)  │
//! │  ├── AuthError        - Rejected by the identity provider              │
//! │  ├── ConnectError     - Store unreachable or misconfigured             │
//! │  ├── WriteError       - add-product rejected                           │
//! │  └── ReadError        - subscribe / fetch rejected                     │
//! │                                                                         │
//! │  Flow: error ──► status event { kind: error, text } ──► renderer       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core catalog errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A price string could not be read as a decimal amount.
    ///
    /// ## When This Occurs
    /// - Free text typed into the price field ("abc", "1e3")
    /// - Documents written by other clients with malformed prices
    ///
    /// Stats treat such prices as absent rather than zero.
    #[error("Invalid price: '{value}'")]
    InvalidPrice { value: String },
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Only emptiness is checked; the catalog is schemaless.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },
}

impl ValidationError {
    /// Shorthand for [`ValidationError::Required`].
    pub fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InvalidPrice {
            value: "abc".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid price: 'abc'");
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::required("category");
        assert_eq!(err.to_string(), "category is required");
    }
}
