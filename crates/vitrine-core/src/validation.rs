//! # Validation Module
//!
//! Input validation for the product form and the login form.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Where Validation Happens                         │
//! │                                                                         │
//! │  Form submit ──► trim ──► empty? ──► ValidationError::Required         │
//! │                               │                                         │
//! │                               └─► ProductDraft ──► add_product         │
//! │                                                                         │
//! │  The catalog is schemaless: emptiness is the only rule. Prices are    │
//! │  stored as typed; unparsable prices are simply skipped by the stats.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use vitrine_core::types::ProductDraft;
//!
//! let draft = ProductDraft::new(" Bebidas ", "Suco de uva", "7,50").unwrap();
//! assert_eq!(draft.category(), "Bebidas");
//! assert!(ProductDraft::new("Bebidas", "", "7,50").is_err());
//! ```

use crate::error::ValidationError;
use crate::types::ProductDraft;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Trims a field and rejects it when empty.
fn required(field: &str, value: &str) -> ValidationResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(value.to_string())
}

impl ProductDraft {
    /// Validates raw form input into a draft.
    ///
    /// Fields are checked in form order, so the first empty one is reported.
    pub fn new(category: &str, name: &str, price: &str) -> ValidationResult<ProductDraft> {
        Ok(ProductDraft {
            category: required("category", category)?,
            name: required("name", name)?,
            price: required("price", price)?,
        })
    }
}

/// Validates the email/password pair of the login and sign-up forms.
///
/// Returns the trimmed email; the password is passed through untouched.
pub fn validate_login(email: &str, password: &str) -> ValidationResult<String> {
    let email = required("email", email)?;
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }
    Ok(email)
}
