//! # Error Types
//!
//! Domain-specific error types for veranda-core.
//!
//! ## Error Hierarchy
//! ```text
//! veranda-core (this file)
//! ├── CoreError        - business rule violations
//! └── ValidationError  - input validation failures
//!
//! veranda-db
//! ├── DbError          - database operation failures
//! └── CheckoutError    - checkout transaction failures
//!
//! apps/redeem-api
//! └── ApiError         - what HTTP clients see (serialized)
//! ```
//!
//! ## Design Principles
//! 1. `thiserror` for derive macros, never manual Display impls
//! 2. Include context in messages (codes, ids, quantities)
//! 3. Errors are enum variants, never bare strings

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Coupon definition does not exist or is inactive.
    #[error("Coupon definition not found: {0}")]
    DefinitionNotFound(String),

    /// Not enough unused units of a limited definition.
    ///
    /// Raised both at reservation time (live availability minus other
    /// sessions' holds) and re-checked inside the checkout transaction.
    #[error("Insufficient availability for {definition_id}: available {available}, requested {requested}")]
    InsufficientAvailability {
        definition_id: String,
        available: i64,
        requested: i64,
    },

    /// Some pre-selected generated codes are no longer unused.
    /// The whole operation is aborted; partial allocation never happens.
    #[error("Selected codes are unavailable: {}", unavailable.join(", "))]
    CodesUnavailable { unavailable: Vec<String> },

    #[error("Receipt not found: {0}")]
    ReceiptNotFound(String),

    /// Receipt is not in a state that allows the requested operation
    /// (e.g. cancelling an already-cancelled receipt, discarding a
    /// printed one).
    #[error("Receipt {receipt_id} is {current_status}, cannot perform operation")]
    InvalidReceiptStatus {
        receipt_id: String,
        current_status: String,
    },

    /// Cart has exceeded the maximum allowed lines.
    #[error("Cart cannot have more than {max} lines")]
    CartTooLarge { max: usize },

    /// Line quantity exceeds the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// A cart line's selected codes disagree with its quantity.
    #[error("Line for {definition_id} selects {selected} codes but has quantity {quantity}")]
    SelectionMismatch {
        definition_id: String,
        selected: usize,
        quantity: i64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors, raised before business logic runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    Required { field: String },

    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    #[error("{field} must be positive")]
    MustBePositive { field: String },

    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientAvailability {
            definition_id: "pool-pass".to_string(),
            available: 2,
            requested: 5,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient availability for pool-pass: available 2, requested 5"
        );

        let err = CoreError::CodesUnavailable {
            unavailable: vec!["POOL-0001".to_string(), "POOL-0002".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Selected codes are unavailable: POOL-0001, POOL-0002"
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "name".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
