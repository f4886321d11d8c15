//! # Validation Module
//!
//! Input validation for Veranda POS. Runs before business logic; the
//! database constraints are the last line of defense behind these.

use crate::error::ValidationError;
use crate::MAX_LINE_QUANTITY;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a coupon definition name (1..=200 chars, non-empty).
pub fn validate_definition_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates a code prefix used for generated coupon codes.
///
/// ## Rules
/// - 1..=10 characters
/// - uppercase alphanumeric only (codes are read over the phone)
pub fn validate_code_prefix(prefix: &str) -> ValidationResult<()> {
    let prefix = prefix.trim();

    if prefix.is_empty() {
        return Err(ValidationError::Required {
            field: "code_prefix".to_string(),
        });
    }
    if prefix.len() > 10 {
        return Err(ValidationError::TooLong {
            field: "code_prefix".to_string(),
            max: 10,
        });
    }
    if !prefix.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "code_prefix".to_string(),
            reason: "must contain only uppercase letters and digits".to_string(),
        });
    }
    Ok(())
}

/// Validates a person display name (customers, staff). Same rules as
/// definition names.
pub fn validate_person_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: "name".to_string(),
        });
    }
    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "name".to_string(),
            max: 200,
        });
    }
    Ok(())
}

/// Validates a search query. Empty is allowed (returns defaults);
/// returns the trimmed query.
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.len() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }
    Ok(query.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity (1..=MAX_LINE_QUANTITY).
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }
    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }
    Ok(())
}

/// Validates a price in satang. Zero is allowed (complimentary items).
pub fn validate_price_satang(satang: i64) -> ValidationResult<()> {
    if satang < 0 {
        return Err(ValidationError::OutOfRange {
            field: "price".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }
    Ok(())
}

/// Validates a batch size for code generation (1..=10000 per batch).
pub fn validate_batch_size(count: i64) -> ValidationResult<()> {
    if count <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "count".to_string(),
        });
    }
    if count > 10_000 {
        return Err(ValidationError::OutOfRange {
            field: "count".to_string(),
            min: 1,
            max: 10_000,
        });
    }
    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string format.
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_definition_name() {
        assert!(validate_definition_name("Pool day pass").is_ok());
        assert!(validate_definition_name("").is_err());
        assert!(validate_definition_name("   ").is_err());
        assert!(validate_definition_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_code_prefix() {
        assert!(validate_code_prefix("POOL").is_ok());
        assert!(validate_code_prefix("SPA2").is_ok());

        assert!(validate_code_prefix("").is_err());
        assert!(validate_code_prefix("pool").is_err());
        assert!(validate_code_prefix("PO OL").is_err());
        assert!(validate_code_prefix("TOOLONGPREFIX").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());

        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_price_satang() {
        assert!(validate_price_satang(0).is_ok());
        assert!(validate_price_satang(35000).is_ok());
        assert!(validate_price_satang(-1).is_err());
    }

    #[test]
    fn test_validate_batch_size() {
        assert!(validate_batch_size(100).is_ok());
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(10_001).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("not-a-uuid").is_err());
    }
}
