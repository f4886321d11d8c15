//! # Receipt Code Formatting
//!
//! Receipt codes are `{prefix}{number:06}`, e.g. `RV000123`. The number
//! comes from the database counter (or the local fallback counter); this
//! module only formats and parses.

use crate::error::ValidationError;

/// Width of the numeric part of a receipt code.
pub const NUMBER_WIDTH: usize = 6;

/// Formats a receipt code from a prefix and sequence number.
#[inline]
pub fn format_receipt_code(prefix: &str, number: i64) -> String {
    format!("{}{:0width$}", prefix, number, width = NUMBER_WIDTH)
}

/// Parses a receipt code back into `(prefix, number)`.
///
/// The numeric part is the trailing `NUMBER_WIDTH` digits; everything
/// before it is the prefix. Codes shorter than the numeric width or with
/// a non-numeric tail are rejected.
pub fn parse_receipt_code(code: &str) -> Result<(String, i64), ValidationError> {
    let code = code.trim();
    if code.len() <= NUMBER_WIDTH {
        return Err(ValidationError::InvalidFormat {
            field: "receipt_code".to_string(),
            reason: format!("must be longer than {} characters", NUMBER_WIDTH),
        });
    }

    let split = code.len() - NUMBER_WIDTH;
    let (prefix, digits) = code.split_at(split);

    let number: i64 = digits
        .parse()
        .map_err(|_| ValidationError::InvalidFormat {
            field: "receipt_code".to_string(),
            reason: "trailing characters must be digits".to_string(),
        })?;

    Ok((prefix.to_string(), number))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format() {
        assert_eq!(format_receipt_code("RV", 123), "RV000123");
        assert_eq!(format_receipt_code("RV", 1_000_000), "RV1000000");
    }

    #[test]
    fn test_parse_roundtrip() {
        let (prefix, number) = parse_receipt_code("RV000123").unwrap();
        assert_eq!(prefix, "RV");
        assert_eq!(number, 123);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_receipt_code("RV").is_err());
        assert!(parse_receipt_code("RVABCDEF").is_err());
        assert!(parse_receipt_code("000123").is_err());
    }
}
