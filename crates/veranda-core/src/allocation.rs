//! # Allocation Math
//!
//! Pure helpers behind coupon reservation and final allocation. The
//! database layer wraps these in transactions; the arithmetic and the
//! all-or-nothing selection rules live here so they can be tested
//! without a database.
//!
//! ## Allocation Flow
//! ```text
//! cart-building:  available = unused − reserved_by_others
//!                 reserve only if requested ≤ available
//!
//! checkout:       pre-selected codes → all must still be unused,
//!                 otherwise abort the whole transaction
//!                 no selection → take the lowest-seq unused rows
//! ```

use std::collections::HashSet;

use crate::error::{CoreError, CoreResult};

/// Units of a limited definition still offerable to a session.
///
/// `reserved_by_others` counts active (non-expired) reservations held by
/// other sessions; a session's own holds do not reduce what it may take.
/// Clamped at zero: stale reservations can momentarily exceed stock.
#[inline]
pub fn available_units(unused: i64, reserved_by_others: i64) -> i64 {
    (unused - reserved_by_others).max(0)
}

/// Whether a session may grow its reservation to `requested_total`.
pub fn can_reserve(unused: i64, reserved_by_others: i64, requested_total: i64) -> bool {
    requested_total > 0 && requested_total <= available_units(unused, reserved_by_others)
}

/// Picks the `quantity` lowest-sequence unused code ids.
///
/// `unused` must already be ordered lowest-first (the repository queries
/// `ORDER BY seq`). Errors if stock is short.
pub fn select_lowest(
    definition_id: &str,
    unused: &[String],
    quantity: i64,
) -> CoreResult<Vec<String>> {
    if (unused.len() as i64) < quantity {
        return Err(CoreError::InsufficientAvailability {
            definition_id: definition_id.to_string(),
            available: unused.len() as i64,
            requested: quantity,
        });
    }
    Ok(unused.iter().take(quantity as usize).cloned().collect())
}

/// Validates that every pre-selected code id is still unused.
///
/// All-or-nothing: a single stale selection aborts the whole set, so a
/// checkout can never partially allocate.
pub fn validate_preselection(selected: &[String], unused: &HashSet<String>) -> CoreResult<()> {
    let unavailable: Vec<String> = selected
        .iter()
        .filter(|id| !unused.contains(*id))
        .cloned()
        .collect();

    if unavailable.is_empty() {
        Ok(())
    } else {
        Err(CoreError::CodesUnavailable { unavailable })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_available_units() {
        assert_eq!(available_units(10, 3), 7);
        assert_eq!(available_units(3, 3), 0);
        // Stale reservations can exceed stock; never go negative.
        assert_eq!(available_units(2, 5), 0);
    }

    #[test]
    fn test_can_reserve() {
        assert!(can_reserve(10, 3, 7));
        assert!(!can_reserve(10, 3, 8));
        assert!(!can_reserve(10, 0, 0));
        assert!(!can_reserve(10, 0, -1));
    }

    #[test]
    fn test_select_lowest() {
        let unused = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let picked = select_lowest("d1", &unused, 2).unwrap();
        assert_eq!(picked, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_select_lowest_insufficient() {
        let unused = vec!["a".to_string()];
        let err = select_lowest("d1", &unused, 2).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InsufficientAvailability {
                available: 1,
                requested: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_validate_preselection_all_or_nothing() {
        let unused: HashSet<String> = ["a", "b"].iter().map(|s| s.to_string()).collect();

        assert!(validate_preselection(&["a".to_string()], &unused).is_ok());

        let err =
            validate_preselection(&["a".to_string(), "z".to_string()], &unused).unwrap_err();
        match err {
            CoreError::CodesUnavailable { unavailable } => {
                assert_eq!(unavailable, vec!["z".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
