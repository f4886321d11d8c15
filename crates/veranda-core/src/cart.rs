//! # Cart
//!
//! The in-memory cart a front-desk session builds before checkout.
//!
//! ## Thread Safety
//! [`CartState`] wraps the cart in `Arc<Mutex<Cart>>`: several request
//! handlers may touch the same session's cart, and only one should
//! modify it at a time.
//!
//! ## Relationship to Reservations
//! Adding a limited-coupon line is paired (by the caller) with a soft
//! reservation in the database; removing the line releases it. The cart
//! itself is pure state and does no I/O.

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::types::{CouponDefinition, CouponKind};
use crate::{MAX_CART_LINES, MAX_LINE_QUANTITY};

/// One coupon line in the cart.
///
/// Definition data is frozen at the moment of adding, so the cart stays
/// consistent even if an admin edits the definition mid-sale.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub definition_id: String,

    /// Name at time of adding (frozen).
    pub name: String,

    pub kind: CouponKind,

    /// Unit price in satang at time of adding (frozen).
    pub unit_price_satang: i64,

    pub quantity: i64,

    /// Absolute discount on this line, in satang.
    pub discount_satang: i64,

    /// For limited coupons: specific generated-code ids the staff picked
    /// from the browse list. Empty means "allocate lowest available".
    pub selected_code_ids: Vec<String>,

    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn from_definition(definition: &CouponDefinition, quantity: i64) -> Self {
        CartLine {
            definition_id: definition.id.clone(),
            name: definition.name.clone(),
            kind: definition.kind,
            unit_price_satang: definition.price_satang,
            quantity,
            discount_satang: 0,
            selected_code_ids: Vec::new(),
            added_at: Utc::now(),
        }
    }

    /// unit price × quantity − discount.
    pub fn line_total_satang(&self) -> i64 {
        self.unit_price_satang * self.quantity - self.discount_satang
    }
}

/// The cart for one front-desk session.
///
/// ## Invariants
/// - Lines are unique by `definition_id`
/// - Quantity per line is 1..=MAX_LINE_QUANTITY
/// - If codes are selected, their count must equal the line quantity
///   by the time the cart is turned into a checkout draft
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

impl Cart {
    pub fn new() -> Self {
        Cart {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds a definition to the cart or increases its line quantity.
    pub fn add_line(&mut self, definition: &CouponDefinition, quantity: i64) -> CoreResult<()> {
        if let Some(line) = self
            .lines
            .iter_mut()
            .find(|l| l.definition_id == definition.id)
        {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_LINE_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_LINE_QUANTITY,
                });
            }
            line.quantity = new_qty;
            return Ok(());
        }

        if self.lines.len() >= MAX_CART_LINES {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_LINES,
            });
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        self.lines.push(CartLine::from_definition(definition, quantity));
        Ok(())
    }

    /// Sets the quantity of a line; zero removes it.
    pub fn update_quantity(&mut self, definition_id: &str, quantity: i64) -> CoreResult<()> {
        if quantity == 0 {
            return self.remove_line(definition_id);
        }
        if quantity > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_LINE_QUANTITY,
            });
        }

        let line = self
            .lines
            .iter_mut()
            .find(|l| l.definition_id == definition_id)
            .ok_or_else(|| CoreError::DefinitionNotFound(definition_id.to_string()))?;
        line.quantity = quantity;
        // A shrinking line keeps only as many picked codes as fit.
        line.selected_code_ids.truncate(quantity as usize);
        Ok(())
    }

    /// Replaces the picked generated-code ids of a limited line and
    /// snaps the quantity to the selection size.
    pub fn select_codes(&mut self, definition_id: &str, code_ids: Vec<String>) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.definition_id == definition_id)
            .ok_or_else(|| CoreError::DefinitionNotFound(definition_id.to_string()))?;

        if code_ids.len() as i64 > MAX_LINE_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: code_ids.len() as i64,
                max: MAX_LINE_QUANTITY,
            });
        }

        line.quantity = code_ids.len() as i64;
        line.selected_code_ids = code_ids;
        Ok(())
    }

    /// Applies an absolute discount to a line (drag-a-discount flow).
    pub fn apply_discount(&mut self, definition_id: &str, discount_satang: i64) -> CoreResult<()> {
        let line = self
            .lines
            .iter_mut()
            .find(|l| l.definition_id == definition_id)
            .ok_or_else(|| CoreError::DefinitionNotFound(definition_id.to_string()))?;
        line.discount_satang = discount_satang.max(0);
        Ok(())
    }

    pub fn remove_line(&mut self, definition_id: &str) -> CoreResult<()> {
        let initial_len = self.lines.len();
        self.lines.retain(|l| l.definition_id != definition_id);

        if self.lines.len() == initial_len {
            Err(CoreError::DefinitionNotFound(definition_id.to_string()))
        } else {
            Ok(())
        }
    }

    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Verifies every line with picked codes has selection == quantity.
    /// Called before the cart is turned into a checkout draft.
    pub fn validate_selections(&self) -> CoreResult<()> {
        for line in &self.lines {
            if !line.selected_code_ids.is_empty()
                && line.selected_code_ids.len() as i64 != line.quantity
            {
                return Err(CoreError::SelectionMismatch {
                    definition_id: line.definition_id.clone(),
                    selected: line.selected_code_ids.len(),
                    quantity: line.quantity,
                });
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn subtotal_satang(&self) -> i64 {
        self.lines
            .iter()
            .map(|l| l.unit_price_satang * l.quantity)
            .sum()
    }

    pub fn discount_satang(&self) -> i64 {
        self.lines.iter().map(|l| l.discount_satang).sum()
    }

    pub fn total_satang(&self) -> i64 {
        self.subtotal_satang() - self.discount_satang()
    }
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new()
    }
}

/// Cart totals summary for API responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartTotals {
    pub line_count: usize,
    pub total_quantity: i64,
    pub subtotal_satang: i64,
    pub discount_satang: i64,
    pub total_satang: i64,
}

impl From<&Cart> for CartTotals {
    fn from(cart: &Cart) -> Self {
        CartTotals {
            line_count: cart.lines.len(),
            total_quantity: cart.lines.iter().map(|l| l.quantity).sum(),
            subtotal_satang: cart.subtotal_satang(),
            discount_satang: cart.discount_satang(),
            total_satang: cart.total_satang(),
        }
    }
}

/// Shared cart state for one session.
#[derive(Debug)]
pub struct CartState {
    cart: Arc<Mutex<Cart>>,
}

impl CartState {
    pub fn new() -> Self {
        CartState {
            cart: Arc::new(Mutex::new(Cart::new())),
        }
    }

    /// Executes a function with read access to the cart.
    pub fn with_cart<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&Cart) -> R,
    {
        let cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&cart)
    }

    /// Executes a function with write access to the cart.
    pub fn with_cart_mut<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Cart) -> R,
    {
        let mut cart = self.cart.lock().expect("Cart mutex poisoned");
        f(&mut cart)
    }
}

impl Default for CartState {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_definition(id: &str, kind: CouponKind, price_satang: i64) -> CouponDefinition {
        CouponDefinition {
            id: id.to_string(),
            code_prefix: format!("PX{}", id),
            name: format!("Coupon {}", id),
            description: None,
            kind,
            price_satang,
            valid_until: None,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_line_and_totals() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Unlimited, 15000);

        cart.add_line(&def, 2).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.subtotal_satang(), 30000);
        assert_eq!(cart.total_satang(), 30000);
    }

    #[test]
    fn test_add_same_definition_increases_quantity() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Limited, 15000);

        cart.add_line(&def, 2).unwrap();
        cart.add_line(&def, 3).unwrap();

        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 5);
    }

    #[test]
    fn test_discount_applies_to_totals() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Unlimited, 10000);

        cart.add_line(&def, 2).unwrap();
        cart.apply_discount("1", 5000).unwrap();

        assert_eq!(cart.subtotal_satang(), 20000);
        assert_eq!(cart.discount_satang(), 5000);
        assert_eq!(cart.total_satang(), 15000);
    }

    #[test]
    fn test_select_codes_snaps_quantity() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Limited, 10000);

        cart.add_line(&def, 1).unwrap();
        cart.select_codes("1", vec!["c1".to_string(), "c2".to_string()])
            .unwrap();

        assert_eq!(cart.lines[0].quantity, 2);
        assert!(cart.validate_selections().is_ok());
    }

    #[test]
    fn test_shrinking_quantity_truncates_selection() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Limited, 10000);

        cart.add_line(&def, 1).unwrap();
        cart.select_codes("1", vec!["c1".to_string(), "c2".to_string(), "c3".to_string()])
            .unwrap();
        cart.update_quantity("1", 2).unwrap();

        assert_eq!(cart.lines[0].selected_code_ids.len(), 2);
        assert!(cart.validate_selections().is_ok());
    }

    #[test]
    fn test_remove_line_and_clear() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Unlimited, 10000);

        cart.add_line(&def, 1).unwrap();
        cart.remove_line("1").unwrap();
        assert!(cart.is_empty());

        assert!(cart.remove_line("1").is_err());

        cart.add_line(&def, 1).unwrap();
        cart.clear();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_quantity_limit() {
        let mut cart = Cart::new();
        let def = test_definition("1", CouponKind::Unlimited, 10000);

        assert!(matches!(
            cart.add_line(&def, MAX_LINE_QUANTITY + 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }
}
