//! # veranda-core: Pure Business Logic for Veranda POS
//!
//! This crate is the heart of Veranda POS, a hotel voucher point of sale.
//! It contains the business rules for selling coupons as pure functions
//! with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  apps/redeem-api (HTTP)          front-desk terminal integration    │
//! │                └───────────────┬────────────┘                       │
//! │                                ▼                                    │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                ★ veranda-core (THIS CRATE) ★                  │ │
//! │  │                                                               │ │
//! │  │  ┌─────────┐ ┌─────────┐ ┌────────────┐ ┌──────┐ ┌─────────┐ │ │
//! │  │  │  types  │ │  money  │ │ allocation │ │ cart │ │ receipt │ │ │
//! │  │  │ Coupon  │ │  Money  │ │ available  │ │ Cart │ │  _code  │ │ │
//! │  │  │ Receipt │ │ satang  │ │ selection  │ │ Line │ │ format  │ │ │
//! │  │  └─────────┘ └─────────┘ └────────────┘ └──────┘ └─────────┘ │ │
//! │  │                                                               │ │
//! │  │  NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │                                │                                    │
//! │  ┌─────────────────────────────▼─────────────────────────────────┐ │
//! │  │               veranda-db (SQLite persistence)                 │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (CouponDefinition, GeneratedCoupon, Receipt, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`receipt_code`] - Receipt code formatting and parsing
//! - [`allocation`] - Availability math and code selection
//! - [`cart`] - In-memory cart of coupon lines
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Design Principles
//!
//! 1. **Pure Functions**: same input = same output, always
//! 2. **No I/O**: database, network and file access are FORBIDDEN here
//! 3. **Integer Money**: all monetary values are in satang (i64)
//! 4. **Explicit Errors**: all errors are typed, never strings or panics

pub mod allocation;
pub mod cart;
pub mod error;
pub mod money;
pub mod receipt_code;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use receipt_code::{format_receipt_code, parse_receipt_code};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum coupon lines allowed in a single cart.
///
/// Prevents runaway carts; one hotel receipt realistically carries a
/// handful of voucher lines.
pub const MAX_CART_LINES: usize = 50;

/// Maximum quantity of a single coupon line.
///
/// Prevents accidental over-ordering (typing 1000 instead of 10).
pub const MAX_LINE_QUANTITY: i64 = 500;

/// Default TTL for a soft coupon reservation, in seconds.
///
/// Long enough to build a cart at the front desk, short enough that an
/// abandoned terminal does not pin stock for other machines.
pub const DEFAULT_RESERVATION_TTL_SECS: i64 = 600;
