//! # Domain Types
//!
//! Core domain types for the voucher desk.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  CouponDefinition ──┬── GeneratedCoupon (one row per limited unit)  │
//! │   kind: limited /   │      generated_code, is_used, receipt_item_id │
//! │   unlimited         └── CouponReservation (session soft lock)       │
//! │                                                                     │
//! │  Receipt ─────────── ReceiptItem (snapshot of definition at sale)   │
//! │   receipt_code,            │                                        │
//! │   status: active/          └── allocated GeneratedCoupon rows       │
//! │   cancelled                                                         │
//! │                                                                     │
//! │  Customer, StaffMember, PaymentMethod, AuditLogEntry: reference     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - a business key (receipt_code, generated_code, ...) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Coupon Kind
// =============================================================================

/// Whether a coupon definition is sold as individually-coded units or by
/// plain quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum CouponKind {
    /// Quantity-limited: every sellable unit is a GeneratedCoupon row
    /// with its own unique code.
    Limited,
    /// Unlimited: sold by quantity only, no per-unit codes.
    Unlimited,
}

// =============================================================================
// Coupon Definition
// =============================================================================

/// A sellable coupon product (e.g. "Pool day pass", "Dinner buffet").
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CouponDefinition {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Prefix used when generating per-unit codes (e.g. "POOL").
    pub code_prefix: String,

    /// Display name shown to staff and on receipts.
    pub name: String,

    pub description: Option<String>,

    /// Limited (per-unit codes) or unlimited (quantity only).
    pub kind: CouponKind,

    /// Unit price in satang.
    pub price_satang: i64,

    /// Optional validity cut-off copied onto generated codes.
    pub valid_until: Option<DateTime<Utc>>,

    /// Whether the definition can currently be sold (soft delete).
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CouponDefinition {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_satang(self.price_satang)
    }

    #[inline]
    pub fn is_limited(&self) -> bool {
        self.kind == CouponKind::Limited
    }
}

// =============================================================================
// Generated Coupon
// =============================================================================

/// One physical unit of a limited coupon definition.
///
/// ## Lifecycle
/// Created in a batch when an admin generates N codes. `is_used` flips
/// true at sale allocation and reverts to false (with linkage cleared)
/// on receipt cancellation - cancellation is a compensating update,
/// never a delete. `redeemed_at` is stamped separately when the guest
/// presents the code at the venue.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct GeneratedCoupon {
    pub id: String,
    pub definition_id: String,

    /// Unique human-readable code, `{prefix}-{seq:04}`.
    pub generated_code: String,

    /// Batch this code was generated in (idempotency key).
    pub batch_id: String,

    /// Sequence within the definition, drives lowest-first allocation.
    pub seq: i64,

    /// True once allocated to a receipt item.
    pub is_used: bool,
    pub used_at: Option<DateTime<Utc>>,
    pub used_by: Option<String>,

    /// Back-reference to the receipt item that sold this unit.
    pub receipt_item_id: Option<String>,

    /// Denormalized customer for reporting convenience.
    pub customer_id: Option<String>,

    pub expires_at: Option<DateTime<Utc>>,
    pub is_complimentary: bool,

    /// Stamped when the guest redeems the code at the venue.
    pub redeemed_at: Option<DateTime<Utc>>,
    pub redeemed_by: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Coupon Reservation
// =============================================================================

/// A session-scoped soft lock on units of a limited definition.
///
/// Advisory and time-limited: it is consumed at checkout or released
/// when the cart line is removed, and expires passively by `expires_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CouponReservation {
    pub definition_id: String,
    pub session_id: String,
    pub quantity: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Receipt Status
// =============================================================================

/// The status of a receipt. Cancellation is a status flip (the audit
/// trail), never a physical delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum ReceiptStatus {
    Active,
    Cancelled,
}

impl Default for ReceiptStatus {
    fn default() -> Self {
        ReceiptStatus::Active
    }
}

// =============================================================================
// Receipt / Receipt Item
// =============================================================================

/// A completed sale at the voucher desk.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Receipt {
    pub id: String,

    /// Human-readable receipt code (`{prefix}{number:06}` or recycled).
    pub receipt_code: String,

    pub status: ReceiptStatus,
    pub customer_id: Option<String>,
    pub staff_id: String,

    /// Payment method code (see [`PaymentMethod`]).
    pub payment_method: String,

    pub subtotal_satang: i64,
    pub discount_satang: i64,
    pub total_satang: i64,

    /// Terminal that issued the receipt.
    pub machine_id: String,

    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// First print timestamp; the hard-delete cleanup path is only
    /// allowed while this is None.
    pub printed_at: Option<DateTime<Utc>>,

    pub cancelled_at: Option<DateTime<Utc>>,
    pub cancelled_by: Option<String>,
    pub cancel_reason: Option<String>,
}

impl Receipt {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_satang(self.total_satang)
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.status == ReceiptStatus::Active
    }
}

/// A line item on a receipt. Uses the snapshot pattern: definition name
/// and price are frozen at sale time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReceiptItem {
    pub id: String,
    pub receipt_id: String,
    pub definition_id: String,

    /// Definition name at time of sale (frozen).
    pub name_snapshot: String,

    /// Unit price in satang at time of sale (frozen).
    pub unit_price_satang: i64,

    pub quantity: i64,
    pub discount_satang: i64,

    /// unit_price × quantity − discount.
    pub line_total_satang: i64,

    pub created_at: DateTime<Utc>,
}

impl ReceiptItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_satang(self.unit_price_satang)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_satang(self.line_total_satang)
    }
}

// =============================================================================
// Reference Data
// =============================================================================

/// A hotel guest or walk-in buyer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub room_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A front-desk staff member (sales attribution).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StaffMember {
    pub id: String,
    pub display_name: String,
    pub login_name: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// A configured payment method (cash, card, transfer, room charge...).
/// Managed reference data rather than a hard-coded enum.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethod {
    /// Short stable code, stored on receipts ("cash", "card", ...).
    pub code: String,
    pub name: String,
    pub is_active: bool,
}

/// One append-only audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct AuditLogEntry {
    pub id: String,
    pub actor: String,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub detail: Option<String>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Redemption
// =============================================================================

/// Outcome of attempting to redeem a generated code at the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedeemOutcome {
    /// Code accepted and marked redeemed.
    Redeemed,
    /// No such code exists.
    NotFound,
    /// Code exists but has never been sold.
    NotSold,
    /// Code was already redeemed earlier.
    AlreadyRedeemed,
    /// Code is past its expiry.
    Expired,
}

// =============================================================================
// Report Rows
// =============================================================================

/// One receipt-level row of the sales report (active receipts only).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ReportRow {
    pub receipt_code: String,
    pub issued_at: DateTime<Utc>,
    pub customer_name: Option<String>,
    pub staff_name: String,
    pub payment_method: String,
    pub total_satang: i64,
}

/// Aggregate totals for a reporting period.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct SalesSummary {
    pub receipt_count: i64,
    pub subtotal_satang: i64,
    pub discount_satang: i64,
    pub total_satang: i64,
}

/// Per-staff sales attribution.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct StaffSalesRow {
    pub staff_id: String,
    pub staff_name: String,
    pub receipt_count: i64,
    pub total_satang: i64,
}

/// Per-definition sales: quantity sold plus remaining stock for
/// limited definitions (None for unlimited).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DefinitionSalesRow {
    pub definition_id: String,
    pub name: String,
    pub kind: CouponKind,
    pub quantity_sold: i64,
    pub total_satang: i64,
    pub remaining_units: Option<i64>,
}

/// Totals grouped by payment method.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentMethodTotal {
    pub payment_method: String,
    pub receipt_count: i64,
    pub total_satang: i64,
}

/// Totals grouped by calendar day (`YYYY-MM-DD`).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DailyTotalRow {
    pub day: String,
    pub receipt_count: i64,
    pub total_satang: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
