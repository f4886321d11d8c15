//! # veranda-db: Database Layer for Veranda POS
//!
//! SQLite persistence for the voucher desk, built on sqlx.
//!
//! ## Data Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  caller (terminal integration / redeem-api)                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  ┌───────────────────────────────────────────────────────────────┐ │
//! │  │                  veranda-db (THIS CRATE)                      │ │
//! │  │                                                               │ │
//! │  │   Database (pool.rs)  ◄──  repositories  ──►  migrations     │ │
//! │  │   SqlitePool, WAL          receipt numbers     embedded SQL  │ │
//! │  │                            reservations                      │ │
//! │  │   settings.rs              coupons/checkout                  │ │
//! │  │   (offline fallback)       receipts/reports                  │ │
//! │  └───────────────────────────────────────────────────────────────┘ │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  SQLite database file (one per terminal install)                    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//! Cross-terminal consistency is delegated to SQLite write transactions:
//! everything that reads stock or the receipt counter and then writes
//! runs inside a single `BEGIN IMMEDIATE` transaction, so two terminals
//! can never both pass a check on the same stale snapshot. The soft
//! reservation layer is advisory and TTL-bounded on top of that.

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod settings;

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use settings::{LocalSettings, SettingsStore};

pub use repository::audit::AuditRepository;
pub use repository::checkout::{
    CheckoutError, CheckoutRepository, CompletedSale, DraftLine, ReceiptDraft,
};
pub use repository::coupon::{CodeLookup, CouponRepository, DefinitionUpdate, NewDefinition};
pub use repository::customer::{CustomerInput, CustomerRepository};
pub use repository::payment_method::PaymentMethodRepository;
pub use repository::receipt::ReceiptRepository;
pub use repository::receipt_number::{
    CounterState, ReceiptNumberRepository, ReceiptNumberService,
};
pub use repository::report::ReportRepository;
pub use repository::reservation::ReservationRepository;
pub use repository::staff::StaffRepository;
