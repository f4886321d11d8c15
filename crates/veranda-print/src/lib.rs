//! # veranda-print: Print Composition for Veranda POS
//!
//! Renders domain data into print-ready text documents:
//!
//! - [`receipt`] - the 42-column thermal receipt handed to the guest
//! - [`report`] - the paginated 80-column sales report
//! - [`export`] - CSV export of report rows for spreadsheets
//!
//! Everything here is pure composition: inputs in, `Vec<String>` lines
//! (or CSV bytes) out. Delivering the result to a printer or a file is
//! the caller's concern.

pub mod document;
pub mod export;
pub mod receipt;
pub mod report;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrintError {
    #[error("CSV export failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV export failed: {0}")]
    CsvIo(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),
}

pub type PrintResult<T> = Result<T, PrintError>;

pub use receipt::{ReceiptDocument, VenueHeader};
pub use report::{ReportDocument, ReportPage};
