//! XML invoice import: deduplication, identity resolution and persistence of
//! invoice, client, items, flight-hour credits and PPL tagging.

pub mod company;
pub mod result;
pub mod service;

pub use company::{COMPANY_STATUS_ACTIVE, resolve_company};
pub use result::{ImportFailure, ImportResult, SkipReason, SkippedLine};
pub use service::{ImportDocument, InvoiceImportService};
