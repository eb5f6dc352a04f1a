//! Lookup and persistence boundary of the invoice import.
//!
//! The import only needs a narrow row-store contract: a handful of exact-match
//! lookups, two identity writes and one transactional commit. Adapters:
//! [`InMemoryInvoiceGateway`] for tests/dev and [`PostgresInvoiceGateway`].

pub mod in_memory;
pub mod postgres;
pub mod rows;
pub mod r#trait;

pub use in_memory::InMemoryInvoiceGateway;
pub use postgres::PostgresInvoiceGateway;
pub use rows::{
    CompanyRow, FlightHoursRow, ImportBatch, InvoiceClientRow, InvoiceItemRow, InvoiceRow,
    UserCompanyRelationshipRow, UserRow,
};
pub use r#trait::{GatewayError, InvoiceGateway, RelationshipOutcome};
