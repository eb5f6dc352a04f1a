//! `aeroclub-core`: domain error model and typed identifiers.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! the domain error model and the strongly-typed record identifiers shared by
//! the invoicing and infrastructure crates.

pub mod error;
pub mod id;

pub use error::{DomainError, DomainResult};
pub use id::{CompanyId, FlightHoursId, InvoiceItemId, InvoiceRecordId, RelationshipId, UserId};
