//! Invoicing domain module.
//!
//! Supplier XML invoices (UBL 2.1, SmartBill export dialect) are turned into
//! plain [`Invoice`] values here, and PPL course billing is recognized from
//! their lines. Everything in this crate is deterministic domain logic
//! (no IO, no HTTP, no storage).

pub mod invoice;
pub mod numeric;
pub mod parser;
pub mod ppl;
pub mod supplier;
pub mod validation;
pub mod xml_tree;

pub use invoice::{Client, HOUR_UNIT_CODES, Invoice, LineItem, PERSONAL_CODE_LEN};
pub use parser::{ParseError, XmlInvoiceParser};
pub use ppl::{PplInfo, calculate_ppl_hours_paid, get_ppl_info, is_ppl_course_invoice};
pub use supplier::SupplierIdentity;
pub use validation::{ValidationReport, validate};
