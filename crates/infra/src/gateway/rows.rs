//! Row shapes of the tables the import writes to and reads from.
//!
//! Field names are the storage contract other subsystems (billing, reports)
//! depend on. Identifiers are generated application-side (UUIDv7) so a whole
//! import can be assembled before it is committed.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use aeroclub_core::{
    CompanyId, FlightHoursId, InvoiceItemId, InvoiceRecordId, RelationshipId, UserId,
};

pub const DEFAULT_RELATIONSHIP_TYPE: &str = "employee";

/// `users` (read-only from the import's point of view).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRow {
    pub id: UserId,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl UserRow {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

/// `companies`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRow {
    pub id: CompanyId,
    pub name: String,
    pub vat_code: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub status: String,
}

/// `user_company_relationships`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserCompanyRelationshipRow {
    pub id: RelationshipId,
    pub user_id: UserId,
    pub company_id: CompanyId,
    pub relationship_type: String,
    pub is_primary: bool,
}

impl UserCompanyRelationshipRow {
    pub fn with_defaults(user_id: UserId, company_id: CompanyId) -> Self {
        Self {
            id: RelationshipId::new(),
            user_id,
            company_id,
            relationship_type: DEFAULT_RELATIONSHIP_TYPE.to_string(),
            is_primary: false,
        }
    }
}

/// `invoices`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceRow {
    pub id: InvoiceRecordId,
    /// Full supplier invoice number; unique.
    pub smartbill_id: String,
    pub series: String,
    pub number: String,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    pub status: String,
    pub total_amount: Decimal,
    pub vat_amount: Decimal,
    pub currency: String,
    pub is_ppl: bool,
    pub ppl_hours_paid: Option<u32>,
    /// Snapshot of what was imported (edited JSON, or the XML itself).
    pub xml_content: String,
    /// The XML as received; never rewritten.
    pub original_xml_content: String,
}

/// `invoice_clients`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceClientRow {
    pub invoice_id: InvoiceRecordId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub vat_code: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub country: String,
    pub user_id: Option<UserId>,
    pub company_id: Option<CompanyId>,
}

/// `invoice_items`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceItemRow {
    pub id: InvoiceItemId,
    pub invoice_id: InvoiceRecordId,
    /// 1-based position on the invoice.
    pub line_id: u32,
    pub name: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit: String,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub vat_rate: Decimal,
}

/// `flight_hours`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlightHoursRow {
    pub id: FlightHoursId,
    pub invoice_id: InvoiceRecordId,
    pub user_id: UserId,
    pub company_id: Option<CompanyId>,
    pub invoice_item_id: InvoiceItemId,
    pub flight_date: NaiveDate,
    pub hours_regular: Decimal,
    pub hours_promotional: Decimal,
    pub total_hours: Decimal,
    pub rate_per_hour: Decimal,
    pub total_amount: Decimal,
    pub notes: Option<String>,
}

/// Everything one import writes, committed as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportBatch {
    pub invoice: InvoiceRow,
    pub client: InvoiceClientRow,
    pub items: Vec<InvoiceItemRow>,
    pub flight_hours: Vec<FlightHoursRow>,
    /// Hours paid, when the invoice bills the PPL course. Applied as an
    /// update of the freshly inserted invoice row.
    pub ppl_hours_paid: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_name_joins_with_single_space() {
        let user = UserRow {
            id: UserId::new(),
            email: "a@b.ro".to_string(),
            first_name: "Ștefan".to_string(),
            last_name: "Avădănei".to_string(),
        };
        assert_eq!(user.full_name(), "Ștefan Avădănei");
    }

    #[test]
    fn relationship_defaults() {
        let row = UserCompanyRelationshipRow::with_defaults(UserId::new(), CompanyId::new());
        assert_eq!(row.relationship_type, "employee");
        assert!(!row.is_primary);
    }
}
