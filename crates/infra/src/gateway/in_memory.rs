use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use aeroclub_core::{CompanyId, InvoiceRecordId, UserId};

use super::rows::{
    CompanyRow, FlightHoursRow, ImportBatch, InvoiceClientRow, InvoiceItemRow, InvoiceRow,
    UserCompanyRelationshipRow, UserRow,
};
use super::r#trait::{GatewayError, InvoiceGateway, RelationshipOutcome};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRow>,
    companies: Vec<CompanyRow>,
    relationships: Vec<UserCompanyRelationshipRow>,
    invoices: Vec<InvoiceRow>,
    clients: Vec<InvoiceClientRow>,
    items: Vec<InvoiceItemRow>,
    flight_hours: Vec<FlightHoursRow>,
}

/// In-memory invoice gateway.
///
/// Intended for tests/dev. All tables sit behind one lock, so a commit is
/// observed entirely or not at all. Faults can be injected to exercise the
/// import's failure paths.
#[derive(Debug, Default)]
pub struct InMemoryInvoiceGateway {
    tables: RwLock<Tables>,
    fail_commits: AtomicBool,
    fail_lookups: AtomicBool,
}

impl InMemoryInvoiceGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a user (users are never created by the import).
    pub fn add_user(&self, email: &str, first_name: &str, last_name: &str) -> UserId {
        let id = UserId::new();
        if let Ok(mut t) = self.tables.write() {
            t.users.push(UserRow {
                id,
                email: email.to_string(),
                first_name: first_name.to_string(),
                last_name: last_name.to_string(),
            });
        }
        id
    }

    /// Seed an existing company.
    pub fn add_company(&self, name: &str, vat_code: Option<&str>) -> CompanyId {
        let id = CompanyId::new();
        if let Ok(mut t) = self.tables.write() {
            t.companies.push(CompanyRow {
                id,
                name: name.to_string(),
                vat_code: vat_code.map(str::to_string),
                email: None,
                phone: None,
                address: None,
                city: None,
                country: "Romania".to_string(),
                status: "Active".to_string(),
            });
        }
        id
    }

    /// Make every subsequent `commit_import` fail with a storage error.
    pub fn fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Make every subsequent lookup fail with a storage error.
    pub fn fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::SeqCst);
    }

    pub fn invoices(&self) -> Vec<InvoiceRow> {
        self.snapshot(|t| t.invoices.clone())
    }

    pub fn clients(&self) -> Vec<InvoiceClientRow> {
        self.snapshot(|t| t.clients.clone())
    }

    pub fn items(&self) -> Vec<InvoiceItemRow> {
        self.snapshot(|t| t.items.clone())
    }

    pub fn flight_hours(&self) -> Vec<FlightHoursRow> {
        self.snapshot(|t| t.flight_hours.clone())
    }

    pub fn companies(&self) -> Vec<CompanyRow> {
        self.snapshot(|t| t.companies.clone())
    }

    pub fn relationships(&self) -> Vec<UserCompanyRelationshipRow> {
        self.snapshot(|t| t.relationships.clone())
    }

    /// Row count across every table the import can write to.
    pub fn total_rows(&self) -> usize {
        self.snapshot(|t| {
            t.companies.len()
                + t.relationships.len()
                + t.invoices.len()
                + t.clients.len()
                + t.items.len()
                + t.flight_hours.len()
        })
    }

    fn snapshot<T: Default>(&self, f: impl FnOnce(&Tables) -> T) -> T {
        self.tables.read().map(|t| f(&*t)).unwrap_or_default()
    }

    fn read<T>(&self, f: impl FnOnce(&Tables) -> T) -> Result<T, GatewayError> {
        if self.fail_lookups.load(Ordering::SeqCst) {
            return Err(GatewayError::Storage("lookup failure injected".to_string()));
        }
        let tables = self
            .tables
            .read()
            .map_err(|_| GatewayError::Storage("lock poisoned".to_string()))?;
        Ok(f(&*tables))
    }

    fn write<T>(
        &self,
        f: impl FnOnce(&mut Tables) -> Result<T, GatewayError>,
    ) -> Result<T, GatewayError> {
        let mut tables = self
            .tables
            .write()
            .map_err(|_| GatewayError::Storage("lock poisoned".to_string()))?;
        f(&mut *tables)
    }
}

#[async_trait::async_trait]
impl InvoiceGateway for InMemoryInvoiceGateway {
    async fn find_invoice_by_smartbill_id(
        &self,
        smartbill_id: &str,
    ) -> Result<Option<InvoiceRecordId>, GatewayError> {
        self.read(|t| {
            t.invoices
                .iter()
                .find(|i| i.smartbill_id == smartbill_id)
                .map(|i| i.id)
        })
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserId>, GatewayError> {
        self.read(|t| t.users.iter().find(|u| u.email == email).map(|u| u.id))
    }

    async fn find_user_by_full_name(&self, name: &str) -> Result<Option<UserRow>, GatewayError> {
        let wanted = name.to_lowercase();
        self.read(|t| {
            t.users
                .iter()
                .find(|u| u.full_name().to_lowercase() == wanted)
                .cloned()
        })
    }

    async fn find_company_by_vat_code(
        &self,
        vat_code: &str,
    ) -> Result<Option<CompanyId>, GatewayError> {
        self.read(|t| {
            t.companies
                .iter()
                .find(|c| c.vat_code.as_deref() == Some(vat_code))
                .map(|c| c.id)
        })
    }

    async fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyId>, GatewayError> {
        self.read(|t| t.companies.iter().find(|c| c.name == name).map(|c| c.id))
    }

    async fn create_company(&self, company: CompanyRow) -> Result<CompanyId, GatewayError> {
        self.write(|t| {
            let id = company.id;
            t.companies.push(company);
            Ok(id)
        })
    }

    async fn ensure_user_company_relationship(
        &self,
        user_id: UserId,
        company_id: CompanyId,
    ) -> Result<RelationshipOutcome, GatewayError> {
        self.write(|t| {
            if let Some(existing) = t
                .relationships
                .iter()
                .find(|r| r.user_id == user_id && r.company_id == company_id)
            {
                return Ok(RelationshipOutcome::Existing(existing.id));
            }
            let row = UserCompanyRelationshipRow::with_defaults(user_id, company_id);
            let id = row.id;
            t.relationships.push(row);
            Ok(RelationshipOutcome::Created(id))
        })
    }

    async fn commit_import(&self, batch: ImportBatch) -> Result<(), GatewayError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(GatewayError::Storage("commit failure injected".to_string()));
        }
        self.write(|t| {
            // Unique smartbill_id, checked under the write lock.
            if t
                .invoices
                .iter()
                .any(|i| i.smartbill_id == batch.invoice.smartbill_id)
            {
                return Err(GatewayError::Duplicate(format!(
                    "invoice {} already exists",
                    batch.invoice.smartbill_id
                )));
            }

            let ImportBatch {
                mut invoice,
                client,
                items,
                flight_hours,
                ppl_hours_paid,
            } = batch;

            if let Some(hours) = ppl_hours_paid {
                invoice.is_ppl = true;
                invoice.ppl_hours_paid = Some(hours);
            }

            t.invoices.push(invoice);
            t.clients.push(client);
            t.items.extend(items);
            t.flight_hours.extend(flight_hours);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn batch(smartbill_id: &str) -> ImportBatch {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let invoice = InvoiceRow {
            id: InvoiceRecordId::new(),
            smartbill_id: smartbill_id.to_string(),
            series: "CA".to_string(),
            number: "1".to_string(),
            issue_date: date,
            due_date: date,
            status: "imported".to_string(),
            total_amount: dec!(100),
            vat_amount: dec!(19),
            currency: "RON".to_string(),
            is_ppl: false,
            ppl_hours_paid: None,
            xml_content: "<Invoice/>".to_string(),
            original_xml_content: "<Invoice/>".to_string(),
        };
        let client = InvoiceClientRow {
            invoice_id: invoice.id,
            name: "Client".to_string(),
            email: None,
            phone: None,
            vat_code: None,
            address: None,
            city: None,
            country: "Romania".to_string(),
            user_id: None,
            company_id: None,
        };
        ImportBatch {
            invoice,
            client,
            items: vec![],
            flight_hours: vec![],
            ppl_hours_paid: None,
        }
    }

    #[tokio::test]
    async fn second_commit_with_same_smartbill_id_is_rejected() {
        let gw = InMemoryInvoiceGateway::new();
        gw.commit_import(batch("CA1")).await.unwrap();

        let err = gw.commit_import(batch("CA1")).await.unwrap_err();
        assert!(matches!(err, GatewayError::Duplicate(_)));
        assert_eq!(gw.invoices().len(), 1);
        assert_eq!(gw.clients().len(), 1);
    }

    #[tokio::test]
    async fn commit_applies_ppl_update() {
        let gw = InMemoryInvoiceGateway::new();
        let mut b = batch("CA2");
        b.ppl_hours_paid = Some(20);
        gw.commit_import(b).await.unwrap();

        let stored = &gw.invoices()[0];
        assert!(stored.is_ppl);
        assert_eq!(stored.ppl_hours_paid, Some(20));
    }

    #[tokio::test]
    async fn injected_commit_failure_writes_nothing() {
        let gw = InMemoryInvoiceGateway::new();
        gw.fail_commits(true);
        assert!(gw.commit_import(batch("CA3")).await.is_err());
        assert_eq!(gw.total_rows(), 0);
    }

    #[tokio::test]
    async fn relationship_is_created_once() {
        let gw = InMemoryInvoiceGateway::new();
        let user = gw.add_user("a@b.ro", "Ana", "Pop");
        let company = gw.add_company("Aero SRL", Some("RO123"));

        let first = gw.ensure_user_company_relationship(user, company).await.unwrap();
        let second = gw.ensure_user_company_relationship(user, company).await.unwrap();

        assert!(matches!(first, RelationshipOutcome::Created(_)));
        assert_eq!(second, RelationshipOutcome::Existing(first.id()));
        assert_eq!(gw.relationships().len(), 1);
    }

    #[tokio::test]
    async fn full_name_lookup_ignores_case() {
        let gw = InMemoryInvoiceGateway::new();
        gw.add_user("a@b.ro", "Ana", "Pop");
        assert!(gw.find_user_by_full_name("ANA POP").await.unwrap().is_some());
        assert!(gw.find_user_by_full_name("Ana  Pop").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn injected_lookup_failure_surfaces_as_storage_error() {
        let gw = InMemoryInvoiceGateway::new();
        gw.fail_lookups(true);
        let err = gw.find_user_by_email("a@b.ro").await.unwrap_err();
        assert!(matches!(err, GatewayError::Storage(_)));
    }
}
